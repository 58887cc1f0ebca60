use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    codec::{Decode, Encode, RenderContext},
    error::{DecodeError, EncodeError},
};

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
    pub icon_url: Option<String>,
}

impl EmbedFooter {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            icon_url: None,
        }
    }

    pub fn icon_url(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = Some(icon_url.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedAuthor {
    pub name: String,
    pub url: Option<String>,
    pub icon_url: Option<String>,
}

impl EmbedAuthor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            icon_url: None,
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn icon_url(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = Some(icon_url.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Rich content block. Images are kept as bare urls, the codec nests them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageEmbed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub color: Option<u32>,
    pub footer: Option<EmbedFooter>,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
    pub author: Option<EmbedAuthor>,
    pub fields: Vec<EmbedField>,
}

impl MessageEmbed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn footer(mut self, footer: EmbedFooter) -> Self {
        self.footer = Some(footer);
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    pub fn author(mut self, author: EmbedAuthor) -> Self {
        self.author = Some(author);
        self
    }

    pub fn field(mut self, name: impl ToString, value: impl ToString, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.to_string(),
            value: value.to_string(),
            inline,
        });
        self
    }
}

// wire shape, unset keys are left out instead of being null
#[derive(Serialize, Deserialize)]
struct WireEmbed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    footer: Option<WireFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<WireMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thumbnail: Option<WireMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<WireAuthor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fields: Vec<WireField>,
}

#[derive(Serialize, Deserialize)]
struct WireFooter {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon_url: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireMedia {
    url: String,
}

#[derive(Serialize, Deserialize)]
struct WireAuthor {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon_url: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireField {
    name: String,
    value: String,
    #[serde(default)]
    inline: bool,
}

impl Encode for MessageEmbed {
    fn encode(&self, cx: &dyn RenderContext) -> Result<Value, EncodeError> {
        let footer = self.footer.clone().or_else(|| cx.default_footer());
        let wire = WireEmbed {
            title: self.title.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
            timestamp: self
                .timestamp
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            color: self.color.or_else(|| cx.default_color()),
            footer: footer.map(|footer| WireFooter {
                text: footer.text,
                icon_url: footer.icon_url,
            }),
            image: self.image.clone().map(|url| WireMedia { url }),
            thumbnail: self.thumbnail.clone().map(|url| WireMedia { url }),
            author: self.author.clone().map(|author| WireAuthor {
                name: author.name,
                url: author.url,
                icon_url: author.icon_url,
            }),
            fields: self
                .fields
                .iter()
                .map(|field| WireField {
                    name: field.name.clone(),
                    value: field.value.clone(),
                    inline: field.inline,
                })
                .collect(),
        };

        Ok(serde_json::to_value(wire)?)
    }
}

impl Decode for MessageEmbed {
    // extra keys discord fills in (type, proxy_url, width, ...) are dropped
    fn decode(value: Value) -> Result<Self, DecodeError> {
        let wire: WireEmbed = serde_json::from_value(value)?;
        let timestamp = match wire.timestamp {
            Some(ts) => Some(DateTime::parse_from_rfc3339(&ts)?.with_timezone(&Utc)),
            None => None,
        };

        Ok(Self {
            title: wire.title,
            description: wire.description,
            url: wire.url,
            timestamp,
            color: wire.color,
            footer: wire.footer.map(|footer| EmbedFooter {
                text: footer.text,
                icon_url: footer.icon_url,
            }),
            image: wire.image.map(|image| image.url),
            thumbnail: wire.thumbnail.map(|thumbnail| thumbnail.url),
            author: wire.author.map(|author| EmbedAuthor {
                name: author.name,
                url: author.url,
                icon_url: author.icon_url,
            }),
            fields: wire
                .fields
                .into_iter()
                .map(|field| EmbedField {
                    name: field.name,
                    value: field.value,
                    inline: field.inline,
                })
                .collect(),
        })
    }
}
