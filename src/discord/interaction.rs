use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{application_command::ApplicationCommandOptionType, embed::MessageEmbed, snowflake};
use crate::{
    codec::{decode_enum, encode_enum, into_object, Decode, Encode, RenderContext, WireEnum},
    error::{DecodeError, EncodeError},
};

/// Only the invoking user sees the message.
pub const EPHEMERAL: u64 = 1 << 6;

wire_enum! {
    pub enum InteractionType {
        Ping = 1,
        ApplicationCommand = 2,
    }
}

wire_enum! {
    pub enum InteractionResponseType {
        Pong = 1,
        Acknowledge = 2,
        ChannelMessage = 3,
        ChannelMessageWithSource = 4,
        DeferredChannelMessageWithSource = 5,
    }
}

impl InteractionResponseType {
    pub fn carries_data(self) -> bool {
        matches!(self, Self::ChannelMessage | Self::ChannelMessageWithSource)
    }
}

/// Inbound event. Only read here, the token is what a reply is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(with = "snowflake")]
    pub id: u64,
    #[serde(
        default,
        with = "snowflake::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub application_id: Option<u64>,
    #[serde(rename = "type")]
    pub kind_code: u8,
    pub token: String,
    #[serde(
        default,
        with = "snowflake::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub guild_id: Option<u64>,
    #[serde(
        default,
        with = "snowflake::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
}

impl Interaction {
    /// `None` for interaction types this client does not know.
    pub fn kind(&self) -> Option<InteractionType> {
        InteractionType::from_code(self.kind_code)
    }
}

impl Decode for Interaction {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionData {
    #[serde(with = "snowflake")]
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionDataOption>,
}

impl InteractionData {
    pub fn option(&self, name: &str) -> Option<&InteractionDataOption> {
        self.options.iter().find(|option| option.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionDataOption {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind_code: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionDataOption>,
}

impl InteractionDataOption {
    pub fn kind(&self) -> Option<ApplicationCommandOptionType> {
        self.kind_code.and_then(ApplicationCommandOptionType::from_code)
    }

    pub fn option(&self, name: &str) -> Option<&InteractionDataOption> {
        self.options.iter().find(|option| option.name == name)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(|v| v.as_str())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_ref().and_then(|v| v.as_i64())
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_ref().and_then(|v| v.as_bool())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowedMentions {
    #[serde(default)]
    pub parse: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl AllowedMentions {
    /// Suppresses every ping.
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionResponseData {
    pub tts: Option<bool>,
    pub content: Option<String>,
    pub embeds: Vec<MessageEmbed>,
    pub allowed_mentions: Option<AllowedMentions>,
    pub flags: Option<u64>,
}

impl Encode for InteractionResponseData {
    fn encode(&self, cx: &dyn RenderContext) -> Result<Value, EncodeError> {
        if self.content.is_none() && self.embeds.is_empty() {
            return Err(EncodeError::EmptyMessage);
        }

        let mut map = Map::new();
        if let Some(tts) = self.tts {
            map.insert("tts".to_string(), tts.into());
        }
        if let Some(content) = &self.content {
            map.insert("content".to_string(), content.as_str().into());
        }
        if !self.embeds.is_empty() {
            map.insert("embeds".to_string(), self.embeds.encode(cx)?);
        }
        if let Some(allowed_mentions) = &self.allowed_mentions {
            map.insert(
                "allowed_mentions".to_string(),
                serde_json::to_value(allowed_mentions)?,
            );
        }
        if let Some(flags) = self.flags {
            map.insert("flags".to_string(), flags.into());
        }

        Ok(Value::Object(map))
    }
}

impl Decode for InteractionResponseData {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        let mut map = into_object(value, "interaction response data")?;
        let take = |map: &mut Map<String, Value>, key: &str| match map.remove(key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        };

        Ok(Self {
            tts: take(&mut map, "tts").map(serde_json::from_value).transpose()?,
            content: take(&mut map, "content")
                .map(serde_json::from_value)
                .transpose()?,
            embeds: take(&mut map, "embeds")
                .map(Vec::<MessageEmbed>::decode)
                .transpose()?
                .unwrap_or_default(),
            allowed_mentions: take(&mut map, "allowed_mentions")
                .map(serde_json::from_value)
                .transpose()?,
            flags: take(&mut map, "flags")
                .map(serde_json::from_value)
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionResponse {
    pub kind: InteractionResponseType,
    pub data: Option<InteractionResponseData>,
}

impl InteractionResponse {
    /// Answer to a ping.
    pub fn pong() -> Self {
        Self {
            kind: InteractionResponseType::Pong,
            data: None,
        }
    }

    /// Shows "thinking" until a followup is sent.
    pub fn deferred() -> Self {
        Self {
            kind: InteractionResponseType::DeferredChannelMessageWithSource,
            data: None,
        }
    }

    pub fn message(content: impl Into<String>) -> Self {
        Self::with_data(InteractionResponseData {
            content: Some(content.into()),
            ..Default::default()
        })
    }

    pub fn embed(embed: MessageEmbed) -> Self {
        Self::with_data(InteractionResponseData {
            embeds: vec![embed],
            ..Default::default()
        })
    }

    pub fn with_data(data: InteractionResponseData) -> Self {
        Self {
            kind: InteractionResponseType::ChannelMessageWithSource,
            data: Some(data),
        }
    }

    pub fn ephemeral(mut self) -> Self {
        if let Some(data) = self.data.as_mut() {
            data.flags = Some(data.flags.unwrap_or(0) | EPHEMERAL);
        }
        self
    }

    pub fn tts(mut self) -> Self {
        if let Some(data) = self.data.as_mut() {
            data.tts = Some(true);
        }
        self
    }
}

impl Encode for InteractionResponse {
    fn encode(&self, cx: &dyn RenderContext) -> Result<Value, EncodeError> {
        let mut map = Map::new();
        map.insert("type".to_string(), encode_enum(self.kind));

        match (&self.data, self.kind.carries_data()) {
            (Some(data), true) => {
                map.insert("data".to_string(), data.encode(cx)?);
            }
            (None, false) => {}
            (Some(_), false) => return Err(EncodeError::UnexpectedData(self.kind)),
            (None, true) => return Err(EncodeError::MissingData(self.kind)),
        }

        Ok(Value::Object(map))
    }
}

impl Decode for InteractionResponse {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        let mut map = into_object(value, "interaction response")?;
        let code = map.remove("type").unwrap_or(Value::Null);
        let kind = decode_enum(&code).ok_or(DecodeError::UnknownCode {
            target: "interaction response type",
            code,
        })?;
        let data = match map.remove("data") {
            Some(Value::Null) | None => None,
            Some(data) => Some(InteractionResponseData::decode(data)?),
        };

        Ok(Self { kind, data })
    }
}
