use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snowflake;
use crate::{
    codec::{Decode, Encode, RenderContext, WireEnum},
    error::{DecodeError, EncodeError},
};

wire_enum! {
    pub enum ApplicationCommandOptionType {
        SubCommand = 1,
        SubCommandGroup = 2,
        String = 3,
        Integer = 4,
        Boolean = 5,
        User = 6,
        Channel = 7,
        Role = 8,
        Mentionable = 9,
        Number = 10,
    }
}

impl ApplicationCommandOptionType {
    pub fn is_sub_command(self) -> bool {
        matches!(self, Self::SubCommand | Self::SubCommandGroup)
    }

    pub fn accepts_choices(self) -> bool {
        matches!(self, Self::String | Self::Integer | Self::Number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Integer(i64),
    Number(f64),
    String(String),
}

impl ChoiceValue {
    fn fits(&self, kind: ApplicationCommandOptionType) -> bool {
        use ApplicationCommandOptionType as Kind;

        matches!(
            (self, kind),
            (Self::String(_), Kind::String)
                | (Self::Integer(_), Kind::Integer)
                | (Self::Integer(_), Kind::Number)
                | (Self::Number(_), Kind::Number)
        )
    }
}

impl From<&str> for ChoiceValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ChoiceValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ChoiceValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ChoiceValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationCommandOptionChoice {
    pub name: String,
    pub value: ChoiceValue,
}

/// Option types discord added later than this client decode fine, `kind()` is `None` for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationCommandOption {
    #[serde(rename = "type")]
    pub kind_code: u8,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ApplicationCommandOptionChoice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ApplicationCommandOption>,
}

impl ApplicationCommandOption {
    pub fn new(
        kind: ApplicationCommandOptionType,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind_code: kind.code(),
            name: name.into(),
            description: description.into(),
            required: None,
            choices: vec![],
            options: vec![],
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn choice(mut self, name: impl Into<String>, value: impl Into<ChoiceValue>) -> Self {
        self.choices.push(ApplicationCommandOptionChoice {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn option(mut self, option: ApplicationCommandOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn kind(&self) -> Option<ApplicationCommandOptionType> {
        ApplicationCommandOptionType::from_code(self.kind_code)
    }

    /// Absent `required` counts as `false`, discord leaves it out.
    pub fn same_definition(&self, other: &ApplicationCommandOption) -> bool {
        self.kind_code == other.kind_code
            && self.name == other.name
            && self.description == other.description
            && self.required.unwrap_or(false) == other.required.unwrap_or(false)
            && self.choices == other.choices
            && same_options(&self.options, &other.options)
    }

    // the option type decides which of the other fields may be present
    fn validate(&self) -> Result<(), EncodeError> {
        use ApplicationCommandOptionType as Kind;

        let kind = self.kind().ok_or_else(|| EncodeError::UnknownOptionType {
            option: self.name.clone(),
            code: self.kind_code,
        })?;
        if !kind.is_sub_command() && !self.options.is_empty() {
            return Err(EncodeError::NestedOptionsNotAllowed {
                option: self.name.clone(),
                kind,
            });
        }
        if kind.is_sub_command() && self.required.is_some() {
            return Err(EncodeError::RequiredNotAllowed {
                option: self.name.clone(),
                kind,
            });
        }
        if !self.choices.is_empty() {
            if !kind.accepts_choices() {
                return Err(EncodeError::ChoicesNotAllowed {
                    option: self.name.clone(),
                    kind,
                });
            }
            if let Some(choice) = self.choices.iter().find(|c| !c.value.fits(kind)) {
                return Err(EncodeError::ChoiceTypeMismatch {
                    option: self.name.clone(),
                    choice: choice.name.clone(),
                    kind,
                });
            }
        }

        for child in &self.options {
            // an unknown child kind is reported by its own validation
            if let Some(child_kind) = child.kind() {
                match (kind, child_kind) {
                    (Kind::SubCommandGroup, Kind::SubCommand) => {}
                    (Kind::SubCommandGroup, child_kind) => {
                        return Err(EncodeError::GroupChildNotSubCommand {
                            group: self.name.clone(),
                            child: child.name.clone(),
                            kind: child_kind,
                        })
                    }
                    (Kind::SubCommand, child_kind) if child_kind.is_sub_command() => {
                        return Err(EncodeError::NestedSubCommand {
                            parent: self.name.clone(),
                            child: child.name.clone(),
                        })
                    }
                    _ => {}
                }
            }
            child.validate()?;
        }

        Ok(())
    }
}

fn same_options(ours: &[ApplicationCommandOption], theirs: &[ApplicationCommandOption]) -> bool {
    ours.len() == theirs.len() && ours.iter().zip(theirs).all(|(a, b)| a.same_definition(b))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationCommand {
    #[serde(
        default,
        with = "snowflake::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<u64>,
    #[serde(
        default,
        with = "snowflake::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub application_id: Option<u64>,
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
    pub version: Option<u64>,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ApplicationCommandOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_permission: Option<bool>,
}

impl ApplicationCommand {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            application_id: None,
            guild_id: None,
            version: None,
            name: name.into(),
            description: description.into(),
            options: vec![],
            default_permission: None,
        }
    }

    pub fn option(mut self, option: ApplicationCommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Same name, description and options. Ids assigned by discord are ignored.
    pub fn same_definition(&self, other: &ApplicationCommand) -> bool {
        self.name == other.name
            && self.description == other.description
            && same_options(&self.options, &other.options)
            && self.default_permission.unwrap_or(true) == other.default_permission.unwrap_or(true)
    }
}

impl Encode for ApplicationCommand {
    fn encode(&self, _: &dyn RenderContext) -> Result<Value, EncodeError> {
        for option in &self.options {
            option.validate()?;
        }

        Ok(serde_json::to_value(self)?)
    }
}

impl Decode for ApplicationCommand {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        Ok(serde_json::from_value(value)?)
    }
}
