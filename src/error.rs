use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

use crate::{
    discord::{application_command::ApplicationCommandOptionType, interaction::InteractionResponseType},
    executor::{ApiResponse, RequestDescription},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Discord could not be reached, or the connection broke while reading the response.
    #[error("failed to reach discord - {0}")]
    Transport(#[source] reqwest::Error),
    /// Discord answered with a status outside of the expected set.
    #[error(transparent)]
    Api(#[from] DiscordApiError),
    #[error("failed to encode request body - {0}")]
    Encode(#[from] EncodeError),
    #[error("failed to decode payload - {0}")]
    Decode(#[from] DecodeError),
    #[error("failed to build request - {0}")]
    InvalidRequest(#[source] reqwest::Error),
    #[error("invalid url - {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("bot token is not a valid header value")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
    #[error("no tokio runtime to spawn workers on")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    #[error("client is shut down")]
    Shutdown,
    #[error("request was dropped before completion")]
    Cancelled,
}

impl Error {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn api_error(&self) -> Option<&DiscordApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Status of the received response, for classification failures only.
    pub fn status(&self) -> Option<StatusCode> {
        self.api_error().map(DiscordApiError::status)
    }
}

/// A response was received, but its status is not one the operation accepts.
#[derive(Debug)]
pub struct DiscordApiError {
    pub expected: Vec<u16>,
    pub request: RequestDescription,
    pub response: ApiResponse,
}

impl DiscordApiError {
    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    pub fn is_not_found(&self) -> bool {
        self.response.status == StatusCode::NOT_FOUND
    }

    pub fn is_rate_limited(&self) -> bool {
        self.response.status == StatusCode::TOO_MANY_REQUESTS
    }
}

impl fmt::Display for DiscordApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} returned {} (expected one of {:?}): {}",
            self.request,
            self.response.status,
            self.expected,
            self.response.text()
        )
    }
}

impl std::error::Error for DiscordApiError {}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("option `{option}` has option type {code}, which this client cannot check")]
    UnknownOptionType { option: String, code: u8 },
    #[error("option `{option}` of type {kind:?} cannot carry nested options")]
    NestedOptionsNotAllowed {
        option: String,
        kind: ApplicationCommandOptionType,
    },
    #[error("sub command group `{group}` may only contain sub commands, `{child}` is {kind:?}")]
    GroupChildNotSubCommand {
        group: String,
        child: String,
        kind: ApplicationCommandOptionType,
    },
    #[error("sub command `{parent}` cannot contain another sub command `{child}`")]
    NestedSubCommand { parent: String, child: String },
    #[error("option `{option}` of type {kind:?} cannot be required")]
    RequiredNotAllowed {
        option: String,
        kind: ApplicationCommandOptionType,
    },
    #[error("option `{option}` of type {kind:?} cannot carry choices")]
    ChoicesNotAllowed {
        option: String,
        kind: ApplicationCommandOptionType,
    },
    #[error("choice `{choice}` does not match type {kind:?} of option `{option}`")]
    ChoiceTypeMismatch {
        option: String,
        choice: String,
        kind: ApplicationCommandOptionType,
    },
    #[error("interaction response type {0:?} does not carry data")]
    UnexpectedData(InteractionResponseType),
    #[error("interaction response type {0:?} requires data")]
    MissingData(InteractionResponseType),
    #[error("message needs content or at least one embed")]
    EmptyMessage,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("expected {expected} for {target}")]
    Unexpected {
        target: &'static str,
        expected: &'static str,
    },
    #[error("unknown {target} code {code}")]
    UnknownCode { target: &'static str, code: Value },
    #[error("invalid timestamp - {0}")]
    Timestamp(#[from] chrono::ParseError),
}
