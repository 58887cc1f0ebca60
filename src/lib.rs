//! Client for Discord's application command HTTP API.
//!
//! ```no_run
//! # async fn run() -> Result<(), slash_http::Error> {
//! use slash_http::{ApplicationCommand, DiscordHttpClient};
//!
//! let client = DiscordHttpClient::builder("token", 775_799_577_604_522_054).build()?;
//! let created = client
//!     .submit_global_command(&ApplicationCommand::new("ping", "answers pong"))?
//!     .await?;
//! let command: ApplicationCommand = client.codec().decode_slice(&created.body)?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
pub mod codec;
pub mod config;
pub mod discord;
pub mod error;
pub mod executor;

pub use self::{
    codec::{Codec, Decode, Encode, PlainContext, RenderContext, WireEnum},
    config::Config,
    discord::{
        application_command::{
            ApplicationCommand, ApplicationCommandOption, ApplicationCommandOptionType,
        },
        embed::{EmbedAuthor, EmbedFooter, MessageEmbed},
        interaction::{Interaction, InteractionResponse, InteractionResponseType, InteractionType},
        DiscordHttpClient, DiscordHttpClientBuilder,
    },
    error::{DecodeError, DiscordApiError, EncodeError, Error},
    executor::{ApiResponse, ResponseFuture, SingleWorker, TaskQueue, WorkerPool},
};
