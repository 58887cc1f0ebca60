use std::{fmt, sync::Arc};

use log::{log_enabled, trace, Level};
use reqwest::{
    header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    RequestBuilder, Url,
};

use crate::{
    codec::{Codec, Encode, PlainContext, RenderContext},
    error::{EncodeError, Error},
    executor::{Executor, ResponseFuture, SingleWorker, TaskQueue},
};

pub mod application_command;
pub mod embed;
pub mod interaction;
pub mod snowflake;

use self::{
    application_command::ApplicationCommand,
    interaction::{Interaction, InteractionResponse},
};

pub const API_BASE: &str = "https://discord.com/api/v8";

// discord answers some calls with a body and some without
const REPLIED: &[u16] = &[200, 204];
const CREATED: &[u16] = &[200, 201];
const DELETED: &[u16] = &[204];
const FOUND: &[u16] = &[200];

/// Client for the application command endpoints.
///
/// Every call returns as soon as the request is queued. With the default
/// [`SingleWorker`] requests run one at a time in call order, so a delete
/// followed by a get observes the delete. A [`crate::executor::WorkerPool`]
/// drops that guarantee.
///
/// There is no retry and no rate limit handling: a 429 comes back as
/// [`Error::Api`] like any other unexpected status.
#[derive(Clone)]
pub struct DiscordHttpClient {
    codec: Codec,
    executor: Executor,
    base_url: String,
    application_id: u64,
    authorization: HeaderValue,
}

impl DiscordHttpClient {
    pub fn builder(token: impl Into<String>, application_id: u64) -> DiscordHttpClientBuilder {
        DiscordHttpClientBuilder::new(token.into(), application_id)
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn application_id(&self) -> u64 {
        self.application_id
    }

    /// Answers an interaction. Authorized by the interaction token, not the bot token.
    pub fn submit_interaction_reply(
        &self,
        interaction: &Interaction,
        response: &InteractionResponse,
    ) -> Result<ResponseFuture, Error> {
        let url = self.interaction_url(interaction)?;
        let request = self.with_body(self.executor.http().post(url), response)?;

        self.dispatch(request, REPLIED)
    }

    pub fn submit_global_command(
        &self,
        command: &ApplicationCommand,
    ) -> Result<ResponseFuture, Error> {
        let request = self.with_body(
            self.authorized(self.executor.http().post(self.commands_url(None))),
            command,
        )?;

        self.dispatch(request, CREATED)
    }

    pub fn delete_global_command(&self, command_id: u64) -> Result<ResponseFuture, Error> {
        let url = format!("{}/{}", self.commands_url(None), command_id);

        self.dispatch(self.authorized(self.executor.http().delete(url)), DELETED)
    }

    pub fn submit_guild_command(
        &self,
        command: &ApplicationCommand,
        guild_id: u64,
    ) -> Result<ResponseFuture, Error> {
        let request = self.with_body(
            self.authorized(self.executor.http().post(self.commands_url(Some(guild_id)))),
            command,
        )?;

        self.dispatch(request, CREATED)
    }

    pub fn delete_guild_command(
        &self,
        command_id: u64,
        guild_id: u64,
    ) -> Result<ResponseFuture, Error> {
        let url = format!("{}/{}", self.commands_url(Some(guild_id)), command_id);

        self.dispatch(self.authorized(self.executor.http().delete(url)), DELETED)
    }

    pub fn get_global_command(&self, command_id: u64) -> Result<ResponseFuture, Error> {
        let url = format!("{}/{}", self.commands_url(None), command_id);

        self.dispatch(self.authorized(self.executor.http().get(url)), FOUND)
    }

    pub fn get_global_commands(&self) -> Result<ResponseFuture, Error> {
        self.dispatch(
            self.authorized(self.executor.http().get(self.commands_url(None))),
            FOUND,
        )
    }

    pub fn get_guild_command(
        &self,
        guild_id: u64,
        command_id: u64,
    ) -> Result<ResponseFuture, Error> {
        let url = format!("{}/{}", self.commands_url(Some(guild_id)), command_id);

        self.dispatch(self.authorized(self.executor.http().get(url)), FOUND)
    }

    pub fn get_guild_commands(&self, guild_id: u64) -> Result<ResponseFuture, Error> {
        self.dispatch(
            self.authorized(self.executor.http().get(self.commands_url(Some(guild_id)))),
            FOUND,
        )
    }

    /// Stops taking new requests. Queued ones still run.
    pub fn shutdown(&self) {
        self.executor.shutdown();
    }

    /// Stops taking new requests and drops queued ones, their futures fail with [`Error::Cancelled`].
    pub fn abort(&self) {
        self.executor.abort();
    }

    fn commands_url(&self, guild_id: Option<u64>) -> String {
        match guild_id {
            Some(guild_id) => format!(
                "{}/applications/{}/guilds/{}/commands",
                self.base_url, self.application_id, guild_id
            ),
            None => format!(
                "{}/applications/{}/commands",
                self.base_url, self.application_id
            ),
        }
    }

    // the token is one path segment whatever it contains
    fn interaction_url(&self, interaction: &Interaction) -> Result<Url, Error> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("interactions")
            .push(&interaction.id.to_string())
            .push(&interaction.token)
            .push("callback");

        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(AUTHORIZATION, self.authorization.clone())
    }

    // encoding happens here, before anything is queued
    fn with_body<T: Encode + ?Sized>(
        &self,
        builder: RequestBuilder,
        value: &T,
    ) -> Result<RequestBuilder, Error> {
        let value = self.codec.encode(value)?;
        if log_enabled!(Level::Trace) {
            trace!(
                "request body\n{}",
                serde_json::to_string_pretty(&value).unwrap_or_default()
            );
        }
        let body = serde_json::to_vec(&value).map_err(EncodeError::from)?;

        Ok(builder
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body))
    }

    fn dispatch(
        &self,
        builder: RequestBuilder,
        expected: &'static [u16],
    ) -> Result<ResponseFuture, Error> {
        let request = builder.build().map_err(Error::InvalidRequest)?;

        self.executor.execute(request, expected)
    }
}

impl fmt::Debug for DiscordHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordHttpClient")
            .field("base_url", &self.base_url)
            .field("application_id", &self.application_id)
            .finish_non_exhaustive()
    }
}

pub struct DiscordHttpClientBuilder {
    token: String,
    application_id: u64,
    base_url: String,
    http: Option<reqwest::Client>,
    queue: Option<Arc<dyn TaskQueue>>,
    context: Option<Arc<dyn RenderContext>>,
}

impl DiscordHttpClientBuilder {
    fn new(token: String, application_id: u64) -> Self {
        Self {
            token,
            application_id,
            base_url: API_BASE.to_string(),
            http: None,
            queue: None,
            context: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Transport settings such as timeouts live on this client.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn queue(mut self, queue: impl TaskQueue + 'static) -> Self {
        self.queue = Some(Arc::new(queue));
        self
    }

    pub fn render_context(mut self, context: impl RenderContext + 'static) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    /// Spawns the default worker when no queue was given, so a tokio runtime must be running.
    pub fn build(self) -> Result<DiscordHttpClient, Error> {
        let mut authorization = HeaderValue::from_str(&format!("Bot {}", self.token))?;
        authorization.set_sensitive(true);

        let queue = match self.queue {
            Some(queue) => queue,
            None => Arc::new(SingleWorker::new()?),
        };
        let context = self
            .context
            .unwrap_or_else(|| Arc::new(PlainContext) as Arc<dyn RenderContext>);

        Ok(DiscordHttpClient {
            codec: Codec::new(context),
            executor: Executor::new(self.http.unwrap_or_default(), queue),
            base_url: self.base_url,
            application_id: self.application_id,
            authorization,
        })
    }
}
