use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use once_cell::sync::OnceCell;
use serenity::{
    client::{Context, EventHandler},
    model::{
        application::interaction::Interaction as GatewayInteraction,
        gateway::{GatewayIntents, Ready},
    },
    Client,
};
use slash_http::{
    discord::interaction::InteractionDataOption, ApplicationCommand, Config, DiscordHttpClient,
    EmbedFooter, Interaction, InteractionResponse, InteractionType, MessageEmbed, RenderContext,
};

// bot identity, known once the gateway says ready
struct SessionContext {
    footer: EmbedFooter,
    color: Option<u32>,
}

impl RenderContext for SessionContext {
    fn default_color(&self) -> Option<u32> {
        self.color
    }

    fn default_footer(&self) -> Option<EmbedFooter> {
        Some(self.footer.clone())
    }
}

struct Handler {
    config: Config,
    http: Arc<OnceCell<DiscordHttpClient>>,
}

// "sub value" pairs, sub commands flattened into the name
fn describe_options(
    embed: MessageEmbed,
    prefix: &str,
    options: &[InteractionDataOption],
) -> MessageEmbed {
    options.iter().fold(embed, |embed, option| {
        let name = format!("{}{}", prefix, option.name);
        match &option.value {
            Some(value) => {
                let value = match value.as_str() {
                    Some(s) => s.to_string(),
                    None => value.to_string(),
                };
                embed.field(name, value, true)
            }
            None => describe_options(embed, &format!("{} ", name), &option.options),
        }
    })
}

impl Handler {
    fn http_client(&self, ready: &Ready) -> anyhow::Result<&DiscordHttpClient> {
        if let Some(http) = self.http.get() {
            return Ok(http);
        }

        let context = SessionContext {
            footer: EmbedFooter::new(&ready.user.name).icon_url(ready.user.face()),
            color: self.config.embed.color,
        };
        let http = self
            .config
            .client_builder()?
            .render_context(context)
            .build()
            .context("Failed to build http client")?;

        Ok(self.http.get_or_init(|| http))
    }

    // register or update configured commands, optionally delete the rest
    async fn register_commands(&self, http: &DiscordHttpClient) -> anyhow::Result<()> {
        let guild_id = self.config.discord.guild_id;
        let listed = match guild_id {
            Some(guild_id) => http.get_guild_commands(guild_id)?,
            None => http.get_global_commands()?,
        }
        .await
        .context("Failed to list commands")?;
        let registered: Vec<ApplicationCommand> = http.codec().decode_slice(&listed.body)?;

        for command in &self.config.commands {
            if registered.iter().any(|cmd| cmd.same_definition(command)) {
                debug!("command {} is up to date", command.name);
                continue;
            }

            let pending = match guild_id {
                Some(guild_id) => http.submit_guild_command(command, guild_id)?,
                None => http.submit_global_command(command)?,
            };
            pending
                .await
                .with_context(|| format!("Failed to register command {}", command.name))?;
            info!("registered command {}", command.name);
        }

        if !self.config.discord.prune_commands {
            return Ok(());
        }

        let stale = registered.iter().filter(|cmd| {
            !self
                .config
                .commands
                .iter()
                .any(|configured| configured.name == cmd.name)
        });
        for command in stale {
            let command_id = match command.id {
                Some(id) => id,
                None => continue,
            };
            let pending = match guild_id {
                Some(guild_id) => http.delete_guild_command(command_id, guild_id)?,
                None => http.delete_global_command(command_id)?,
            };
            pending
                .await
                .with_context(|| format!("Failed to delete command {}", command.name))?;
            info!("deleted command {}", command.name);
        }

        Ok(())
    }

    async fn reply(
        &self,
        http: &DiscordHttpClient,
        interaction: &GatewayInteraction,
    ) -> anyhow::Result<()> {
        let value = serde_json::to_value(interaction).context("Failed to read interaction")?;
        let interaction: Interaction = http.codec().decode(value)?;
        if interaction.kind() != Some(InteractionType::ApplicationCommand) {
            return Ok(());
        }
        let data = match &interaction.data {
            Some(data) => data,
            None => return Ok(()),
        };

        let mut embed = describe_options(
            MessageEmbed::new()
                .title(format!("/{}", data.name))
                .timestamp(Utc::now()),
            "",
            &data.options,
        );
        if embed.fields.is_empty() {
            embed = embed.description("no options");
        }

        http.submit_interaction_reply(&interaction, &InteractionResponse::embed(embed))?
            .await
            .context("Failed to send reply")?;

        Ok(())
    }
}

#[async_trait]
impl EventHandler for Handler {
    // on connected to discord
    async fn ready(&self, _: Context, ready: Ready) {
        info!("connected as {}", ready.user.name);

        let result = match self.http_client(&ready) {
            Ok(http) => self.register_commands(http).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!("{:?}", e);
        }
    }

    // run on firing slash command
    async fn interaction_create(&self, _: Context, interaction: GatewayInteraction) {
        let http = match self.http.get() {
            Some(http) => http,
            None => {
                warn!("interaction arrived before ready, dropped");
                return;
            }
        };

        if let Err(e) = self.reply(http, &interaction).await {
            error!("{:?}", e);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let config = Config::from_env().context("Failed to load config")?;
    debug!("{:?}", config);

    let token = config.discord.token.clone();
    let application_id = config.discord.application_id;
    let http = Arc::new(OnceCell::new());

    let mut client = Client::builder(&token, GatewayIntents::empty())
        .application_id(application_id)
        .event_handler(Handler {
            config,
            http: http.clone(),
        })
        .await
        .context("Failed to create discord client")?;

    let shard_manager = client.shard_manager.clone();

    // stop the bot when SIGINT occured.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not register ctrl+c handler - {}", e);
            return;
        }
        shard_manager.lock().await.shutdown_all().await;
    });

    client.start().await?;

    if let Some(http) = http.get() {
        http.shutdown();
    }

    Ok(())
}
