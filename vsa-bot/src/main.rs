mod events;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use tracing::{debug, error, info};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;

use vsa_core::platform::SerenityPlatform;
use vsa_core::{Data, Error};
use vsa_database::PunishmentStore;
use vsa_moderation::chat_filter::parse_phrase_list;
use vsa_moderation::config::DEFAULT_EMBED_COLOR;
use vsa_moderation::sweeper::DEFAULT_SWEEP_INTERVAL;
use vsa_moderation::{
    BotConfig, ChatFilter, MaintenanceSweeper, PunishmentConfig, PunishmentService,
};

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        let target = metadata.target();

        let within_info_level = *metadata.level() <= tracing::Level::INFO;
        if !within_info_level {
            return false;
        }

        !(target.starts_with("serenity::gateway::bridge::shard_manager")
            || target.starts_with("serenity::gateway::bridge::shard_runner"))
    }));

    tracing_subscriber::registry().with(fmt_layer).init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    dotenvy::dotenv().ok();

    let token = env::var("DISCORD_TOKEN").context("DISCORD_TOKEN is not set")?;
    let guild_id = env::var("DISCORD_GUILD_ID")
        .context("DISCORD_GUILD_ID is not set")?
        .parse::<u64>()
        .context("DISCORD_GUILD_ID must be a numeric id")?;
    let config_path =
        env::var("BOT_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let sweep_interval = Duration::from_secs(
        env_u64(
            "MAINTENANCE_INTERVAL_SECONDS",
            DEFAULT_SWEEP_INTERVAL.as_secs(),
        )
        .max(1),
    );

    let bot_config = BotConfig::load(&config_path)?;
    let punishments_config = PunishmentConfig::from_bot_config(&bot_config)?;
    info!(
        path = %config_path,
        punishments_enabled = punishments_config.enabled,
        ladder_rungs = punishments_config.ladder.len(),
        "config loaded."
    );

    let store = PunishmentStore::open(bot_config.punishments_db_path())?;
    info!(
        path = %store.path().display(),
        cases = store.case_count()?,
        "punishment store opened."
    );

    let blacklist = parse_phrase_list(&env::var("BLACKLISTED_WORDS").unwrap_or_default());
    let chat_filter = ChatFilter::new(&bot_config.features.filtered_chat, &blacklist)
        .context("failed to compile chat filter phrases")?;
    if chat_filter.is_enabled() {
        info!(
            phrases = chat_filter.phrase_count(),
            punishments_mode = chat_filter.punishments_mode(),
            "chat filter enabled."
        );
    } else {
        info!("chat filter disabled (features.filtered_chat.enable_feature=false).");
    }

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let store = Arc::new(store);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vsa_commands::commands(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handle_event(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(vsa_utils::COMMAND_PREFIX.to_string()),
                mention_as_prefix: false,
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!(bot = %ready.user.name, "VSA bot is online!");

                poise::builtins::register_in_guild(
                    ctx,
                    &framework.options().commands,
                    serenity::GuildId::new(guild_id),
                )
                .await?;

                let platform = Arc::new(SerenityPlatform::new(ctx.http.clone()));
                let punishments = Arc::new(PunishmentService::new(
                    store,
                    platform,
                    punishments_config,
                ));

                MaintenanceSweeper::new(punishments.clone(), ready.user.id.get())
                    .spawn(sweep_interval);
                info!(
                    interval_seconds = sweep_interval.as_secs(),
                    "maintenance sweep scheduled."
                );

                Ok(Data::new(punishments, chat_filter, blacklist, config_path))
            })
        })
        .build();

    info!("VSA bot is connecting...");

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    client.start().await?;
    Ok(())
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(value) => value.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(?error, command = %ctx.command().qualified_name, "command error");

            let embed = serenity::CreateEmbed::new()
                .title("Command Error")
                .description("Something went wrong while running this command.")
                .color(DEFAULT_EMBED_COLOR);

            let _ = ctx
                .send(poise::CreateReply::default().ephemeral(true).embed(embed))
                .await;
        }
        poise::FrameworkError::ArgumentParse { ctx, input, .. } => {
            let usage = vsa_commands::COMMANDS
                .iter()
                .find(|meta| meta.name == ctx.command().name)
                .map_or_else(
                    || format!("!{}", ctx.command().qualified_name),
                    |meta| meta.usage.to_string(),
                );
            let description = if let Some(input) = input {
                format!("Invalid argument: `{}`\nUsage: `{}`", input, usage)
            } else {
                format!("Missing required argument.\nUsage: `{}`", usage)
            };

            let _ = ctx.say(description).await;
        }
        poise::FrameworkError::UnknownCommand { .. } => {
            debug!("unknown command invocation");
        }
        other => {
            error!(?other, "framework error");
        }
    }
}

async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            events::word_filter::handle_message_word_filter(ctx, data, new_message).await;
        }
        serenity::FullEvent::MessageUpdate { new, event, .. } => {
            events::word_filter::handle_message_update_word_filter(ctx, data, new.as_ref(), event)
                .await;
        }
        _ => {}
    }

    Ok(())
}
