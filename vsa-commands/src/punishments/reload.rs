use poise::serenity_prelude as serenity;
use tracing::error;

use crate::CommandMeta;
use crate::punishments::embeds::{guild_only_message, reply_private};
use vsa_core::{Context, Error};
use vsa_utils::permissions::{has_user_permission, missing_permission_message};

pub const META: CommandMeta = CommandMeta {
    name: "punish_reload",
    usage: "!punish_reload",
};

/// Re-read the config file without restarting the bot.
#[poise::command(prefix_command, slash_command, category = "Punishments")]
pub async fn punish_reload(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let required = serenity::Permissions::ADMINISTRATOR;
    if !has_user_permission(ctx.http(), guild_id, ctx.author().id, required).await? {
        reply_private(ctx, missing_permission_message(required)).await?;
        return Ok(());
    }

    match ctx.data().reload_config() {
        Ok(()) => reply_private(ctx, "Punishments config reloaded.").await?,
        Err(source) => {
            error!(?source, "config reload failed");
            reply_private(ctx, format!("Reload failed: {source:#}")).await?;
        }
    }

    Ok(())
}
