use poise::serenity_prelude as serenity;
use tracing::{error, warn};

use crate::CommandMeta;
use crate::punishments::embeds::{guild_only_message, reply_private, usage_message};
use vsa_core::{Context, Error};
use vsa_moderation::PunishmentError;
use vsa_moderation::platform::PlatformError;
use vsa_utils::parse::parse_user_id;
use vsa_utils::permissions::{has_user_permission, missing_permission_message};

pub const META: CommandMeta = CommandMeta {
    name: "punish_unban",
    usage: "!punish_unban <user_id> [reason]",
};

/// Lift a ban and record an `unban` case.
#[poise::command(prefix_command, slash_command, category = "Punishments")]
pub async fn punish_unban(
    ctx: Context<'_>,
    #[description = "User id or mention of the banned user"] user_id: Option<String>,
    #[description = "Reason for the unban"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let required = serenity::Permissions::BAN_MEMBERS;
    if !has_user_permission(ctx.http(), guild_id, ctx.author().id, required).await? {
        reply_private(ctx, missing_permission_message(required)).await?;
        return Ok(());
    }

    let Some(user_id) = user_id.as_deref().and_then(parse_user_id) else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    let unbanned = ctx
        .data()
        .punishments
        .unban(
            guild_id.get(),
            ctx.author().id.get(),
            user_id,
            reason.as_deref(),
        )
        .await;

    let message = match unbanned {
        Ok(case_id) => format!("Unbanned <@{user_id}>. Case `{case_id}`."),
        Err(PunishmentError::Platform(PlatformError::NotFound)) => {
            "That user is not banned.".to_owned()
        }
        Err(PunishmentError::Platform(PlatformError::MissingPermissions)) => {
            warn!(user_id, "missing permissions to unban");
            "I don't have permission to unban that user.".to_owned()
        }
        Err(rejection) if rejection.is_rejection() => rejection.to_string(),
        Err(source) => {
            error!(?source, user_id, "unban failed");
            format!("Failed: {source}")
        }
    };

    reply_private(ctx, message).await?;
    Ok(())
}
