use poise::serenity_prelude as serenity;
use tracing::error;

use crate::CommandMeta;
use crate::punishments::embeds::{
    feature_disabled_message, guild_only_message, reply_private, usage_message,
};
use vsa_core::{Context, Error};
use vsa_moderation::templates::human_duration;
use vsa_utils::formatting::{action_display_name, format_points};
use vsa_utils::permissions::{has_user_permission, missing_permission_message};

pub const META: CommandMeta = CommandMeta {
    name: "punish_points",
    usage: "!punish_points <user>",
};

/// Show a user's points and what the ladder would do next.
#[poise::command(prefix_command, slash_command, category = "Punishments")]
pub async fn punish_points(
    ctx: Context<'_>,
    #[description = "The user to inspect"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let required = serenity::Permissions::MODERATE_MEMBERS;
    if !has_user_permission(ctx.http(), guild_id, ctx.author().id, required).await? {
        reply_private(ctx, missing_permission_message(required)).await?;
        return Ok(());
    }

    let Some(user) = user else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    let service = &ctx.data().punishments;
    if !service.is_enabled() {
        reply_private(ctx, feature_disabled_message()).await?;
        return Ok(());
    }

    let preview = match service.preview_next_action(user.id.get(), None, None, None) {
        Ok(preview) => preview,
        Err(source) => {
            error!(?source, user_id = %user.id, "failed to read points");
            reply_private(ctx, "Failed to read points.").await?;
            return Ok(());
        }
    };

    reply_private(
        ctx,
        format!(
            "<@{}> has **{}** point(s). Next action (+{}): {} ({}).",
            user.id.get(),
            format_points(preview.current_points),
            format_points(preview.points_delta),
            action_display_name(preview.action.as_str()),
            human_duration(preview.duration_seconds)
        ),
    )
    .await?;

    Ok(())
}
