use poise::serenity_prelude as serenity;
use tracing::error;

use crate::CommandMeta;
use crate::punishments::embeds::{case_line, guild_only_message, no_cases_message, reply_private};
use vsa_core::{Context, Error};
use vsa_utils::embed::MESSAGE_CONTENT_LIMIT;
use vsa_utils::formatting::truncate_with_marker;
use vsa_utils::permissions::{has_user_permission, missing_permission_message};

pub const META: CommandMeta = CommandMeta {
    name: "punish_recent",
    usage: "!punish_recent [limit]",
};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 50;

/// Most recent cases in this server, newest first.
#[poise::command(prefix_command, slash_command, category = "Punishments")]
pub async fn punish_recent(
    ctx: Context<'_>,
    #[description = "How many cases to show (1-50)"] limit: Option<usize>,
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

    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let cases = match ctx
        .data()
        .punishments
        .store()
        .list_recent_cases_for_guild(guild_id.get(), limit, 0)
    {
        Ok(cases) => cases,
        Err(source) => {
            error!(?source, "failed to list recent cases");
            reply_private(ctx, "Failed to load cases.").await?;
            return Ok(());
        }
    };

    if cases.is_empty() {
        reply_private(ctx, no_cases_message()).await?;
        return Ok(());
    }

    let content = cases.iter().map(case_line).collect::<Vec<_>>().join("\n");
    reply_private(ctx, truncate_with_marker(&content, MESSAGE_CONTENT_LIMIT)).await?;

    Ok(())
}
