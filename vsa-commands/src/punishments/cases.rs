use poise::serenity_prelude as serenity;
use tracing::error;

use crate::CommandMeta;
use crate::punishments::embeds::{
    guild_only_message, no_cases_message, reply_private, usage_message, user_case_line,
};
use vsa_core::{Context, Error};
use vsa_utils::embed::MESSAGE_CONTENT_LIMIT;
use vsa_utils::formatting::truncate_with_marker;
use vsa_utils::permissions::{has_user_permission, missing_permission_message};

pub const META: CommandMeta = CommandMeta {
    name: "punish_cases",
    usage: "!punish_cases <user> [limit]",
};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 25;

/// List a user's most recent cases in this server.
#[poise::command(prefix_command, slash_command, category = "Punishments")]
pub async fn punish_cases(
    ctx: Context<'_>,
    #[description = "The user to look up"] user: Option<serenity::User>,
    #[description = "How many cases to show (1-25)"] limit: Option<usize>,
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

    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let cases = match ctx
        .data()
        .punishments
        .store()
        .list_cases(user.id.get(), limit, 0)
    {
        Ok(cases) => cases,
        Err(source) => {
            error!(?source, user_id = %user.id, "failed to list cases");
            reply_private(ctx, "Failed to load cases.").await?;
            return Ok(());
        }
    };

    let lines: Vec<String> = cases
        .iter()
        .filter(|case| case.guild_id == guild_id.get())
        .map(user_case_line)
        .collect();

    if lines.is_empty() {
        reply_private(ctx, no_cases_message()).await?;
        return Ok(());
    }

    let content = format!(
        "Cases for <@{}>:\n{}",
        user.id.get(),
        lines.join("\n")
    );
    reply_private(ctx, truncate_with_marker(&content, MESSAGE_CONTENT_LIMIT)).await?;

    Ok(())
}
