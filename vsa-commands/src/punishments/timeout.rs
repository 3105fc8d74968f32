use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::punishments::apply::{Punishment, run_punishment};
use crate::punishments::embeds::{reply_private, usage_message};
use vsa_core::{Context, Error};
use vsa_database::model::cases::CaseAction;
use vsa_moderation::templates::human_duration;
use vsa_utils::parse::parse_duration_seconds;

pub const META: CommandMeta = CommandMeta {
    name: "punish_timeout",
    usage: "!punish_timeout <user> <duration> [reason_code] [custom reason]",
};

/// Discord caps communication timeouts at 28 days.
pub const MAX_TIMEOUT_SECONDS: u64 = 28 * 24 * 60 * 60;

/// Timeout a user for a duration (e.g. 600, 10m, 2h).
#[poise::command(prefix_command, slash_command, category = "Punishments")]
pub async fn punish_timeout(
    ctx: Context<'_>,
    #[description = "The user to timeout"] user: Option<serenity::User>,
    #[description = "Duration (e.g. 600, 10m, 2h)"] duration: Option<String>,
    #[description = "Preset reason code, or a custom reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let Some(raw_duration) = duration else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    let Some(duration_seconds) = parse_duration_seconds(&raw_duration) else {
        ctx.say(format!(
            "Invalid duration. Usage: `{}` (examples: 600, 30s, 10m, 2h, 1d)",
            META.usage
        ))
        .await?;
        return Ok(());
    };

    if duration_seconds > MAX_TIMEOUT_SECONDS {
        reply_private(ctx, "Timeouts can last at most 28 days.").await?;
        return Ok(());
    }

    let punishment = Punishment {
        verb: "timeout",
        usage: META.usage,
        required: serenity::Permissions::MODERATE_MEMBERS,
        force_action: Some(CaseAction::Timeout),
        force_duration: Some(duration_seconds),
    };

    if let Some((user, case_id)) = run_punishment(ctx, punishment, user, reason).await? {
        reply_private(
            ctx,
            format!(
                "Timed out <@{}> for {}. Case `{case_id}`.",
                user.id.get(),
                human_duration(duration_seconds)
            ),
        )
        .await?;
    }

    Ok(())
}
