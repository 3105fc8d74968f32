use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::punishments::apply::{Punishment, run_punishment};
use crate::punishments::embeds::{reply_private, usage_message};
use vsa_core::{Context, Error};
use vsa_database::model::cases::CaseAction;
use vsa_moderation::templates::human_duration;
use vsa_utils::parse::parse_duration_seconds;

pub const META: CommandMeta = CommandMeta {
    name: "punish_tempban",
    usage: "!punish_tempban <user> <duration> [reason_code] [custom reason]",
};

/// Ban a user until the maintenance sweep lifts it after `duration`.
#[poise::command(prefix_command, slash_command, category = "Punishments")]
pub async fn punish_tempban(
    ctx: Context<'_>,
    #[description = "The user to temp-ban"] user: Option<serenity::User>,
    #[description = "Duration (e.g. 3600, 12h, 7d)"] duration: Option<String>,
    #[description = "Preset reason code, or a custom reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let Some(duration_seconds) = duration.as_deref().and_then(parse_duration_seconds) else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    let punishment = Punishment {
        verb: "temp-ban",
        usage: META.usage,
        required: serenity::Permissions::BAN_MEMBERS,
        force_action: Some(CaseAction::Tempban),
        force_duration: Some(duration_seconds),
    };

    if let Some((user, case_id)) = run_punishment(ctx, punishment, user, reason).await? {
        reply_private(
            ctx,
            format!(
                "Temp-banned <@{}> for {}. Case `{case_id}`.",
                user.id.get(),
                human_duration(duration_seconds)
            ),
        )
        .await?;
    }

    Ok(())
}
