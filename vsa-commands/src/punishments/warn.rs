use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::punishments::apply::{Punishment, run_punishment};
use crate::punishments::embeds::reply_private;
use vsa_core::{Context, Error};
use vsa_database::model::cases::CaseAction;
use vsa_utils::formatting::action_display_name;

pub const META: CommandMeta = CommandMeta {
    name: "punish_warn",
    usage: "!punish_warn <user> [reason_code] [custom reason]",
};

/// Warn a user (adds points and logs; the ladder may escalate).
#[poise::command(prefix_command, slash_command, category = "Punishments")]
pub async fn punish_warn(
    ctx: Context<'_>,
    #[description = "The user to warn"] user: Option<serenity::User>,
    #[description = "Preset reason code, or a custom reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let punishment = Punishment {
        verb: "warn",
        usage: META.usage,
        required: serenity::Permissions::MODERATE_MEMBERS,
        force_action: None,
        force_duration: None,
    };

    let Some((user, case_id)) = run_punishment(ctx, punishment, user, reason).await? else {
        return Ok(());
    };

    // The ladder may have escalated past a warning.
    let applied = ctx
        .data()
        .punishments
        .store()
        .get_case(&case_id)
        .ok()
        .flatten()
        .map(|case| case.action);

    let message = match applied {
        Some(action) if action != CaseAction::Warn => format!(
            "Warned <@{}>; escalated to {}. Case `{case_id}`.",
            user.id.get(),
            action_display_name(action.as_str())
        ),
        _ => format!("Warned <@{}>. Case `{case_id}`.", user.id.get()),
    };
    reply_private(ctx, message).await?;

    Ok(())
}
