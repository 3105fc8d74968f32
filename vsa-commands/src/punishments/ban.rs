use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::punishments::apply::{Punishment, run_punishment};
use crate::punishments::embeds::reply_private;
use vsa_core::{Context, Error};
use vsa_database::model::cases::CaseAction;

pub const META: CommandMeta = CommandMeta {
    name: "punish_ban",
    usage: "!punish_ban <user> [reason_code] [custom reason]",
};

/// Ban a user permanently.
#[poise::command(prefix_command, slash_command, category = "Punishments")]
pub async fn punish_ban(
    ctx: Context<'_>,
    #[description = "The user to ban"] user: Option<serenity::User>,
    #[description = "Preset reason code, or a custom reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let punishment = Punishment {
        verb: "ban",
        usage: META.usage,
        required: serenity::Permissions::BAN_MEMBERS,
        force_action: Some(CaseAction::Ban),
        force_duration: Some(0),
    };

    if let Some((user, case_id)) = run_punishment(ctx, punishment, user, reason).await? {
        reply_private(ctx, format!("Banned <@{}>. Case `{case_id}`.", user.id.get())).await?;
    }

    Ok(())
}
