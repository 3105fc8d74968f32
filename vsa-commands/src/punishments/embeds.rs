use poise::serenity_prelude as serenity;

use vsa_core::Context;
use vsa_database::model::cases::Case;
use vsa_moderation::config::ReasonPreset;
use vsa_moderation::templates::human_duration;
use vsa_utils::formatting::sanitize_mentions;
use vsa_utils::time::format_optional_utc;

pub fn usage_message(usage: &str) -> String {
    format!("Usage: `{usage}`")
}

pub fn guild_only_message() -> &'static str {
    "This command only works in servers."
}

pub fn feature_disabled_message() -> &'static str {
    "Punishments feature is disabled."
}

pub fn no_cases_message() -> &'static str {
    "No cases found."
}

pub fn self_action_message(action: &str) -> String {
    format!("You can't {action} yourself.")
}

pub fn bot_target_message() -> &'static str {
    "You can't use moderation actions on bots or application accounts."
}

/// Reply that only the invoker sees on slash commands.
pub async fn reply_private(ctx: Context<'_>, content: impl Into<String>) -> Result<(), serenity::Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true)
            .allowed_mentions(serenity::CreateAllowedMentions::new()),
    )
    .await?;
    Ok(())
}

/// One-line case summary for guild listings.
pub fn case_line(case: &Case) -> String {
    format!(
        "[{}] {} ({}) — <@{}> — {} — {}",
        case.case_id,
        case.action.as_str().to_ascii_uppercase(),
        human_duration(case.duration_seconds),
        case.user_id,
        sanitize_mentions(&case.reason_text),
        format_optional_utc(case.start_at)
    )
}

/// One-line case summary when the user is already known.
pub fn user_case_line(case: &Case) -> String {
    format!(
        "[{}] {} ({}) — {} — {}",
        case.case_id,
        case.action.as_str().to_ascii_uppercase(),
        human_duration(case.duration_seconds),
        sanitize_mentions(&case.reason_text),
        format_optional_utc(case.start_at)
    )
}

/// Split the first word off as a preset code when it names one; otherwise the whole text is
/// a custom reason.
pub fn split_reason(raw: Option<&str>, presets: &[ReasonPreset]) -> (Option<String>, Option<String>) {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return (None, None);
    };

    let (first, rest) = match raw.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (raw, ""),
    };

    if presets
        .iter()
        .any(|preset| preset.code.eq_ignore_ascii_case(first))
    {
        let custom = (!rest.is_empty()).then(|| rest.to_owned());
        (Some(first.to_owned()), custom)
    } else {
        (None, Some(raw.to_owned()))
    }
}
