use poise::serenity_prelude as serenity;
use tracing::error;

use crate::CommandMeta;
use crate::punishments::embeds::{guild_only_message, reply_private, usage_message};
use vsa_core::{Context, Error};
use vsa_database::model::cases::Case;
use vsa_moderation::templates::human_duration;
use vsa_utils::embed::MESSAGE_CONTENT_LIMIT;
use vsa_utils::formatting::{
    action_display_name, format_points, sanitize_mentions, truncate_with_marker, yes_no,
};
use vsa_utils::permissions::{has_user_permission, missing_permission_message};
use vsa_utils::time::{format_optional_utc, format_utc};

pub const META: CommandMeta = CommandMeta {
    name: "punish_case",
    usage: "!punish_case <case_id>",
};

/// Show one case in full.
#[poise::command(prefix_command, slash_command, category = "Punishments")]
pub async fn punish_case(
    ctx: Context<'_>,
    #[description = "Case id (e.g. PK-000042)"] case_id: Option<String>,
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

    let Some(case_id) = case_id
        .map(|case_id| case_id.trim().to_ascii_uppercase())
        .filter(|case_id| !case_id.is_empty())
    else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    let case = match ctx.data().punishments.store().get_case(&case_id) {
        Ok(case) => case,
        Err(source) => {
            error!(?source, %case_id, "failed to load case");
            reply_private(ctx, "Failed to load case.").await?;
            return Ok(());
        }
    };

    // Cases from other servers sharing the store stay hidden.
    let Some(case) = case.filter(|case| case.guild_id == guild_id.get()) else {
        reply_private(ctx, format!("Case `{case_id}` was not found.")).await?;
        return Ok(());
    };

    reply_private(
        ctx,
        truncate_with_marker(&case_details(&case), MESSAGE_CONTENT_LIMIT),
    )
    .await?;
    Ok(())
}

pub(crate) fn case_details(case: &Case) -> String {
    let mut lines = vec![
        format!("**Case {}**", case.case_id),
        format!("User: <@{}>", case.user_id),
        format!("Moderator: <@{}>", case.moderator_id),
        format!(
            "Action: {} ({})",
            action_display_name(case.action.as_str()),
            human_duration(case.duration_seconds)
        ),
        format!("Reason: {}", sanitize_mentions(&case.reason_text)),
        format!(
            "Points Δ: {} → {}",
            format_points(case.points_delta),
            format_points(case.points_after)
        ),
        format!("Created: {}", format_utc(case.created_at)),
        format!("Ends: {}", format_optional_utc(case.end_at)),
        format!("Evidence: {}", case.evidence_link.as_deref().unwrap_or("N/A")),
        format!(
            "DM Sent: {} | Public Notice: {}",
            yes_no(case.dm_sent),
            yes_no(case.announced_publicly)
        ),
    ];

    if let Some(source_case_id) = case.source_case_id.as_deref() {
        lines.push(format!("Reverses: `{source_case_id}`"));
    }

    for note in &case.notes {
        lines.push(format!("⚠️ {note}"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use vsa_database::model::cases::{Case, CaseAction};

    use super::case_details;

    #[test]
    fn details_include_reversal_and_notes() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let case = Case {
            case_id: "PK-000009".to_owned(),
            guild_id: 1,
            user_id: 42,
            moderator_id: 7,
            reason_code: Some("auto_unban".to_owned()),
            reason_text: "Temporary ban expired".to_owned(),
            points_delta: 0.0,
            points_after: 4.5,
            action: CaseAction::Unban,
            duration_seconds: 0,
            start_at: Some(at),
            end_at: None,
            evidence_link: None,
            announced_publicly: false,
            dm_sent: false,
            created_at: at,
            notes: vec!["Action failed: missing permissions.".to_owned()],
            source_case_id: Some("PK-000003".to_owned()),
        };

        let details = case_details(&case);
        assert!(details.starts_with("**Case PK-000009**"));
        assert!(details.contains("Action: Unban (permanent)"));
        assert!(details.contains("Points Δ: 0.00 → 4.50"));
        assert!(details.contains("Ends: N/A"));
        assert!(details.contains("Reverses: `PK-000003`"));
        assert!(details.ends_with("⚠️ Action failed: missing permissions."));
    }
}
