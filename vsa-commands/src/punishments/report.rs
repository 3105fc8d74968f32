use poise::serenity_prelude as serenity;
use tracing::error;

use crate::CommandMeta;
use crate::punishments::embeds::{case_line, guild_only_message, no_cases_message, reply_private};
use vsa_core::{Context, Error};
use vsa_moderation::report::{ReportSummary, summarize};
use vsa_utils::embed::{build_embed, count_lines, field_value};
use vsa_utils::formatting::action_display_name;
use vsa_utils::permissions::{has_user_permission, missing_permission_message};

pub const META: CommandMeta = CommandMeta {
    name: "punish_report",
    usage: "!punish_report [limit]",
};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 50;
const RECENT_PREVIEW: usize = 5;

/// Summarize the most recent cases in this server.
#[poise::command(prefix_command, slash_command, category = "Punishments")]
pub async fn punish_report(
    ctx: Context<'_>,
    #[description = "How many recent cases to summarize (1-50)"] limit: Option<usize>,
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
    let service = &ctx.data().punishments;
    let cases = match service
        .store()
        .list_recent_cases_for_guild(guild_id.get(), limit, 0)
    {
        Ok(cases) => cases,
        Err(source) => {
            error!(?source, "failed to load cases for report");
            reply_private(ctx, "Failed to load cases.").await?;
            return Ok(());
        }
    };

    if cases.is_empty() {
        reply_private(ctx, no_cases_message()).await?;
        return Ok(());
    }

    let summary = summarize(&cases);
    let recent = cases
        .iter()
        .take(RECENT_PREVIEW)
        .map(case_line)
        .collect::<Vec<_>>()
        .join("\n");

    let mut embed = build_embed(
        &report_title(summary.case_count),
        format!("{} distinct reason(s)", summary.distinct_reasons),
        service.config().embed_color,
    )
    .field("Totals by Action", field_value(&action_totals(&summary)), false);

    if summary.distinct_reasons > 1 {
        embed = embed.field(
            "Top Reasons",
            field_value(&count_lines(&summary.top_reasons)),
            false,
        );
    }

    embed = embed.field("Most Recent", field_value(&recent), false);

    ctx.send(
        poise::CreateReply::default()
            .embed(embed)
            .ephemeral(true)
            .allowed_mentions(serenity::CreateAllowedMentions::new()),
    )
    .await?;

    Ok(())
}

fn report_title(case_count: usize) -> String {
    format!("Punishments Report — Last {case_count} case(s)")
}

fn action_totals(summary: &ReportSummary) -> String {
    let rows: Vec<(String, usize)> = summary
        .totals_by_action
        .iter()
        .map(|(action, count)| (action_display_name(action.as_str()), *count))
        .collect();
    count_lines(&rows)
}

#[cfg(test)]
mod tests {
    use vsa_database::model::cases::CaseAction;
    use vsa_moderation::report::ReportSummary;

    use super::{action_totals, report_title};

    #[test]
    fn totals_use_display_names() {
        let summary = ReportSummary {
            case_count: 3,
            totals_by_action: vec![(CaseAction::Tempban, 2), (CaseAction::Warn, 1)],
            top_reasons: vec![("Spamming".to_owned(), 3)],
            distinct_reasons: 1,
        };

        assert_eq!(report_title(3), "Punishments Report — Last 3 case(s)");
        assert_eq!(action_totals(&summary), "• **Temp Ban**: 2\n• **Warn**: 1");
    }
}
