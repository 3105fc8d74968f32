use std::collections::HashMap;

use vsa_database::model::cases::{Case, CaseAction};

pub const MAX_TOP_REASONS: usize = 10;

/// Totals over a window of recent guild cases.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub case_count: usize,
    /// Most frequent first, ties by action name.
    pub totals_by_action: Vec<(CaseAction, usize)>,
    /// Most frequent first, ties by reason text, at most [`MAX_TOP_REASONS`].
    pub top_reasons: Vec<(String, usize)>,
    pub distinct_reasons: usize,
}

pub fn summarize(cases: &[Case]) -> ReportSummary {
    let mut by_action: HashMap<CaseAction, usize> = HashMap::new();
    let mut by_reason: HashMap<&str, usize> = HashMap::new();

    for case in cases {
        *by_action.entry(case.action).or_default() += 1;
        let reason = if case.reason_text.trim().is_empty() {
            crate::engine::UNSPECIFIED_REASON
        } else {
            case.reason_text.as_str()
        };
        *by_reason.entry(reason).or_default() += 1;
    }

    let mut totals_by_action: Vec<(CaseAction, usize)> = by_action.into_iter().collect();
    totals_by_action.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

    let distinct_reasons = by_reason.len();
    let mut top_reasons: Vec<(String, usize)> = by_reason
        .into_iter()
        .map(|(reason, count)| (reason.to_owned(), count))
        .collect();
    top_reasons.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_reasons.truncate(MAX_TOP_REASONS);

    ReportSummary {
        case_count: cases.len(),
        totals_by_action,
        top_reasons,
        distinct_reasons,
    }
}
