//! Pure escalation logic: reason/points resolution and ladder lookup.

use vsa_database::model::cases::CaseAction;

use crate::config::{LadderRung, ReasonPreset};

pub const UNSPECIFIED_REASON: &str = "Unspecified";

/// Resolve the reason text and point delta for an action.
///
/// A preset whose code matches `reason_code` (case-insensitive) wins. Otherwise a non-empty
/// custom reason is used when allowed, and everything else falls back to `"Unspecified"`.
/// Both fallbacks carry `default_points`.
pub fn resolve_reason(
    reason_code: Option<&str>,
    custom_reason: Option<&str>,
    presets: &[ReasonPreset],
    allow_custom: bool,
    default_points: f64,
) -> (String, f64) {
    if let Some(code) = reason_code.map(str::trim).filter(|code| !code.is_empty()) {
        if let Some(preset) = presets
            .iter()
            .find(|preset| preset.code.eq_ignore_ascii_case(code))
        {
            return (preset.label.clone(), preset.points);
        }
    }

    if allow_custom {
        if let Some(custom) = custom_reason.map(str::trim).filter(|text| !text.is_empty()) {
            return (custom.to_owned(), default_points);
        }
    }

    (UNSPECIFIED_REASON.to_owned(), default_points)
}

/// Pick the highest rung whose `min_points` is at or below `resulting_points`.
///
/// `ladder` must be sorted ascending; the walk stops at the first rung above the
/// points. No qualifying rung means a plain warning.
pub fn pick_next_action(resulting_points: f64, ladder: &[LadderRung]) -> (CaseAction, u64) {
    let mut chosen = (CaseAction::Warn, 0);

    for rung in ladder {
        if resulting_points >= rung.min_points {
            chosen = (rung.action, rung.duration_seconds);
        } else {
            break;
        }
    }

    chosen
}

/// Apply a delta to a balance with the zero floor the store enforces.
pub fn resulting_points(current: f64, delta: f64) -> f64 {
    (current + delta).max(0.0)
}
