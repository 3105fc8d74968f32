use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Closed set of punishment actions a case can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseAction {
    Warn,
    Timeout,
    Tempban,
    Ban,
    Unban,
}

impl CaseAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Timeout => "timeout",
            Self::Tempban => "tempban",
            Self::Ban => "ban",
            Self::Unban => "unban",
        }
    }

    /// Actions that change whether the user is banned from the guild.
    pub fn affects_ban_state(self) -> bool {
        matches!(self, Self::Tempban | Self::Ban | Self::Unban)
    }
}

impl fmt::Display for CaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCaseAction(pub String);

impl fmt::Display for UnknownCaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown punishment action `{}`", self.0)
    }
}

impl std::error::Error for UnknownCaseAction {}

impl FromStr for CaseAction {
    type Err = UnknownCaseAction;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "timeout" => Ok(Self::Timeout),
            "tempban" => Ok(Self::Tempban),
            "ban" => Ok(Self::Ban),
            "unban" => Ok(Self::Unban),
            _ => Err(UnknownCaseAction(raw.to_owned())),
        }
    }
}

/// One audit record of a punishment or reversal. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: String,
    pub guild_id: u64,
    pub user_id: u64,
    pub moderator_id: u64,
    #[serde(default)]
    pub reason_code: Option<String>,
    #[serde(default)]
    pub reason_text: String,
    #[serde(default)]
    pub points_delta: f64,
    #[serde(default)]
    pub points_after: f64,
    pub action: CaseAction,
    #[serde(default, deserialize_with = "non_negative_seconds")]
    pub duration_seconds: u64,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub evidence_link: Option<String>,
    #[serde(default)]
    pub announced_publicly: bool,
    #[serde(default)]
    pub dm_sent: bool,
    pub created_at: DateTime<Utc>,
    /// Enforcement problems hit while applying the action on the platform.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Case this one reverses, for automated unbans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_case_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSeconds {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

/// Older stores may hold negative or fractional durations; those read as 0 or truncate
/// instead of failing the whole document.
fn non_negative_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawSeconds>::deserialize(deserializer)? {
        Some(RawSeconds::Unsigned(seconds)) => seconds,
        Some(RawSeconds::Float(seconds)) if seconds.is_finite() && seconds > 0.0 => seconds as u64,
        Some(RawSeconds::Signed(_) | RawSeconds::Float(_)) | None => 0,
    })
}

impl Case {
    /// Timestamp used for newest-first ordering.
    pub fn sort_timestamp(&self) -> DateTime<Utc> {
        self.start_at.unwrap_or(self.created_at)
    }

    pub fn is_expired_tempban(&self, now: DateTime<Utc>) -> bool {
        self.action == CaseAction::Tempban && self.end_at.is_some_and(|end_at| end_at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_actions_case_insensitively() {
        assert_eq!("TempBan".parse::<CaseAction>(), Ok(CaseAction::Tempban));
        assert_eq!(" warn ".parse::<CaseAction>(), Ok(CaseAction::Warn));
        assert!("kick".parse::<CaseAction>().is_err());
    }

    #[test]
    fn deserializes_legacy_case_without_optional_fields() {
        let raw = r#"{
            "case_id": "PK-000004",
            "guild_id": 10,
            "user_id": 20,
            "moderator_id": 30,
            "reason_code": "custom",
            "reason_text": "spam",
            "points_delta": 1.0,
            "points_after": 4.0,
            "action": "tempban",
            "duration_seconds": 3600,
            "start_at": "2024-05-01T10:00:00+00:00",
            "end_at": "2024-05-01T11:00:00+00:00",
            "evidence_link": null,
            "announced_publicly": true,
            "dm_sent": false,
            "created_at": "2024-05-01T10:00:01.123456+00:00"
        }"#;

        let case: Case = serde_json::from_str(raw).expect("legacy case parses");
        assert_eq!(case.action, CaseAction::Tempban);
        assert!(case.notes.is_empty());
        assert!(case.source_case_id.is_none());

        let later = "2024-05-01T12:00:00Z".parse().expect("valid timestamp");
        assert!(case.is_expired_tempban(later));
    }

    #[test]
    fn out_of_range_durations_read_as_zero() {
        let case_with = |duration: &str| -> Case {
            let raw = format!(
                r#"{{"case_id": "PK-000001", "guild_id": 1, "user_id": 2, "moderator_id": 3,
                    "action": "timeout", "duration_seconds": {duration},
                    "created_at": "2024-05-01T10:00:00Z"}}"#
            );
            serde_json::from_str(&raw).expect("case parses")
        };

        assert_eq!(case_with("-5").duration_seconds, 0);
        assert_eq!(case_with("null").duration_seconds, 0);
        assert_eq!(case_with("90.7").duration_seconds, 90);
        assert_eq!(case_with("600").duration_seconds, 600);
    }
}
