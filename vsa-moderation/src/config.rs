//! Typed view of `config.json`.
//!
//! Only the slices the bot reads are modelled; unknown keys are ignored. Snowflake ids are
//! accepted either as JSON strings or numbers.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use vsa_database::DEFAULT_STORE_PATH;
use vsa_database::model::cases::CaseAction;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_EMBED_COLOR: u32 = 0xFF_FF_FF;

pub const DEFAULT_DM_TEMPLATE: &str =
    "You received {ACTION} for {DURATION}. Reason: {REASON}. Case: {CASE_ID}.";
pub const DEFAULT_MOD_LOG_TEMPLATE: &str =
    "[{CASE_ID}] {MODERATOR} → {TARGET}: {ACTION} {DURATION} | {REASON} | Evidence: {EVIDENCE_LINK}";
pub const DEFAULT_PUBLIC_TEMPLATE: &str =
    "**Action:** {ACTION} • **User:** {TARGET} • **Duration:** {DURATION} • **Reason:** {REASON}";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub file_paths: FilePathsConfig,
    #[serde(default)]
    pub text_channel_ids: TextChannelIds,
    #[serde(default)]
    pub features: FeaturesConfig,
}

impl BotConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config `{}`", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid config `{}`", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn punishments_db_path(&self) -> &str {
        self.file_paths
            .punishments_db
            .as_deref()
            .filter(|path| !path.trim().is_empty())
            .unwrap_or(DEFAULT_STORE_PATH)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub embed_color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilePathsConfig {
    #[serde(default)]
    pub punishments_db: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextChannelIds {
    #[serde(default, deserialize_with = "snowflake")]
    pub bot_logs: u64,
    #[serde(default, deserialize_with = "snowflake")]
    pub public_bot_usage_chat: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default)]
    pub punishments: PunishmentsSection,
    #[serde(default)]
    pub filtered_chat: FilteredChatConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PunishmentsSection {
    #[serde(default)]
    pub enable_feature: bool,
    #[serde(default, deserialize_with = "snowflake_list")]
    pub exempt_roles_id: Vec<u64>,
    #[serde(default, deserialize_with = "snowflake_list")]
    pub exempt_users_id: Vec<u64>,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub reasons: ReasonsSection,
    #[serde(default)]
    pub escalation: EscalationSection,
    #[serde(default)]
    pub messages: MessagesSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "enabled")]
    pub dm_user_on_action: bool,
    #[serde(default = "enabled")]
    pub log_in_bot_logs_channel: bool,
    #[serde(default = "enabled")]
    pub announce_publicly_in_bot_usage_channel: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            dm_user_on_action: true,
            log_in_bot_logs_channel: true,
            announce_publicly_in_bot_usage_channel: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReasonsSection {
    #[serde(default)]
    pub presets: Vec<RawReasonPreset>,
    #[serde(default = "enabled")]
    pub allow_custom_reason: bool,
    #[serde(default = "default_points")]
    pub custom_reason_default_points: f64,
}

impl Default for ReasonsSection {
    fn default() -> Self {
        Self {
            presets: Vec::new(),
            allow_custom_reason: true,
            custom_reason_default_points: default_points(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawReasonPreset {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub points: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EscalationSection {
    #[serde(default)]
    pub ladder: Vec<RawLadderRung>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLadderRung {
    #[serde(default)]
    pub min_points: f64,
    #[serde(default = "default_rung_action")]
    pub action: String,
    #[serde(default)]
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesSection {
    #[serde(default)]
    pub dm_template: Option<String>,
    #[serde(default)]
    pub mod_log_template: Option<String>,
    #[serde(default)]
    pub public_notice_template: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilteredChatConfig {
    #[serde(default)]
    pub enable_feature: bool,
    #[serde(default, deserialize_with = "snowflake_list")]
    pub omit_channels_id: Vec<u64>,
    #[serde(default)]
    pub punishments_mode: bool,
}

fn enabled() -> bool {
    true
}

fn default_points() -> f64 {
    1.0
}

fn default_rung_action() -> String {
    "warn".to_owned()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSnowflake {
    Number(u64),
    Text(String),
}

impl RawSnowflake {
    fn into_id<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            Self::Number(id) => Ok(id),
            Self::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(0);
                }
                text.parse::<u64>()
                    .map_err(|_| E::custom(format!("invalid snowflake id `{text}`")))
            }
        }
    }
}

fn snowflake<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawSnowflake>::deserialize(deserializer)? {
        Some(raw) => raw.into_id(),
        None => Ok(0),
    }
}

fn snowflake_list<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<RawSnowflake>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter().map(RawSnowflake::into_id).collect()
}

// ---------------------------------------------------------------------------
// Resolved punishment config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ReasonPreset {
    pub code: String,
    pub label: String,
    pub points: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderRung {
    pub min_points: f64,
    pub action: CaseAction,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationSettings {
    pub dm_user: bool,
    pub staff_log: bool,
    pub announce_publicly: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplates {
    pub dm: String,
    pub mod_log: String,
    pub public_notice: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            dm: DEFAULT_DM_TEMPLATE.to_owned(),
            mod_log: DEFAULT_MOD_LOG_TEMPLATE.to_owned(),
            public_notice: DEFAULT_PUBLIC_TEMPLATE.to_owned(),
        }
    }
}

/// Everything the punishment service reads, resolved once per load or reload.
#[derive(Debug, Clone, PartialEq)]
pub struct PunishmentConfig {
    pub enabled: bool,
    pub exempt_role_ids: HashSet<u64>,
    pub exempt_user_ids: HashSet<u64>,
    pub notifications: NotificationSettings,
    pub staff_log_channel_id: Option<u64>,
    pub public_channel_id: Option<u64>,
    pub presets: Vec<ReasonPreset>,
    pub allow_custom_reason: bool,
    pub custom_reason_default_points: f64,
    /// Ascending by `min_points`.
    pub ladder: Vec<LadderRung>,
    pub templates: MessageTemplates,
    pub embed_color: u32,
}

impl Default for PunishmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            exempt_role_ids: HashSet::new(),
            exempt_user_ids: HashSet::new(),
            notifications: NotificationSettings {
                dm_user: true,
                staff_log: true,
                announce_publicly: true,
            },
            staff_log_channel_id: None,
            public_channel_id: None,
            presets: Vec::new(),
            allow_custom_reason: true,
            custom_reason_default_points: default_points(),
            ladder: Vec::new(),
            templates: MessageTemplates::default(),
            embed_color: DEFAULT_EMBED_COLOR,
        }
    }
}

impl PunishmentConfig {
    pub fn from_bot_config(config: &BotConfig) -> anyhow::Result<Self> {
        let section = &config.features.punishments;

        let presets = section
            .reasons
            .presets
            .iter()
            .filter(|preset| !preset.code.trim().is_empty())
            .map(|preset| ReasonPreset {
                code: preset.code.trim().to_owned(),
                label: preset
                    .label
                    .clone()
                    .filter(|label| !label.trim().is_empty())
                    .unwrap_or_else(|| preset.code.trim().to_owned()),
                points: preset
                    .points
                    .unwrap_or(section.reasons.custom_reason_default_points),
            })
            .collect();

        let mut ladder = Vec::with_capacity(section.escalation.ladder.len());
        for rung in &section.escalation.ladder {
            let action = rung
                .action
                .parse::<CaseAction>()
                .with_context(|| format!("invalid escalation rung at {} points", rung.min_points))?;
            if action == CaseAction::Unban {
                anyhow::bail!("escalation ladder cannot contain `unban`");
            }

            ladder.push(LadderRung {
                min_points: rung.min_points,
                action,
                duration_seconds: u64::try_from(rung.duration_seconds).unwrap_or(0),
            });
        }

        if ladder
            .windows(2)
            .any(|pair| pair[0].min_points > pair[1].min_points)
        {
            warn!("escalation ladder is not sorted by min_points; lookups assume ascending order");
        }

        let messages = &section.messages;
        let templates = MessageTemplates {
            dm: messages
                .dm_template
                .clone()
                .unwrap_or_else(|| DEFAULT_DM_TEMPLATE.to_owned()),
            mod_log: messages
                .mod_log_template
                .clone()
                .unwrap_or_else(|| DEFAULT_MOD_LOG_TEMPLATE.to_owned()),
            public_notice: messages
                .public_notice_template
                .clone()
                .unwrap_or_else(|| DEFAULT_PUBLIC_TEMPLATE.to_owned()),
        };

        Ok(Self {
            enabled: section.enable_feature,
            exempt_role_ids: section.exempt_roles_id.iter().copied().collect(),
            exempt_user_ids: section.exempt_users_id.iter().copied().collect(),
            notifications: NotificationSettings {
                dm_user: section.logging.dm_user_on_action,
                staff_log: section.logging.log_in_bot_logs_channel,
                announce_publicly: section.logging.announce_publicly_in_bot_usage_channel,
            },
            staff_log_channel_id: non_zero(config.text_channel_ids.bot_logs),
            public_channel_id: non_zero(config.text_channel_ids.public_bot_usage_chat),
            presets,
            allow_custom_reason: section.reasons.allow_custom_reason,
            custom_reason_default_points: section.reasons.custom_reason_default_points,
            ladder,
            templates,
            embed_color: config
                .general
                .embed_color
                .as_deref()
                .and_then(parse_embed_color)
                .unwrap_or(DEFAULT_EMBED_COLOR),
        })
    }

    /// Load and resolve the punishments slice of the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::from_bot_config(&BotConfig::load(path)?)
    }
}

fn non_zero(id: u64) -> Option<u64> {
    (id != 0).then_some(id)
}

/// Parse `#rrggbb` (leading `#` optional) into an embed colour.
pub fn parse_embed_color(raw: &str) -> Option<u32> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.is_empty() || hex.len() > 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "general": { "embed_color": "#3498db", "bot_name": "VSA" },
        "file_paths": { "punishments_db": "data/custom.json" },
        "text_channel_ids": { "bot_logs": "111", "public_bot_usage_chat": 222 },
        "features": {
            "punishments": {
                "enable_feature": true,
                "exempt_roles_id": ["900", 901],
                "exempt_users_id": ["5"],
                "logging": { "dm_user_on_action": false },
                "reasons": {
                    "presets": [
                        { "code": "spam", "label": "Spamming", "points": 2 },
                        { "code": "harassment", "points": 3 },
                        { "code": "nsfw" }
                    ],
                    "custom_reason_default_points": 1.5
                },
                "escalation": {
                    "ladder": [
                        { "min_points": 0, "action": "warn", "duration_seconds": 0 },
                        { "min_points": 5, "action": "TIMEOUT", "duration_seconds": 600 },
                        { "min_points": 10, "action": "ban" }
                    ]
                },
                "messages": { "dm_template": "Case {CASE_ID}" }
            },
            "filtered_chat": { "enable_feature": true, "omit_channels_id": ["7"], "punishments_mode": true },
            "leveling": { "enable_feature": true }
        }
    }"##;

    #[test]
    fn resolves_full_punishment_config() {
        let bot = BotConfig::from_json(SAMPLE).unwrap();
        let config = PunishmentConfig::from_bot_config(&bot).unwrap();

        assert!(config.enabled);
        assert!(config.exempt_role_ids.contains(&900) && config.exempt_role_ids.contains(&901));
        assert!(config.exempt_user_ids.contains(&5));
        assert!(!config.notifications.dm_user);
        assert!(config.notifications.staff_log);
        assert_eq!(config.staff_log_channel_id, Some(111));
        assert_eq!(config.public_channel_id, Some(222));
        assert_eq!(config.embed_color, 0x34_98_db);
        assert_eq!(config.custom_reason_default_points, 1.5);

        assert_eq!(config.presets[0].label, "Spamming");
        assert_eq!(config.presets[1].label, "harassment");
        assert_eq!(config.presets[2].points, 1.5);

        assert_eq!(config.ladder.len(), 3);
        assert_eq!(config.ladder[1].action, CaseAction::Timeout);
        assert_eq!(config.ladder[2].duration_seconds, 0);

        assert_eq!(config.templates.dm, "Case {CASE_ID}");
        assert_eq!(config.templates.public_notice, DEFAULT_PUBLIC_TEMPLATE);

        assert_eq!(bot.punishments_db_path(), "data/custom.json");
        assert_eq!(bot.features.filtered_chat.omit_channels_id, vec![7]);
        assert!(bot.features.filtered_chat.punishments_mode);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let bot = BotConfig::from_json("{}").unwrap();
        let config = PunishmentConfig::from_bot_config(&bot).unwrap();

        assert_eq!(config, PunishmentConfig::default());
        assert_eq!(bot.punishments_db_path(), DEFAULT_STORE_PATH);
    }

    #[test]
    fn rejects_unknown_ladder_action() {
        let raw = r#"{ "features": { "punishments": { "escalation": {
            "ladder": [ { "min_points": 3, "action": "kick" } ]
        } } } }"#;
        let bot = BotConfig::from_json(raw).unwrap();
        assert!(PunishmentConfig::from_bot_config(&bot).is_err());
    }

    #[test]
    fn rejects_malformed_snowflakes() {
        let raw = r#"{ "text_channel_ids": { "bot_logs": "not-a-number" } }"#;
        assert!(BotConfig::from_json(raw).is_err());
    }

    #[test]
    fn parses_embed_colors() {
        assert_eq!(parse_embed_color("#ffffff"), Some(0xFF_FF_FF));
        assert_eq!(parse_embed_color("905530"), Some(0x90_55_30));
        assert_eq!(parse_embed_color("#zzzzzz"), None);
        assert_eq!(parse_embed_color(""), None);
    }
}
