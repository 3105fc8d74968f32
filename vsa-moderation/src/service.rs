//! Punishment orchestration.
//!
//! [`PunishmentService::apply_action`] is the single entry point for punishments, shared by
//! moderator commands and automated callers such as the chat filter. Preconditions are
//! checked before anything changes. Past that point every platform or notification failure
//! is recorded on the case instead of aborting, and the case write is the final step.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use vsa_database::PunishmentStore;
use vsa_database::model::cases::{Case, CaseAction};

use crate::config::PunishmentConfig;
use crate::engine::{pick_next_action, resolve_reason, resulting_points};
use crate::error::PunishmentError;
use crate::platform::{Actor, MemberProfile, ModerationPlatform, PlatformError, StaffLogEntry};
use crate::templates::{human_duration, render_template};

pub const CASE_PREFIX: &str = "PK";

/// Repeated actions against one target inside this window are rejected.
pub const IDEMPOTENCY_WINDOW: Duration = Duration::from_secs(5);

/// Timeouts resolved without a duration are applied for this long.
pub const MIN_TIMEOUT_SECONDS: u64 = 60;

pub const MANUAL_UNBAN_REASON_CODE: &str = "unban";
pub const AUTO_UNBAN_REASON_CODE: &str = "auto_unban";
const CUSTOM_REASON_CODE: &str = "custom";

/// Input of [`PunishmentService::apply_action`].
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub guild_id: u64,
    pub moderator: Actor,
    pub target: MemberProfile,
    pub reason_code: Option<String>,
    pub custom_reason: Option<String>,
    pub evidence_link: Option<String>,
    /// Replaces the point delta resolved from the reason.
    pub points_override: Option<f64>,
    /// Bypasses the ladder, e.g. for an explicit `ban` command.
    pub force_action: Option<CaseAction>,
    pub force_duration: Option<u64>,
}

impl ActionRequest {
    pub fn new(guild_id: u64, moderator: Actor, target: MemberProfile) -> Self {
        Self {
            guild_id,
            moderator,
            target,
            reason_code: None,
            custom_reason: None,
            evidence_link: None,
            points_override: None,
            force_action: None,
            force_duration: None,
        }
    }
}

/// What the ladder would do for a user right now, without applying anything.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPreview {
    pub current_points: f64,
    pub points_delta: f64,
    pub resulting_points: f64,
    pub action: CaseAction,
    pub duration_seconds: u64,
    pub reason_text: String,
}

pub struct PunishmentService {
    pub(crate) store: Arc<PunishmentStore>,
    pub(crate) platform: Arc<dyn ModerationPlatform>,
    config: RwLock<Arc<PunishmentConfig>>,
    recent_targets: Mutex<HashMap<u64, Instant>>,
    idempotency_window: Duration,
}

impl fmt::Debug for PunishmentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PunishmentService")
            .field("store", &self.store.path())
            .field("idempotency_window", &self.idempotency_window)
            .finish_non_exhaustive()
    }
}

impl PunishmentService {
    pub fn new(
        store: Arc<PunishmentStore>,
        platform: Arc<dyn ModerationPlatform>,
        config: PunishmentConfig,
    ) -> Self {
        Self {
            store,
            platform,
            config: RwLock::new(Arc::new(config)),
            recent_targets: Mutex::new(HashMap::new()),
            idempotency_window: IDEMPOTENCY_WINDOW,
        }
    }

    pub fn with_idempotency_window(mut self, window: Duration) -> Self {
        self.idempotency_window = window;
        self
    }

    pub fn store(&self) -> &PunishmentStore {
        &self.store
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> Arc<PunishmentConfig> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the active configuration wholesale.
    pub fn reload_config(&self, config: PunishmentConfig) {
        let mut active = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *active = Arc::new(config);
        info!(enabled = active.enabled, rungs = active.ladder.len(), "punishment config reloaded");
    }

    pub fn is_enabled(&self) -> bool {
        self.config().enabled
    }

    pub fn get_points(&self, user_id: u64) -> Result<f64, PunishmentError> {
        Ok(self.store.get_points(user_id)?)
    }

    pub fn preview_next_action(
        &self,
        user_id: u64,
        reason_code: Option<&str>,
        custom_reason: Option<&str>,
        points_override: Option<f64>,
    ) -> Result<ActionPreview, PunishmentError> {
        let config = self.config();
        let (reason_text, resolved_delta) = resolve_reason(
            reason_code,
            custom_reason,
            &config.presets,
            config.allow_custom_reason,
            config.custom_reason_default_points,
        );
        let points_delta = points_override.unwrap_or(resolved_delta);
        let current_points = self.store.get_points(user_id)?;
        let resulting = resulting_points(current_points, points_delta);
        let (action, duration_seconds) = pick_next_action(resulting, &config.ladder);

        Ok(ActionPreview {
            current_points,
            points_delta,
            resulting_points: resulting,
            action,
            duration_seconds,
            reason_text,
        })
    }

    /// Apply one punishment end to end and return the new case id.
    pub async fn apply_action(&self, request: ActionRequest) -> Result<String, PunishmentError> {
        let config = self.config();
        let target = &request.target;

        if !config.enabled {
            return Err(PunishmentError::FeatureDisabled);
        }

        if is_exempt(&config, target) {
            return Err(PunishmentError::TargetExempt);
        }

        if let Actor::Member(moderator) = &request.moderator {
            if moderator.top_role <= target.top_role {
                return Err(PunishmentError::InsufficientHierarchy);
            }
        }

        self.claim_target(target.user_id)?;

        let (reason_text, resolved_delta) = resolve_reason(
            request.reason_code.as_deref(),
            request.custom_reason.as_deref(),
            &config.presets,
            config.allow_custom_reason,
            config.custom_reason_default_points,
        );
        let points_delta = request.points_override.unwrap_or(resolved_delta);

        let current_points = self.store.get_points(target.user_id)?;
        let points_after = resulting_points(current_points, points_delta);
        let (ladder_action, ladder_duration) = pick_next_action(points_after, &config.ladder);

        let mut action = request.force_action.unwrap_or(ladder_action);
        let mut duration_seconds = request.force_duration.unwrap_or(ladder_duration);

        if action == CaseAction::Unban {
            debug!("unban is not a punishment; recording as a warning");
            action = CaseAction::Warn;
        }
        if action == CaseAction::Timeout && duration_seconds == 0 {
            duration_seconds = MIN_TIMEOUT_SECONDS;
        }

        let case_id = self.store.next_case_id(CASE_PREFIX)?;
        let started = Utc::now();
        let ends = end_time(started, duration_seconds);

        let audit_reason = format!("{reason_text} | Case {case_id}");
        let notes = self
            .enforce(
                request.guild_id,
                target.user_id,
                action,
                ends,
                &audit_reason,
                &case_id,
            )
            .await;

        let duration_label = human_duration(duration_seconds);
        let action_label = action.as_str().to_ascii_uppercase();
        let target_mention = target.mention();
        let moderator_mention = request.moderator.mention();
        let evidence = request.evidence_link.as_deref().unwrap_or("N/A");
        let values = [
            ("ACTION", action_label.as_str()),
            ("DURATION", duration_label.as_str()),
            ("REASON", reason_text.as_str()),
            ("CASE_ID", case_id.as_str()),
            ("TARGET", target_mention.as_str()),
            ("MODERATOR", moderator_mention.as_str()),
            ("EVIDENCE_LINK", evidence),
        ];

        let dm_sent = if config.notifications.dm_user {
            let content = render_template(&config.templates.dm, &values);
            match self.platform.send_direct_message(target.user_id, &content).await {
                Ok(()) => true,
                Err(source) => {
                    debug!(?source, user_id = target.user_id, %case_id, "punishment DM not delivered");
                    false
                }
            }
        } else {
            false
        };

        let announced_publicly = match config.public_channel_id {
            Some(channel_id) if config.notifications.announce_publicly => {
                let content = render_template(&config.templates.public_notice, &values);
                match self.platform.send_channel_message(channel_id, &content).await {
                    Ok(()) => true,
                    Err(source) => {
                        warn!(?source, %case_id, "failed to post public punishment notice");
                        false
                    }
                }
            }
            _ => false,
        };

        if let Some(channel_id) = config
            .staff_log_channel_id
            .filter(|_| config.notifications.staff_log)
        {
            let entry = StaffLogEntry {
                case_id: case_id.clone(),
                color: config.embed_color,
                summary: render_template(&config.templates.mod_log, &values),
                target_user_id: target.user_id,
                target_name: target.display_name.clone(),
                target_avatar_url: target.avatar_url.clone(),
                moderator_mention: moderator_mention.clone(),
                moderator_name: match &request.moderator {
                    Actor::System { .. } => "System".to_owned(),
                    Actor::Member(member) => member.display_name.clone(),
                },
                moderator_avatar_url: request.moderator.avatar_url().map(str::to_owned),
                action,
                duration: duration_label.clone(),
                reason: reason_text.clone(),
                evidence_link: request.evidence_link.clone(),
                dm_sent,
                announced_publicly,
                ends_at: ends,
                notes: notes.clone(),
            };

            if let Err(source) = self.platform.send_staff_log(channel_id, &entry).await {
                warn!(?source, %case_id, "failed to post punishment to staff log");
            }
        }

        self.store.set_points(target.user_id, points_after)?;
        self.store.add_case(Case {
            case_id: case_id.clone(),
            guild_id: request.guild_id,
            user_id: target.user_id,
            moderator_id: request.moderator.user_id(),
            reason_code: Some(
                request
                    .reason_code
                    .clone()
                    .filter(|code| !code.trim().is_empty())
                    .unwrap_or_else(|| CUSTOM_REASON_CODE.to_owned()),
            ),
            reason_text,
            points_delta,
            points_after,
            action,
            duration_seconds,
            start_at: Some(started),
            end_at: ends,
            evidence_link: request.evidence_link.clone(),
            announced_publicly,
            dm_sent,
            created_at: Utc::now(),
            notes,
            source_case_id: None,
        })?;

        info!(
            %case_id,
            guild_id = request.guild_id,
            user_id = target.user_id,
            moderator_id = request.moderator.user_id(),
            action = %action,
            duration_seconds,
            points_after,
            "punishment applied"
        );

        Ok(case_id)
    }

    /// Lift a ban by hand and record a zero-delta `unban` case.
    pub async fn unban(
        &self,
        guild_id: u64,
        moderator_id: u64,
        user_id: u64,
        reason: Option<&str>,
    ) -> Result<String, PunishmentError> {
        let config = self.config();
        if !config.enabled {
            return Err(PunishmentError::FeatureDisabled);
        }

        let reason = reason
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .unwrap_or("Manual unban");

        self.platform.unban_member(guild_id, user_id, reason).await?;

        let case_id = self.record_unban_case(
            guild_id,
            user_id,
            moderator_id,
            MANUAL_UNBAN_REASON_CODE,
            reason,
            None,
        )?;

        self.post_staff_line(
            &config,
            &format!("[{case_id}] <@{moderator_id}> unbanned <@{user_id}>"),
        )
        .await;

        info!(%case_id, guild_id, user_id, moderator_id, "manual unban recorded");
        Ok(case_id)
    }

    pub(crate) fn record_unban_case(
        &self,
        guild_id: u64,
        user_id: u64,
        moderator_id: u64,
        reason_code: &str,
        reason_text: &str,
        source_case_id: Option<String>,
    ) -> anyhow::Result<String> {
        let case_id = self.store.next_case_id(CASE_PREFIX)?;
        let now = Utc::now();

        self.store.add_case(Case {
            case_id: case_id.clone(),
            guild_id,
            user_id,
            moderator_id,
            reason_code: Some(reason_code.to_owned()),
            reason_text: reason_text.to_owned(),
            points_delta: 0.0,
            points_after: self.store.get_points(user_id)?,
            action: CaseAction::Unban,
            duration_seconds: 0,
            start_at: Some(now),
            end_at: None,
            evidence_link: None,
            announced_publicly: false,
            dm_sent: false,
            created_at: now,
            notes: Vec::new(),
            source_case_id,
        })?;

        Ok(case_id)
    }

    /// Best-effort plain-text line in the staff log channel.
    pub(crate) async fn post_staff_line(&self, config: &PunishmentConfig, content: &str) {
        let Some(channel_id) = config
            .staff_log_channel_id
            .filter(|_| config.notifications.staff_log)
        else {
            return;
        };

        if let Err(source) = self.platform.send_channel_message(channel_id, content).await {
            warn!(?source, "failed to post to staff log");
        }
    }

    fn claim_target(&self, user_id: u64) -> Result<(), PunishmentError> {
        let now = Instant::now();
        let mut recent = self
            .recent_targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(last) = recent.get(&user_id) {
            if now.duration_since(*last) < self.idempotency_window {
                debug!(user_id, "rejected action inside idempotency window");
                return Err(PunishmentError::DuplicateActionWindow);
            }
        }

        recent.retain(|_, at| now.duration_since(*at) < self.idempotency_window);
        recent.insert(user_id, now);
        Ok(())
    }

    /// Run the platform side of `action`. Failures come back as case notes.
    async fn enforce(
        &self,
        guild_id: u64,
        user_id: u64,
        action: CaseAction,
        ends: Option<DateTime<Utc>>,
        audit_reason: &str,
        case_id: &str,
    ) -> Vec<String> {
        let result = match action {
            CaseAction::Warn | CaseAction::Unban => Ok(()),
            CaseAction::Timeout => match ends {
                Some(until) => {
                    self.platform
                        .timeout_member(guild_id, user_id, until, audit_reason)
                        .await
                }
                None => Err(PlatformError::Http("timeout end is out of range".to_owned())),
            },
            CaseAction::Tempban | CaseAction::Ban => {
                self.platform.ban_member(guild_id, user_id, audit_reason).await
            }
        };

        match result {
            Ok(()) => Vec::new(),
            Err(PlatformError::MissingPermissions) => {
                warn!(user_id, case_id, action = %action, "missing permissions to enforce punishment");
                vec!["Action failed: missing permissions.".to_owned()]
            }
            Err(source) => {
                error!(?source, user_id, case_id, action = %action, "failed to enforce punishment");
                vec![format!("Error while applying action: {source}")]
            }
        }
    }
}

fn is_exempt(config: &PunishmentConfig, target: &MemberProfile) -> bool {
    config.exempt_user_ids.contains(&target.user_id)
        || target
            .role_ids
            .iter()
            .any(|role_id| config.exempt_role_ids.contains(role_id))
}

fn end_time(start: DateTime<Utc>, duration_seconds: u64) -> Option<DateTime<Utc>> {
    if duration_seconds == 0 {
        return None;
    }
    let seconds = i64::try_from(duration_seconds).ok()?;
    start.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}
