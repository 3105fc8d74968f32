//! Periodic reconciliation of expired tempbans.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use vsa_database::model::cases::Case;

use crate::service::{AUTO_UNBAN_REASON_CODE, PunishmentService};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

const AUTO_UNBAN_REASON: &str = "Tempban expired";

/// Outcome counts of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub unbanned: usize,
    /// Ban was already gone on the platform; only the audit case was written.
    pub already_lifted: usize,
    /// A newer ban-state case exists, so the tempban no longer governs.
    pub superseded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct MaintenanceSweeper {
    service: Arc<PunishmentService>,
    system_user_id: u64,
}

impl MaintenanceSweeper {
    /// `system_user_id` is recorded as the moderator of auto-unban cases.
    pub fn new(service: Arc<PunishmentService>, system_user_id: u64) -> Self {
        Self {
            service,
            system_user_id,
        }
    }

    /// Run a sweep every `period` until the process exits. The first tick fires immediately.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let report = self.run_once(Utc::now()).await;
                if report.expired > 0 {
                    info!(?report, "maintenance sweep finished");
                } else {
                    debug!("maintenance sweep found nothing to do");
                }
            }
        })
    }

    /// Reverse every tempban that expired at or before `now`. Never fails; problems are logged.
    /// Does nothing while the feature is disabled.
    pub async fn run_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        if !self.service.is_enabled() {
            return report;
        }

        let expired = match self.service.store().list_expired_tempbans(now) {
            Ok(expired) => expired,
            Err(source) => {
                error!(?source, "maintenance sweep could not read expired tempbans");
                return report;
            }
        };
        report.expired = expired.len();

        for case in &expired {
            match self.reconcile(case).await {
                Ok(Outcome::Unbanned) => report.unbanned += 1,
                Ok(Outcome::AlreadyLifted) => report.already_lifted += 1,
                Ok(Outcome::Superseded) => report.superseded += 1,
                Err(source) => {
                    report.failed += 1;
                    warn!(
                        ?source,
                        case_id = %case.case_id,
                        user_id = case.user_id,
                        guild_id = case.guild_id,
                        "failed to reconcile expired tempban"
                    );
                }
            }
        }

        report
    }

    async fn reconcile(&self, case: &Case) -> anyhow::Result<Outcome> {
        let store = self.service.store();

        let latest = store.latest_ban_state_case(case.guild_id, case.user_id)?;
        if latest.is_some_and(|latest| latest.case_id != case.case_id) {
            return Ok(Outcome::Superseded);
        }

        let still_banned = self
            .service
            .platform
            .is_banned(case.guild_id, case.user_id)
            .await?;

        let outcome = if still_banned {
            let audit_reason = format!("{AUTO_UNBAN_REASON} | Case {}", case.case_id);
            self.service
                .platform
                .unban_member(case.guild_id, case.user_id, &audit_reason)
                .await?;
            Outcome::Unbanned
        } else {
            Outcome::AlreadyLifted
        };

        let unban_case_id = self.service.record_unban_case(
            case.guild_id,
            case.user_id,
            self.system_user_id,
            AUTO_UNBAN_REASON_CODE,
            AUTO_UNBAN_REASON,
            Some(case.case_id.clone()),
        )?;

        let config = self.service.config();
        self.service
            .post_staff_line(&config, &staff_line(&unban_case_id, case, &outcome))
            .await;

        info!(
            case_id = %unban_case_id,
            source_case_id = %case.case_id,
            user_id = case.user_id,
            guild_id = case.guild_id,
            "tempban expired"
        );

        Ok(outcome)
    }
}

enum Outcome {
    Unbanned,
    AlreadyLifted,
    Superseded,
}

fn staff_line(unban_case_id: &str, tempban: &Case, outcome: &Outcome) -> String {
    match outcome {
        Outcome::AlreadyLifted => format!(
            "[{unban_case_id}] Tempban {} for <@{}> expired; ban was already lifted",
            tempban.case_id, tempban.user_id
        ),
        _ => format!(
            "[{unban_case_id}] Auto-unbanned <@{}> (tempban {} expired)",
            tempban.user_id, tempban.case_id
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use vsa_database::model::cases::{Case, CaseAction};

    use super::*;
    use crate::config::PunishmentConfig;
    use crate::testing::{FakePlatform, PlatformCall, open_store};

    const GUILD: u64 = 500;
    const BOT: u64 = 1;

    const STAFF_LOG: u64 = 900;

    fn service(dir: &tempfile::TempDir, platform: Arc<FakePlatform>) -> Arc<PunishmentService> {
        let config = PunishmentConfig {
            enabled: true,
            staff_log_channel_id: Some(STAFF_LOG),
            ..PunishmentConfig::default()
        };
        Arc::new(PunishmentService::new(open_store(dir), platform, config))
    }

    fn ban_case(
        service: &PunishmentService,
        user_id: u64,
        action: CaseAction,
        ends_in: Option<Duration>,
    ) -> String {
        let store = service.store();
        let case_id = store.next_case_id("PK").unwrap();
        let now = Utc::now();
        store
            .add_case(Case {
                case_id: case_id.clone(),
                guild_id: GUILD,
                user_id,
                moderator_id: 10,
                reason_code: None,
                reason_text: "raid".to_owned(),
                points_delta: 5.0,
                points_after: 5.0,
                action,
                duration_seconds: 3_600,
                start_at: Some(now),
                end_at: ends_in.map(|delta| now + delta),
                evidence_link: None,
                announced_publicly: false,
                dm_sent: false,
                created_at: now,
                notes: Vec::new(),
                source_case_id: None,
            })
            .unwrap();
        case_id
    }

    #[tokio::test]
    async fn expired_tempban_is_lifted_once() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(FakePlatform::default());
        platform.mark_banned(GUILD, 42);
        let service = service(&dir, platform.clone());
        let tempban = ban_case(&service, 42, CaseAction::Tempban, Some(Duration::hours(-1)));
        let sweeper = MaintenanceSweeper::new(service.clone(), BOT);

        let first = sweeper.run_once(Utc::now()).await;
        assert_eq!(first.unbanned, 1);
        assert!(!platform.is_marked_banned(GUILD, 42));

        let unban = service
            .store()
            .latest_ban_state_case(GUILD, 42)
            .unwrap()
            .unwrap();
        assert_eq!(unban.action, CaseAction::Unban);
        assert_eq!(unban.points_delta, 0.0);
        assert_eq!(unban.moderator_id, BOT);
        assert_eq!(unban.reason_code.as_deref(), Some("auto_unban"));
        assert_eq!(unban.source_case_id.as_deref(), Some(tempban.as_str()));

        let lines = staff_lines(&platform);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(&format!("[{}] Auto-unbanned <@42>", unban.case_id)));

        let cases_after_first = service.store().case_count().unwrap();
        let second = sweeper.run_once(Utc::now()).await;
        assert_eq!(second.unbanned, 0);
        assert_eq!(second.superseded, 1);
        assert_eq!(service.store().case_count().unwrap(), cases_after_first);
    }

    fn staff_lines(platform: &FakePlatform) -> Vec<String> {
        platform
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::ChannelMessage {
                    channel_id: STAFF_LOG,
                    content,
                } => Some(content),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn pending_tempbans_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(FakePlatform::default());
        platform.mark_banned(GUILD, 42);
        let service = service(&dir, platform.clone());
        ban_case(&service, 42, CaseAction::Tempban, Some(Duration::hours(1)));

        let report = MaintenanceSweeper::new(service, BOT)
            .run_once(Utc::now())
            .await;
        assert_eq!(report, SweepReport::default());
        assert!(platform.is_marked_banned(GUILD, 42));
    }

    #[tokio::test]
    async fn later_permanent_ban_is_not_lifted() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(FakePlatform::default());
        platform.mark_banned(GUILD, 42);
        let service = service(&dir, platform.clone());
        ban_case(&service, 42, CaseAction::Tempban, Some(Duration::hours(-1)));
        ban_case(&service, 42, CaseAction::Ban, None);

        let report = MaintenanceSweeper::new(service.clone(), BOT)
            .run_once(Utc::now())
            .await;
        assert_eq!(report.superseded, 1);
        assert!(platform.is_marked_banned(GUILD, 42));
        assert_eq!(service.store().case_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn ban_lifted_elsewhere_is_only_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(FakePlatform::default());
        let service = service(&dir, platform.clone());
        ban_case(&service, 42, CaseAction::Tempban, Some(Duration::hours(-1)));

        let report = MaintenanceSweeper::new(service.clone(), BOT)
            .run_once(Utc::now())
            .await;
        assert_eq!(report.already_lifted, 1);
        assert!(
            !platform
                .calls()
                .iter()
                .any(|call| matches!(call, PlatformCall::Unban { .. }))
        );
        assert_eq!(service.store().case_count().unwrap(), 2);

        let lines = staff_lines(&platform);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("expired; ban was already lifted"));
        assert!(!lines[0].contains("Auto-unbanned"));
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(FakePlatform::default());
        platform.mark_banned(GUILD, 42);
        platform.mark_banned(GUILD, 43);
        platform.fail_unban_for(42);
        let service = service(&dir, platform.clone());
        ban_case(&service, 42, CaseAction::Tempban, Some(Duration::hours(-2)));
        ban_case(&service, 43, CaseAction::Tempban, Some(Duration::hours(-1)));

        let report = MaintenanceSweeper::new(service.clone(), BOT)
            .run_once(Utc::now())
            .await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.unbanned, 1);
        assert!(platform.is_marked_banned(GUILD, 42));
        assert!(!platform.is_marked_banned(GUILD, 43));
        assert_eq!(service.store().case_count().unwrap(), 3);
    }

    #[tokio::test]
    async fn disabled_feature_skips_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(FakePlatform::default());
        platform.mark_banned(GUILD, 42);
        let service = service(&dir, platform.clone());
        ban_case(&service, 42, CaseAction::Tempban, Some(Duration::hours(-1)));
        service.reload_config(PunishmentConfig::default());

        let report = MaintenanceSweeper::new(service, BOT)
            .run_once(Utc::now())
            .await;
        assert_eq!(report, SweepReport::default());
        assert!(platform.is_marked_banned(GUILD, 42));
    }

    #[tokio::test]
    async fn unavailable_ban_lookup_retries_next_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(FakePlatform::default());
        platform.mark_banned(GUILD, 42);
        platform.fail_ban_lookups();
        let service = service(&dir, platform.clone());
        ban_case(&service, 42, CaseAction::Tempban, Some(Duration::hours(-1)));

        let report = MaintenanceSweeper::new(service.clone(), BOT)
            .run_once(Utc::now())
            .await;
        assert_eq!(report.failed, 1);
        assert_eq!(service.store().case_count().unwrap(), 1);
    }
}
