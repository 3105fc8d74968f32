pub mod members;
pub mod platform;

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context as _;
use tracing::info;

use vsa_moderation::{BotConfig, ChatFilter, PunishmentConfig, PunishmentService};

pub type Error = anyhow::Error;

#[derive(Clone, Debug)]
pub struct Data {
    pub punishments: Arc<PunishmentService>,
    chat_filter: Arc<RwLock<Arc<ChatFilter>>>,
    blacklist: Arc<Vec<String>>,
    config_path: Arc<PathBuf>,
}

pub type Context<'a> = poise::Context<'a, Data, Error>;

impl Data {
    /// `blacklist` is the phrase list the chat filter compiles on every (re)load.
    pub fn new(
        punishments: Arc<PunishmentService>,
        chat_filter: ChatFilter,
        blacklist: Vec<String>,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            punishments,
            chat_filter: Arc::new(RwLock::new(Arc::new(chat_filter))),
            blacklist: Arc::new(blacklist),
            config_path: Arc::new(config_path.into()),
        }
    }

    pub fn chat_filter(&self) -> Arc<ChatFilter> {
        self.chat_filter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Re-read the config file and swap the punishment and chat filter settings.
    ///
    /// Nothing changes unless the whole file resolves. The store path stays as opened.
    pub fn reload_config(&self) -> anyhow::Result<()> {
        let bot_config = BotConfig::load(self.config_path())?;
        let punishments = PunishmentConfig::from_bot_config(&bot_config)?;
        let chat_filter = ChatFilter::new(&bot_config.features.filtered_chat, &self.blacklist)
            .context("failed to compile chat filter phrases")?;

        info!(
            path = %self.config_path().display(),
            filter_enabled = chat_filter.is_enabled(),
            "config reloaded"
        );

        self.punishments.reload_config(punishments);
        *self
            .chat_filter
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(chat_filter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use vsa_database::PunishmentStore;
    use vsa_moderation::config::FilteredChatConfig;
    use vsa_moderation::platform::{ModerationPlatform, PlatformError, StaffLogEntry};
    use vsa_moderation::{ChatFilter, PunishmentConfig, PunishmentService};

    use super::Data;

    struct OfflinePlatform;

    #[async_trait]
    impl ModerationPlatform for OfflinePlatform {
        async fn timeout_member(
            &self,
            _guild_id: u64,
            _user_id: u64,
            _until: DateTime<Utc>,
            _reason: &str,
        ) -> Result<(), PlatformError> {
            Err(PlatformError::NotFound)
        }

        async fn ban_member(&self, _: u64, _: u64, _: &str) -> Result<(), PlatformError> {
            Err(PlatformError::NotFound)
        }

        async fn unban_member(&self, _: u64, _: u64, _: &str) -> Result<(), PlatformError> {
            Err(PlatformError::NotFound)
        }

        async fn is_banned(&self, _: u64, _: u64) -> Result<bool, PlatformError> {
            Ok(false)
        }

        async fn send_direct_message(&self, _: u64, _: &str) -> Result<(), PlatformError> {
            Err(PlatformError::NotFound)
        }

        async fn send_channel_message(&self, _: u64, _: &str) -> Result<(), PlatformError> {
            Err(PlatformError::NotFound)
        }

        async fn send_staff_log(&self, _: u64, _: &StaffLogEntry) -> Result<(), PlatformError> {
            Err(PlatformError::NotFound)
        }
    }

    fn data(dir: &tempfile::TempDir) -> Data {
        let store = PunishmentStore::open(dir.path().join("punishments.json")).unwrap();
        let service = PunishmentService::new(
            Arc::new(store),
            Arc::new(OfflinePlatform),
            PunishmentConfig::default(),
        );
        let filter = ChatFilter::new(&FilteredChatConfig::default(), &[]).unwrap();
        Data::new(
            Arc::new(service),
            filter,
            vec!["bad word".to_owned()],
            dir.path().join("config.json"),
        )
    }

    #[test]
    fn reload_swaps_punishment_and_filter_settings() {
        let dir = tempfile::tempdir().unwrap();
        let data = data(&dir);
        assert!(!data.punishments.is_enabled());
        assert!(!data.chat_filter().is_enabled());

        fs::write(
            data.config_path(),
            r#"{ "features": {
                "punishments": { "enable_feature": true },
                "filtered_chat": { "enable_feature": true }
            } }"#,
        )
        .unwrap();
        data.reload_config().unwrap();

        assert!(data.punishments.is_enabled());
        let filter = data.chat_filter();
        assert!(filter.is_enabled());
        assert_eq!(filter.phrase_count(), 1);
        assert!(filter.check(1, "what a bad word").is_some());
    }

    #[test]
    fn failed_reload_keeps_previous_settings() {
        let dir = tempfile::tempdir().unwrap();
        let data = data(&dir);

        fs::write(
            data.config_path(),
            r#"{ "features": { "punishments": { "enable_feature": true,
                "escalation": { "ladder": [ { "min_points": 1, "action": "kick" } ] } } } }"#,
        )
        .unwrap();

        assert!(data.reload_config().is_err());
        assert!(!data.punishments.is_enabled());
    }
}
