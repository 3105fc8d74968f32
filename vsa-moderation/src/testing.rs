//! In-memory platform double for service and sweeper tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vsa_database::PunishmentStore;

use crate::platform::{MemberProfile, ModerationPlatform, PlatformError, RoleRank, StaffLogEntry};

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Timeout {
        guild_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
    },
    Ban {
        guild_id: u64,
        user_id: u64,
    },
    Unban {
        guild_id: u64,
        user_id: u64,
    },
    DirectMessage {
        user_id: u64,
        content: String,
    },
    ChannelMessage {
        channel_id: u64,
        content: String,
    },
    StaffLog {
        channel_id: u64,
        entry: StaffLogEntry,
    },
}

#[derive(Debug, Default)]
pub struct FakePlatform {
    calls: Mutex<Vec<PlatformCall>>,
    banned: Mutex<HashSet<(u64, u64)>>,
    failing_unbans: Mutex<HashSet<u64>>,
    deny_moderation: AtomicBool,
    fail_direct_messages: AtomicBool,
    fail_ban_lookups: AtomicBool,
}

impl FakePlatform {
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Timeouts, bans and unbans fail with missing permissions.
    pub fn deny_moderation(&self) {
        self.deny_moderation.store(true, Ordering::SeqCst);
    }

    pub fn fail_direct_messages(&self) {
        self.fail_direct_messages.store(true, Ordering::SeqCst);
    }

    pub fn fail_ban_lookups(&self) {
        self.fail_ban_lookups.store(true, Ordering::SeqCst);
    }

    pub fn fail_unban_for(&self, user_id: u64) {
        self.failing_unbans.lock().unwrap().insert(user_id);
    }

    pub fn mark_banned(&self, guild_id: u64, user_id: u64) {
        self.banned.lock().unwrap().insert((guild_id, user_id));
    }

    pub fn is_marked_banned(&self, guild_id: u64, user_id: u64) -> bool {
        self.banned.lock().unwrap().contains(&(guild_id, user_id))
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_moderation(&self) -> Result<(), PlatformError> {
        if self.deny_moderation.load(Ordering::SeqCst) {
            Err(PlatformError::MissingPermissions)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ModerationPlatform for FakePlatform {
    async fn timeout_member(
        &self,
        guild_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.check_moderation()?;
        self.record(PlatformCall::Timeout {
            guild_id,
            user_id,
            until,
        });
        Ok(())
    }

    async fn ban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.check_moderation()?;
        self.mark_banned(guild_id, user_id);
        self.record(PlatformCall::Ban { guild_id, user_id });
        Ok(())
    }

    async fn unban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.check_moderation()?;
        if self.failing_unbans.lock().unwrap().contains(&user_id) {
            return Err(PlatformError::Http("unban rejected".to_owned()));
        }
        self.banned.lock().unwrap().remove(&(guild_id, user_id));
        self.record(PlatformCall::Unban { guild_id, user_id });
        Ok(())
    }

    async fn is_banned(&self, guild_id: u64, user_id: u64) -> Result<bool, PlatformError> {
        if self.fail_ban_lookups.load(Ordering::SeqCst) {
            return Err(PlatformError::Http("ban lookup failed".to_owned()));
        }
        Ok(self.is_marked_banned(guild_id, user_id))
    }

    async fn send_direct_message(&self, user_id: u64, content: &str) -> Result<(), PlatformError> {
        if self.fail_direct_messages.load(Ordering::SeqCst) {
            return Err(PlatformError::MissingPermissions);
        }
        self.record(PlatformCall::DirectMessage {
            user_id,
            content: content.to_owned(),
        });
        Ok(())
    }

    async fn send_channel_message(
        &self,
        channel_id: u64,
        content: &str,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::ChannelMessage {
            channel_id,
            content: content.to_owned(),
        });
        Ok(())
    }

    async fn send_staff_log(
        &self,
        channel_id: u64,
        entry: &StaffLogEntry,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::StaffLog {
            channel_id,
            entry: entry.clone(),
        });
        Ok(())
    }
}

/// Member whose top role sits at `position`.
pub fn member(user_id: u64, role_ids: &[u64], position: u16) -> MemberProfile {
    MemberProfile {
        user_id,
        display_name: format!("user{user_id}"),
        avatar_url: None,
        role_ids: role_ids.to_vec(),
        top_role: RoleRank {
            position,
            role_id: u64::from(position),
        },
    }
}

pub fn open_store(dir: &tempfile::TempDir) -> Arc<PunishmentStore> {
    Arc::new(PunishmentStore::open(dir.path().join("punishments.json")).unwrap())
}
