//! The chat platform as seen by the punishment service.
//!
//! Every call is independently failable; the service decides which failures matter.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use vsa_database::model::cases::CaseAction;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("missing permissions")]
    MissingPermissions,
    #[error("not found")]
    NotFound,
    #[error("http error: {0}")]
    Http(String),
}

/// Position of a member's highest role.
///
/// Ordered like Discord's role list: by position, and on equal positions the older role
/// (lower id) ranks higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleRank {
    pub position: u16,
    pub role_id: u64,
}

impl Ord for RoleRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then_with(|| other.role_id.cmp(&self.role_id))
    }
}

impl PartialOrd for RoleRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Guild member snapshot used for exemption and hierarchy checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberProfile {
    pub user_id: u64,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role_ids: Vec<u64>,
    pub top_role: RoleRank,
}

impl MemberProfile {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

/// Who is applying a punishment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// The bot itself (chat filter, maintenance). Skips the hierarchy check.
    System { user_id: u64 },
    Member(MemberProfile),
}

impl Actor {
    pub fn user_id(&self) -> u64 {
        match self {
            Self::System { user_id } => *user_id,
            Self::Member(member) => member.user_id,
        }
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id())
    }

    pub fn avatar_url(&self) -> Option<&str> {
        match self {
            Self::System { .. } => None,
            Self::Member(member) => member.avatar_url.as_deref(),
        }
    }
}

/// Content of a staff-log post for one punishment.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffLogEntry {
    pub case_id: String,
    pub color: u32,
    pub summary: String,
    pub target_user_id: u64,
    pub target_name: String,
    pub target_avatar_url: Option<String>,
    pub moderator_mention: String,
    pub moderator_name: String,
    pub moderator_avatar_url: Option<String>,
    pub action: CaseAction,
    pub duration: String,
    pub reason: String,
    pub evidence_link: Option<String>,
    pub dm_sent: bool,
    pub announced_publicly: bool,
    pub ends_at: Option<DateTime<Utc>>,
    pub notes: Vec<String>,
}

#[async_trait]
pub trait ModerationPlatform: Send + Sync {
    async fn timeout_member(
        &self,
        guild_id: u64,
        user_id: u64,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn ban_member(&self, guild_id: u64, user_id: u64, reason: &str)
    -> Result<(), PlatformError>;

    async fn unban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn is_banned(&self, guild_id: u64, user_id: u64) -> Result<bool, PlatformError>;

    async fn send_direct_message(&self, user_id: u64, content: &str) -> Result<(), PlatformError>;

    async fn send_channel_message(&self, channel_id: u64, content: &str)
    -> Result<(), PlatformError>;

    async fn send_staff_log(
        &self,
        channel_id: u64,
        entry: &StaffLogEntry,
    ) -> Result<(), PlatformError>;
}
