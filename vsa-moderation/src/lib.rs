pub mod chat_filter;
pub mod config;
pub mod engine;
pub mod error;
pub mod platform;
pub mod report;
pub mod service;
pub mod sweeper;
pub mod templates;

#[cfg(test)]
pub(crate) mod testing;

pub use chat_filter::ChatFilter;
pub use config::{BotConfig, PunishmentConfig};
pub use error::PunishmentError;
pub use platform::{Actor, MemberProfile, ModerationPlatform, PlatformError, RoleRank, StaffLogEntry};
pub use service::{ActionPreview, ActionRequest, PunishmentService};
pub use sweeper::{MaintenanceSweeper, SweepReport};
