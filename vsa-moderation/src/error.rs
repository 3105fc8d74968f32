use thiserror::Error;

use crate::platform::PlatformError;

/// Caller-visible failures of the punishment service.
///
/// The precondition variants are rejected before any state changes. Their messages are
/// meant to be shown to the moderator as-is.
#[derive(Debug, Error)]
pub enum PunishmentError {
    #[error("Punishments feature is disabled.")]
    FeatureDisabled,

    #[error("Target is exempt from punishments.")]
    TargetExempt,

    #[error("You cannot act on a member with an equal or higher role.")]
    InsufficientHierarchy,

    #[error("A recent action was already applied to this user; please wait a moment.")]
    DuplicateActionWindow,

    /// The platform refused an action that is the whole point of the operation (manual unban).
    #[error("The platform rejected the action: {0}")]
    Platform(#[from] PlatformError),

    #[error("Failed to persist punishment records.")]
    Storage(#[source] anyhow::Error),
}

impl PunishmentError {
    /// Routine rejections that callers should not log as errors.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::FeatureDisabled
                | Self::TargetExempt
                | Self::InsufficientHierarchy
                | Self::DuplicateActionWindow
        )
    }
}

impl From<anyhow::Error> for PunishmentError {
    fn from(source: anyhow::Error) -> Self {
        Self::Storage(source)
    }
}
