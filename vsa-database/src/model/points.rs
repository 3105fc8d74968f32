use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current punishment-point balance of a user. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPointsRecord {
    pub points: f64,
    pub last_updated: DateTime<Utc>,
}
