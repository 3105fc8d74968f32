use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::cases::Case;
use crate::model::points::UserPointsRecord;

/// On-disk shape of the punishment store. User ids are written as JSON object keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub cases_by_id: HashMap<String, Case>,
    /// Case ids per user, newest first.
    #[serde(default)]
    pub cases_by_user: HashMap<u64, Vec<String>>,
    #[serde(default)]
    pub user_points: HashMap<u64, UserPointsRecord>,
    #[serde(default)]
    pub meta: StoreMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    #[serde(default = "first_case_seq")]
    pub next_case_seq: u64,
}

impl Default for StoreMeta {
    fn default() -> Self {
        Self {
            next_case_seq: first_case_seq(),
        }
    }
}

fn first_case_seq() -> u64 {
    1
}
