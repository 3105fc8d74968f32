use chrono::{DateTime, Utc};

use crate::database::PunishmentStore;
use crate::model::cases::Case;

/// Upper bound for a single guild listing page.
pub const MAX_GUILD_PAGE: usize = 100;

impl PunishmentStore {
    /// Allocate the next case id (`PK-000001`, ...) and persist the bumped counter.
    pub fn next_case_id(&self, prefix: &str) -> anyhow::Result<String> {
        let mut document = self.lock()?;
        let seq = document.meta.next_case_seq.max(1);
        document.meta.next_case_seq = seq + 1;
        self.persist(&document)?;
        Ok(format!("{prefix}-{seq:06}"))
    }

    /// Insert a case and put its id at the front of the user's index.
    pub fn add_case(&self, case: Case) -> anyhow::Result<()> {
        let mut document = self.lock()?;
        let case_id = case.case_id.clone();
        let user_id = case.user_id;

        document.cases_by_id.insert(case_id.clone(), case);
        document
            .cases_by_user
            .entry(user_id)
            .or_default()
            .insert(0, case_id);

        self.persist(&document)
    }

    pub fn get_case(&self, case_id: &str) -> anyhow::Result<Option<Case>> {
        let document = self.lock()?;
        Ok(document.cases_by_id.get(case_id).cloned())
    }

    /// Cases of one user, newest first.
    pub fn list_cases(&self, user_id: u64, limit: usize, offset: usize) -> anyhow::Result<Vec<Case>> {
        let document = self.lock()?;
        let Some(ids) = document.cases_by_user.get(&user_id) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|case_id| document.cases_by_id.get(case_id).cloned())
            .collect())
    }

    /// Cases of one guild ordered by `start_at` (or `created_at`) descending.
    pub fn list_recent_cases_for_guild(
        &self,
        guild_id: u64,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<Vec<Case>> {
        let document = self.lock()?;
        let mut cases: Vec<&Case> = document
            .cases_by_id
            .values()
            .filter(|case| case.guild_id == guild_id)
            .collect();
        cases.sort_by(|a, b| {
            b.sort_timestamp()
                .cmp(&a.sort_timestamp())
                .then_with(|| b.case_id.cmp(&a.case_id))
        });

        Ok(cases
            .into_iter()
            .skip(offset)
            .take(limit.clamp(1, MAX_GUILD_PAGE))
            .cloned()
            .collect())
    }

    /// Tempbans whose `end_at` is at or before `now`, across all guilds.
    pub fn list_expired_tempbans(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Case>> {
        let document = self.lock()?;
        let mut expired: Vec<Case> = document
            .cases_by_id
            .values()
            .filter(|case| case.is_expired_tempban(now))
            .cloned()
            .collect();
        expired.sort_by(|a, b| a.case_id.cmp(&b.case_id));
        Ok(expired)
    }

    /// Newest case of `user_id` in `guild_id` that changed the ban state.
    pub fn latest_ban_state_case(&self, guild_id: u64, user_id: u64) -> anyhow::Result<Option<Case>> {
        let document = self.lock()?;
        let Some(ids) = document.cases_by_user.get(&user_id) else {
            return Ok(None);
        };

        Ok(ids
            .iter()
            .filter_map(|case_id| document.cases_by_id.get(case_id))
            .find(|case| case.guild_id == guild_id && case.action.affects_ban_state())
            .cloned())
    }

    pub fn case_count(&self) -> anyhow::Result<usize> {
        Ok(self.lock()?.cases_by_id.len())
    }
}
