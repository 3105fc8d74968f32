use chrono::Utc;

use crate::database::PunishmentStore;
use crate::model::points::UserPointsRecord;

impl PunishmentStore {
    /// Current balance, `0.0` for users without a record.
    pub fn get_points(&self, user_id: u64) -> anyhow::Result<f64> {
        let document = self.lock()?;
        Ok(document
            .user_points
            .get(&user_id)
            .map_or(0.0, |record| record.points))
    }

    pub fn get_points_record(&self, user_id: u64) -> anyhow::Result<Option<UserPointsRecord>> {
        let document = self.lock()?;
        Ok(document.user_points.get(&user_id).cloned())
    }

    /// Overwrite the balance, clamped at zero.
    pub fn set_points(&self, user_id: u64, points: f64) -> anyhow::Result<f64> {
        let mut document = self.lock()?;
        let points = clamp_points(points);
        document.user_points.insert(
            user_id,
            UserPointsRecord {
                points,
                last_updated: Utc::now(),
            },
        );
        self.persist(&document)?;
        Ok(points)
    }

    /// Add `delta` to the balance (clamped at zero) and return the new value.
    pub fn incr_points(&self, user_id: u64, delta: f64) -> anyhow::Result<f64> {
        let mut document = self.lock()?;
        let current = document
            .user_points
            .get(&user_id)
            .map_or(0.0, |record| record.points);
        let points = clamp_points(current + delta);
        document.user_points.insert(
            user_id,
            UserPointsRecord {
                points,
                last_updated: Utc::now(),
            },
        );
        self.persist(&document)?;
        Ok(points)
    }
}

fn clamp_points(points: f64) -> f64 {
    if points.is_nan() { 0.0 } else { points.max(0.0) }
}
