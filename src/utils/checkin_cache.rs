use moka::future::Cache;
use std::time::Duration;

use crate::geo::CheckInOutcome;

/// Latest check-in outcome per employee, kept for display only.
#[derive(Clone)]
pub struct CheckInCache {
    latest: Cache<u64, CheckInOutcome>,
}

impl CheckInCache {
    pub fn new() -> Self {
        Self {
            latest: Cache::builder()
                .max_capacity(500_000)
                .time_to_live(Duration::from_secs(86400)) // 24h TTL
                .build(),
        }
    }

    pub async fn record(&self, employee_id: u64, outcome: CheckInOutcome) {
        self.latest.insert(employee_id, outcome).await;
    }

    pub async fn latest(&self, employee_id: u64) -> Option<CheckInOutcome> {
        self.latest.get(&employee_id).await
    }
}

impl Default for CheckInCache {
    fn default() -> Self {
        Self::new()
    }
}
