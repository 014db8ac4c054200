use chrono::{Local, NaiveDate};
use tokio::sync::Mutex;

/// Upstream call counter reset at local midnight. Updated under a mutex;
/// there is no background ticker needed since the reset is computed lazily
/// from the current date on each check.
pub struct DailyQuota {
    limit: u64,
    state: Mutex<QuotaState>,
}

struct QuotaState {
    day: NaiveDate,
    used: u64,
}

impl DailyQuota {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            state: Mutex::new(QuotaState {
                day: Local::now().date_naive(),
                used: 0,
            }),
        }
    }

    /// Attempts to consume one unit of quota. Returns `true` if allowed.
    pub async fn try_consume(&self) -> bool {
        let today = Local::now().date_naive();
        let mut state = self.state.lock().await;
        if state.day != today {
            state.day = today;
            state.used = 0;
        }
        if state.used >= self.limit {
            return false;
        }
        state.used += 1;
        true
    }
}
