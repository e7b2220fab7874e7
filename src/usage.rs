use tracing::{info, warn};

use crate::api::ApiClient;

/// Free conversations per day for accounts without a purchased quota.
pub const DAILY_FREE_QUOTA: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed { remaining: Option<i64> },
    Exhausted { total: i64 },
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allowed { .. })
    }
}

/// Daily quota check run before every send.
#[derive(Clone)]
pub struct UsageGate {
    api: ApiClient,
}

impl UsageGate {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fails open: when the quota service is unreachable the send goes ahead.
    pub async fn check(&self) -> QuotaDecision {
        match self.api.check_usage().await {
            Ok(status) if status.remaining <= 0 => {
                info!("Daily quota exhausted ({} total)", status.total);
                QuotaDecision::Exhausted { total: status.total }
            }
            Ok(status) => QuotaDecision::Allowed { remaining: Some(status.remaining) },
            Err(e) => {
                warn!("Usage check failed, allowing send: {e}");
                QuotaDecision::Allowed { remaining: None }
            }
        }
    }

    /// Counts one conversation turn. Failures are only logged.
    pub async fn record(&self) {
        if let Err(e) = self.api.increment_usage().await {
            warn!("Failed to record usage: {e}");
        }
    }
}
