use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::token::{PaymentType, MAX_TTL_SECS, TOKEN_TTL_SECS};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_NOTICE_CAPACITY: usize = 64;
pub const DEFAULT_MERCHANT: &str = "University Marketplace";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Countdown length, one tick per second
    pub ttl_secs: u64,
    pub poll_interval_secs: u64,
    pub payment_type: PaymentType,
    /// Buffer of the global terminal-notice channel
    pub notice_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: TOKEN_TTL_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            payment_type: PaymentType::Purchase,
            notice_capacity: DEFAULT_NOTICE_CAPACITY,
        }
    }
}

impl SessionConfig {
    pub fn with_ttl(mut self, secs: u64) -> Self {
        self.ttl_secs = secs.clamp(1, MAX_TTL_SECS);
        self
    }

    pub fn with_poll_interval(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs.max(1);
        self
    }

    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = payment_type;
        self
    }

    pub fn with_notice_capacity(mut self, capacity: usize) -> Self {
        self.notice_capacity = capacity.max(1);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
