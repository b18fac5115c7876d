use chrono::Duration;

use crate::helpers::{MAX_CODE_LENGTH, MIN_CODE_LENGTH};

pub const DEFAULT_CODE_LENGTH: usize = 6;
pub const DEFAULT_CODE_EXPIRY_SECS: i64 = 600;
pub const DEFAULT_DELIVERED_VISIBILITY_SECS: i64 = 600;

/// Deployment-tunable lifecycle rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRules {
    /// Number of digits in a delivery code. Clamped to 4..=9.
    pub code_length: usize,
    /// A code older than this is rejected and the order regresses to `picked_up`.
    pub code_expiry: Duration,
    /// How long a delivered order stays in the active views.
    pub delivered_visibility: Duration,
}

impl Default for DispatchRules {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            code_expiry: Duration::seconds(DEFAULT_CODE_EXPIRY_SECS),
            delivered_visibility: Duration::seconds(DEFAULT_DELIVERED_VISIBILITY_SECS),
        }
    }
}

impl DispatchRules {
    pub fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length.clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH);
        self
    }

    pub fn with_code_expiry(mut self, expiry: Duration) -> Self {
        self.code_expiry = expiry;
        self
    }

    pub fn with_delivered_visibility(mut self, window: Duration) -> Self {
        self.delivered_visibility = window;
        self
    }
}
