use serde::{Deserialize, Serialize};

/// Tuning for the vote ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Commit attempts per vote before giving up with `Unavailable`.
    pub max_attempts: u32,
    /// Recount a target automatically when a commit leaves a negative
    /// counter behind.
    pub repair_on_negative: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            repair_on_negative: true,
        }
    }
}

impl LedgerConfig {
    /// Attempts actually used; a configured zero still makes one attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LedgerConfig::default();
        assert_eq!(c.max_attempts, 3);
        assert!(c.repair_on_negative);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let c = LedgerConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(c.attempts(), 1);
    }
}
