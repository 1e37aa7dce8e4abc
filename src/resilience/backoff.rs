//! Delay schedule between passes over the ledger node list.

use rand::Rng;
use std::time::Duration;

/// Doubling delay per pass, capped, plus up to 10% random spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl BackoffPolicy {
    pub const fn new(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms }
    }

    /// Delay before `pass`. The first pass (0) starts immediately.
    pub fn delay(&self, pass: u32) -> Duration {
        let ceiling = self.ceiling(pass);
        let spread = ceiling / 10;
        let jitter = if spread == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..spread)
        };
        Duration::from_millis(ceiling + jitter)
    }

    /// Deterministic part of the delay, without jitter.
    fn ceiling(&self, pass: u32) -> u64 {
        match pass {
            0 => 0,
            n => {
                let factor = 1u64.checked_shl(n - 1).unwrap_or(u64::MAX);
                self.base_ms.saturating_mul(factor).min(self.max_ms)
            }
        }
    }
}
