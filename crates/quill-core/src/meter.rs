//! Edit quota metering.
//!
//! A buffer costs one token per four characters, rounded up. Each tab
//! carries a high-water mark of what it has been charged; growing past the
//! mark spends quota, shrinking never refunds it.
//!
//! The mark is overwritten on every charge, including shrinks. A buffer that
//! shrinks and then regrows to its old size is charged the regrowth again.
//! That double charge is long-standing observed behavior and is kept.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token cost of a text body: `ceil(chars / 4)`.
pub fn token_cost(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Result of metering one content update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeOutcome {
    /// Cost of the new content
    pub cost: u64,
    /// Cost previously recorded for the tab
    pub previous: u64,
    /// Quota actually deducted (capped at what remained)
    pub deducted: u64,
    /// Quota left afterwards
    pub remaining: u64,
}

impl ChargeOutcome {
    /// True when this charge consumed the last of the quota.
    pub fn exhausted(&self) -> bool {
        self.remaining == 0 && self.deducted > 0
    }
}

/// Shrinking quota with per-tab high-water marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeter {
    remaining: u64,
    charged: HashMap<String, u64>,
}

impl TokenMeter {
    /// A meter with the full quota and nothing charged.
    pub fn new(quota: u64) -> Self {
        Self {
            remaining: quota,
            charged: HashMap::new(),
        }
    }

    /// Restores a meter from persisted parts.
    pub fn restore(remaining: u64, charged: HashMap<String, u64>) -> Self {
        Self { remaining, charged }
    }

    /// Computes the outcome of charging `content` to `tab` without
    /// applying it.
    pub fn preview(&self, tab: &str, content: &str) -> ChargeOutcome {
        let cost = token_cost(content);
        let previous = self.charged(tab);
        let delta = cost.saturating_sub(previous);
        let deducted = delta.min(self.remaining);
        ChargeOutcome {
            cost,
            previous,
            deducted,
            remaining: self.remaining - deducted,
        }
    }

    /// Applies a previewed charge.
    pub fn commit(&mut self, tab: &str, outcome: ChargeOutcome) {
        self.remaining = outcome.remaining;
        self.charged.insert(tab.to_string(), outcome.cost);
    }

    /// Charges `content` to `tab` and returns what happened.
    pub fn charge(&mut self, tab: &str, content: &str) -> ChargeOutcome {
        let outcome = self.preview(tab, content);
        self.commit(tab, outcome);
        outcome
    }

    /// Cost currently recorded for a tab (0 if never charged).
    pub fn charged(&self, tab: &str) -> u64 {
        self.charged.get(tab).copied().unwrap_or(0)
    }

    /// Drops a tab's charge record.
    pub fn forget(&mut self, tab: &str) {
        self.charged.remove(tab);
    }

    /// Keeps only the charge records for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.charged.retain(|name, _| keep(name));
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// All charge records.
    pub fn charges(&self) -> &HashMap<String, u64> {
        &self.charged
    }
}
