//! Per-client failure tracking record.
//!
//! The counting window slides by restart: a failure arriving more than one
//! window after `window_start` opens a fresh window with a count of 1.

use super::config::GuardConfig;
use super::entities::Timestamp;
use serde::Serialize;

/// Failure history for one client key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerRecord {
    /// Failures inside the current window
    pub failure_count: u32,
    /// When the current window began
    pub window_start: Timestamp,
    /// End of the active block, if any
    pub blocked_until: Option<Timestamp>,
    /// Blocks issued over the life of this record; drives escalation
    pub offense_count: u32,
    /// End of the most recent block once it has been lazily cleared
    pub released_at: Option<Timestamp>,
    /// Most recent failure
    pub last_failure: Timestamp,
    /// Reason attached to the most recent failure
    pub last_reason: Option<String>,
}

impl TrackerRecord {
    /// Record for a client's first failure.
    pub fn first_failure(now: Timestamp, reason: Option<&str>) -> Self {
        Self {
            failure_count: 1,
            window_start: now,
            blocked_until: None,
            offense_count: 0,
            released_at: None,
            last_failure: now,
            last_reason: reason.map(str::to_owned),
        }
    }

    /// Apply one failure observed at `now`.
    ///
    /// A failure outside the window restarts it and clears any expired
    /// block. The offense count survives the restart.
    pub fn register_failure(&mut self, now: Timestamp, reason: Option<&str>, config: &GuardConfig) {
        if now.saturating_since(self.window_start) > config.failure_window {
            self.failure_count = 1;
            self.window_start = now;
            if let Some(until) = self.blocked_until {
                if until <= now {
                    self.blocked_until = None;
                    self.released_at = Some(until);
                }
            }
        } else {
            self.failure_count = self.failure_count.saturating_add(1);
        }
        self.last_failure = now;
        self.last_reason = reason.map(str::to_owned);
    }

    /// Whether a block is active at `now`.
    pub fn is_blocked_at(&self, now: Timestamp) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }

    /// Whether the record carries a block that has already ended.
    pub fn has_expired_block(&self, now: Timestamp) -> bool {
        self.blocked_until.is_some_and(|until| until <= now)
    }

    /// Move an ended block into `released_at`.
    ///
    /// Returns true when a block was cleared.
    pub fn release_if_expired(&mut self, now: Timestamp) -> bool {
        match self.blocked_until {
            Some(until) if until <= now => {
                self.blocked_until = None;
                self.released_at = Some(until);
                true
            }
            _ => false,
        }
    }

    /// End of the last block, active or not.
    pub fn last_block_end(&self) -> Option<Timestamp> {
        self.blocked_until.or(self.released_at)
    }

    /// Whether the record can be dropped without changing any decision.
    ///
    /// Active blocks are never stale. A record that was never blocked is
    /// stale once its window has been idle for two windows. A record with a
    /// block history keeps its offense memory until the last block ended
    /// more than one window ago and its current window has closed.
    pub fn is_stale(&self, now: Timestamp, config: &GuardConfig) -> bool {
        if self.is_blocked_at(now) {
            return false;
        }

        let window = config.failure_window;
        match self.last_block_end() {
            Some(end) => {
                now > end
                    && now.saturating_since(end) > window
                    && now.saturating_since(self.window_start) > window
            }
            None => now.saturating_since(self.window_start) > window.saturating_mul(2),
        }
    }
}
