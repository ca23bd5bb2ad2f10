//! Block decision engine.
//!
//! Pure functions over a [`TrackerRecord`]. Escalation uses exponential
//! backoff on an exponent of
//!
//! ```text
//! exponent = offense_count + (failure_count - max_failed_attempts)
//! duration = min(initial_block_duration * 2^exponent, max_block_duration)
//! ```
//!
//! `offense_count` survives window restarts, so a client that re-offends
//! after its block ends receives a longer block than the one before.

use super::config::GuardConfig;
use super::entities::Timestamp;
use super::record::TrackerRecord;
use std::time::Duration;

/// Outcome of evaluating a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the client is blocked after this evaluation
    pub blocked: bool,
    /// End of the block in force
    pub blocked_until: Option<Timestamp>,
    /// Record to store
    pub record: TrackerRecord,
    /// Set only when this evaluation moved the client into a new block
    pub transition: Option<BlockTransition>,
}

/// Details of a fresh block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTransition {
    /// Length of the new block
    pub block_duration: Duration,
    /// Escalation exponent applied
    pub exponent: u32,
}

/// Decide whether `record` is blocked at `now`, escalating if it just
/// crossed the threshold.
pub fn evaluate(record: &TrackerRecord, now: Timestamp, config: &GuardConfig) -> Evaluation {
    if record.failure_count < config.max_failed_attempts || record.is_blocked_at(now) {
        // Below threshold, or still serving a block: nothing changes.
        let blocked = record.is_blocked_at(now);
        return Evaluation {
            blocked,
            blocked_until: record.blocked_until.filter(|_| blocked),
            record: record.clone(),
            transition: None,
        };
    }

    let excess = record.failure_count - config.max_failed_attempts;
    let exponent = record.offense_count.saturating_add(excess);
    let block_duration = block_duration(exponent, config);
    let candidate = now.saturating_add(block_duration);

    let mut next = record.clone();
    // Never shorten a block already on record.
    let until = next.blocked_until.map_or(candidate, |prev| prev.max(candidate));
    next.blocked_until = Some(until);
    next.released_at = None;
    next.offense_count = next.offense_count.saturating_add(1);

    Evaluation {
        blocked: true,
        blocked_until: Some(until),
        record: next,
        transition: Some(BlockTransition {
            block_duration,
            exponent,
        }),
    }
}

/// `min(initial * 2^exponent, max)`, saturating on overflow.
pub fn block_duration(exponent: u32, config: &GuardConfig) -> Duration {
    let max = config.max_block_duration;
    let Some(factor) = 1u32.checked_shl(exponent) else {
        return max;
    };
    config
        .initial_block_duration
        .checked_mul(factor)
        .map_or(max, |d| d.min(max))
}
