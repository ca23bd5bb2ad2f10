//! Wall-clock time source.

use crate::domain::Timestamp;
use crate::ports::TimeSource;

/// System time implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            // Clock before Unix epoch - return 0 rather than panic
            .unwrap_or(0);
        Timestamp::from_millis(millis)
    }
}
