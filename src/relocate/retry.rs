// src/relocate/retry.rs

use std::io;
use std::time::Duration;

/// Bounded exponential backoff for moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the `attempt`-th failure (1-based): the initial
    /// backoff doubled per previous failure, capped at `max_backoff`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Sum of all delays a fully exhausted retry sequence sleeps.
    pub fn total_delay(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay_for(a)).sum()
    }
}

/// Errors worth retrying: another process (browser, antivirus, indexer)
/// still holds the file, or the call was interrupted.
pub fn is_transient(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::ResourceBusy
    ) {
        return true;
    }

    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..policy.max_attempts)
            .map(|a| policy.delay_for(a).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 8000]);
        assert_eq!(policy.delay_for(20), Duration::from_secs(8));
        assert_eq!(policy.total_delay(), Duration::from_millis(15_500));
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        let policy = RetryPolicy {
            max_attempts: u32::MAX,
            initial_backoff: Duration::from_secs(u64::MAX / 4),
            max_backoff: Duration::from_secs(u64::MAX / 2),
        };
        assert_eq!(policy.delay_for(u32::MAX), policy.max_backoff);
    }

    #[test]
    fn classifies_lock_errors_as_transient() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::NotFound)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::AlreadyExists)));
        assert!(!is_transient(&io::Error::other("disk on fire")));
    }
}
