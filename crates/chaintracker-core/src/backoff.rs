//! Exponential backoff for the poll timer.

use std::time::Duration;

/// Ceiling for the backed-off poll period.
pub const BACKOFF_MAX: Duration = Duration::from_secs(10 * 60);

/// Retries allowed for each bootstrap fetch before construction fails.
pub const INIT_RETRIES: usize = 4;

/// Next poll period after `fails` consecutive failures.
///
/// Doubles per failure, with the exponent clamped at 10 and the result capped
/// at [`BACKOFF_MAX`]. `fails == 0` restores the base period.
pub fn exponential_backoff(base: Duration, fails: u32) -> Duration {
    let exponent = fails.min(10);
    base.saturating_mul(1u32 << exponent).min(BACKOFF_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_failure() {
        let base = Duration::from_millis(100);
        assert_eq!(exponential_backoff(base, 0), base);
        assert_eq!(exponential_backoff(base, 1), Duration::from_millis(200));
        assert_eq!(exponential_backoff(base, 2), Duration::from_millis(400));
        assert_eq!(exponential_backoff(base, 3), Duration::from_millis(800));
    }

    #[test]
    fn exponent_clamped_at_ten() {
        let base = Duration::from_millis(1);
        assert_eq!(
            exponential_backoff(base, 10),
            exponential_backoff(base, 1000)
        );
        assert_eq!(exponential_backoff(base, 10), Duration::from_millis(1024));
    }

    #[test]
    fn capped_at_max() {
        let base = Duration::from_secs(120);
        assert_eq!(exponential_backoff(base, 8), BACKOFF_MAX);
    }
}
