use std::time::Duration;

/// Delay before the next attempt of a chunk, using exponential backoff.
///
/// The delay formula is: `min(base * 2^failures_so_far, max)`, starting at
/// `failures_so_far = 0` for the first retry.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use harvest_fetch::retry_delay;
///
/// let base = Duration::from_millis(100);
/// let max = Duration::from_secs(1);
/// assert_eq!(retry_delay(0, base, max), Duration::from_millis(100));
/// assert_eq!(retry_delay(1, base, max), Duration::from_millis(200));
/// assert_eq!(retry_delay(2, base, max), Duration::from_millis(400));
/// assert_eq!(retry_delay(4, base, max), max);
/// ```
pub fn retry_delay(retry_count: u32, base: Duration, max: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles() {
        let base = Duration::from_millis(10);
        let delays: Vec<Duration> = (0..5).map(|i| retry_delay(i, base, Duration::MAX)).collect();
        for i in 1..delays.len() {
            assert_eq!(delays[i], delays[i - 1] * 2);
        }
    }

    #[test]
    fn test_retry_delay_zero_base() {
        assert_eq!(retry_delay(0, Duration::ZERO, Duration::MAX), Duration::ZERO);
        assert_eq!(retry_delay(31, Duration::ZERO, Duration::MAX), Duration::ZERO);
    }

    #[test]
    fn test_retry_delay_saturates() {
        let delay = retry_delay(40, Duration::from_secs(u64::MAX / 2), Duration::MAX);
        assert_eq!(delay, Duration::MAX);
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(30);
        assert_eq!(retry_delay(8, base, max), Duration::from_millis(25_600));
        assert_eq!(retry_delay(9, base, max), max);
        assert_eq!(retry_delay(31, base, max), max);
    }
}
