//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Calculate the exponential backoff delay that follows failed attempt `attempt` (1-based).
///
/// The delay is `base * 2^(attempt-1)`, capped at `max`, plus up to 10% jitter when enabled.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration, jitter: bool) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u32.saturating_pow(attempt - 1);
    let delay = base.saturating_mul(exponential_base);
    let capped_delay = delay.min(max);

    if !jitter {
        return capped_delay;
    }

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay.as_millis() as u64 / 10;
    let jitter_ms = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    capped_delay + Duration::from_millis(jitter_ms)
}
