//! Timing measurement and bounded waits
//!
//! - [`measure_sync`]: time a synchronous operation
//! - [`assert_duration_below`]: assert an operation stayed under a threshold
//! - [`within`]: await a future with a deadline, panicking on expiry so a
//!   hung transport fails the test instead of hanging it

use std::{
    future::Future,
    time::{Duration, Instant},
};

/// Measures the duration of a synchronous operation.
///
/// ```
/// use windowcap_test_utils::timing::measure_sync;
///
/// let (value, elapsed) = measure_sync("sum", || (1..=10).sum::<u32>());
/// assert_eq!(value, 55);
/// assert!(elapsed.as_secs() < 1);
/// ```
pub fn measure_sync<F, T>(name: &str, f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    eprintln!("[TIMING] {}: {:.2}ms", name, elapsed.as_secs_f64() * 1000.0);
    (result, elapsed)
}

/// Asserts that a duration is below a threshold.
///
/// ```
/// use std::time::Duration;
///
/// use windowcap_test_utils::timing::assert_duration_below;
///
/// assert_duration_below(Duration::from_millis(500), Duration::from_secs(1), "capture");
/// ```
///
/// # Panics
///
/// Panics if `actual > threshold` with a message showing the excess time.
pub fn assert_duration_below(actual: Duration, threshold: Duration, operation: &str) {
    assert!(
        actual <= threshold,
        "{} took {:.3}s, expected <={:.3}s ({}ms over threshold)",
        operation,
        actual.as_secs_f64(),
        threshold.as_secs_f64(),
        (actual.as_millis() as i128) - (threshold.as_millis() as i128)
    );
}

/// Awaits `future`, panicking if it takes longer than `limit`.
///
/// # Panics
///
/// Panics with `what` in the message when the deadline passes.
pub async fn within<F, T>(limit: Duration, what: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(value) => value,
        Err(_) => panic!("{what} did not complete within {}ms", limit.as_millis()),
    }
}
