//! Bounded retry for upload-conflict classes of server error.
//!
//! Publish flows re-issue certain failed requests (for example when the
//! server reports a transient "unzipping" failure) a fixed number of times
//! with no backoff. The combinator keeps the attempt counting out of the
//! orchestration methods so they stay linear.

use tracing::debug;

/// Run `operation` up to `max_attempts` times, re-running only while
/// `is_retryable` accepts the error. Returns the first success or the
/// final error. `max_attempts` counts every attempt including the first;
/// a bound of 1 means "never retry".
pub fn retry<T, E, F, R>(max_attempts: u32, mut is_retryable: R, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    R: FnMut(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 1u32;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts && is_retryable(&error) => {
                debug!(attempt, max_attempts, %error, "retrying after recoverable error");
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
