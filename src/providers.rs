//! Shared provider traits for dependency injection.
//!
//! Anything that touches the wall clock goes through these traits so tests
//! can pin the values they produce.

use chrono::{DateTime, Local};

/// Trait for providing timestamps.
///
/// # Example
///
/// ```
/// use sudothink::providers::{SystemTimeProvider, TimeProvider};
///
/// let provider = SystemTimeProvider;
/// let now = provider.now();
/// assert!(now.timestamp() > 0);
/// ```
pub trait TimeProvider: Send + Sync {
    /// Returns the current local time.
    fn now(&self) -> DateTime<Local>;
}

/// Default time provider using the system clock.
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
