//! Bounded retry around flaky artifact writes.

use std::thread;
use std::time::Duration;

use log::warn;

use crate::error::Result;
use crate::schema::RetryPolicy;

impl RetryPolicy {
    /// Run `op` until it succeeds or `max_attempts` are used up.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned
    /// on exhaustion.
    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    warn!(
                        "{}: attempt {}/{} failed: {}",
                        label, attempt, attempts, e
                    );
                    if self.backoff_ms > 0 {
                        thread::sleep(Duration::from_millis(self.backoff_ms));
                    }
                    attempt += 1;
                }
            }
        }
    }
}
