//! Request statistics shared by every management connection
//!
//! One `RequestStats` is created at startup and handed to each
//! [`ManagementConnection`](crate::mgmt::ManagementConnection) as an
//! `Arc`. Values live only as long as the process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
pub struct RequestStats {
    request_count: AtomicU64,
    request_time: AtomicU64,
    /// Largest latency since the last drain
    max_time: Mutex<u64>,
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            request_count: AtomicU64::new(0),
            request_time: AtomicU64::new(0),
            max_time: Mutex::new(0),
        }
    }

    pub fn increment_request_count(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Accumulate one request's wall-clock time and fold it into the
    /// running maximum
    pub fn add_request_time(&self, elapsed_millis: u64) {
        self.request_time.fetch_add(elapsed_millis, Ordering::Relaxed);

        let mut max = self.max_time.lock().unwrap_or_else(|e| e.into_inner());
        *max = (*max).max(elapsed_millis);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Total accumulated request time in milliseconds
    pub fn request_time(&self) -> u64 {
        self.request_time.load(Ordering::Relaxed)
    }

    /// Maximum latency since the previous call, resetting it
    ///
    /// Returns 0 when no request completed in between.
    pub fn get_max_time(&self) -> u64 {
        let mut max = self.max_time.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *max)
    }
}
