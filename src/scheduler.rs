//! Per-device debouncing of protocol calls.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use log::debug;

use crate::runtime::{self, Instant, lock};

/// Spaces out calls to the same device.
///
/// Each device has a "next allowed" slot. A call arriving less than the
/// interval after that slot is pushed one interval past it and waits; later
/// calls queue behind it in submission order. Nothing is ever dropped. Devices
/// never delay each other.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_allowed: Mutex<HashMap<String, Instant>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `call` for `device_id`, delaying it if the device was used less than
    /// `interval` ago.
    ///
    /// The slot is reserved when the returned future is first polled.
    pub async fn schedule<F>(&self, device_id: &str, interval: Duration, call: F) -> F::Output
    where
        F: Future,
    {
        let slot = self.reserve(device_id, interval);
        let now = Instant::now();
        if slot > now {
            debug!("delaying call to {} by {:?}", device_id, slot - now);
            runtime::sleep_until(slot).await;
        } else {
            debug!("executing call to {} now", device_id);
        }
        call.await
    }

    /// Reserve the next slot for a device and return when it starts.
    pub(crate) fn reserve(&self, device_id: &str, interval: Duration) -> Instant {
        let now = Instant::now();
        let mut slots = lock(&self.next_allowed);
        // A slot still in the future saturates to a zero gap and is bumped.
        let slot = match slots.get(device_id) {
            Some(next) if now.saturating_duration_since(*next) < interval => *next + interval,
            _ => now,
        };
        slots.insert(device_id.to_string(), slot);
        slot
    }
}
