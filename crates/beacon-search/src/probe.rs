//! Periodic progress probe.
//!
//! A timer thread sets a single atomic flag; the search loop polls and clears it
//! between steps and only then fires `searchProbed` on its own thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use tracing::{debug, warn};

/// Cloneable handle to the probe request flag.
#[derive(Debug, Clone, Default)]
pub struct ProbeHandle {
    requested: Arc<AtomicBool>,
}

impl ProbeHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a probe notification at the next poll point.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Clear the flag, returning whether a probe was pending.
    pub fn take(&self) -> bool {
        self.requested
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// Background thread requesting a probe every `interval`. Stops on drop.
pub struct ProbeTimer {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ProbeTimer {
    pub fn start(handle: ProbeHandle, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let ticker = channel::tick(interval);
        let thread = std::thread::spawn(move || loop {
            crossbeam::select! {
                recv(ticker) -> _ => handle.request(),
                recv(stop_rx) -> _ => break,
            }
        });
        debug!(interval_ms = interval.as_millis() as u64, "probe timer started");
        Self {
            stop: Some(stop_tx),
            thread: Some(thread),
        }
    }

    pub fn stop(&mut self) {
        // Dropping the sender disconnects the channel, which wakes the select.
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(()) => debug!("probe timer stopped"),
                Err(_) => warn!("probe timer thread panicked"),
            }
        }
    }
}

impl Drop for ProbeTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_flag() {
        let handle = ProbeHandle::new();
        assert!(!handle.take());
        handle.request();
        assert!(handle.is_requested());
        assert!(handle.take());
        assert!(!handle.take());
    }

    #[test]
    fn test_clones_share_flag() {
        let handle = ProbeHandle::new();
        let timer_side = handle.clone();
        timer_side.request();
        assert!(handle.take());
    }

    #[test]
    fn test_timer_sets_flag() {
        let handle = ProbeHandle::new();
        let mut timer = ProbeTimer::start(handle.clone(), Duration::from_millis(2));
        let mut seen = false;
        for _ in 0..500 {
            if handle.take() {
                seen = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        timer.stop();
        assert!(seen, "probe timer never fired");
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut timer = ProbeTimer::start(ProbeHandle::new(), Duration::from_secs(60));
        timer.stop();
        timer.stop();
    }
}
