//! Fixed-rate tick thread for one session
//!
//! The driver only owns a stop flag and the thread handle. The tick body is a
//! closure supplied by the server, so the driver knows nothing about sessions
//! or locking.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::session::TickOutcome;

/// Ticks we are allowed to fall behind before the schedule is reset
const MAX_LAG_TICKS: u32 = 5;

pub struct TickDriver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TickDriver {
    /// Start a thread calling `on_tick` every `interval` until stopped or
    /// until `on_tick` reports teardown
    pub fn spawn<F>(name: String, interval: Duration, on_tick: F) -> io::Result<Self>
    where
        F: FnMut() -> TickOutcome + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || run(&flag, interval, on_tick))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Ask the thread to stop after its current tick. Never blocks, so it is
    /// safe to call from inside the tick body itself.
    ///
    /// Returns true only for the call that actually stopped it.
    pub fn stop(&self) -> bool {
        !self.stop.swap(true, Ordering::AcqRel)
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Stop and wait for the thread to exit. Must not be called from the
    /// driver's own thread.
    pub fn join(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Tick driver thread panicked");
            }
        }
    }
}

fn run<F>(stop: &AtomicBool, interval: Duration, mut on_tick: F)
where
    F: FnMut() -> TickOutcome,
{
    let mut deadline = Instant::now() + interval;
    while !stop.load(Ordering::Acquire) {
        if on_tick() == TickOutcome::Teardown {
            stop.store(true, Ordering::Release);
            break;
        }

        let now = Instant::now();
        if let Some(remaining) = deadline.checked_duration_since(now) {
            thread::sleep(remaining);
        } else if now.duration_since(deadline) > interval * MAX_LAG_TICKS {
            log::debug!("Tick driver fell behind; resetting schedule");
            deadline = now;
        }
        deadline += interval;
    }
    log::debug!("Tick driver exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_stop_is_idempotent() {
        let driver = TickDriver::spawn("t".to_string(), Duration::from_millis(1), || {
            TickOutcome::Continue
        })
        .unwrap();
        assert!(driver.stop());
        assert!(!driver.stop());
        assert!(driver.is_stopped());
        driver.join();
    }

    #[test]
    fn test_teardown_ends_thread() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let driver = TickDriver::spawn("t".to_string(), Duration::from_millis(1), move || {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                TickOutcome::Teardown
            } else {
                TickOutcome::Continue
            }
        })
        .unwrap();
        let start = Instant::now();
        while !driver.is_stopped() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(driver.is_stopped());
        driver.join();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_ticks_at_roughly_the_requested_rate() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let driver = TickDriver::spawn("t".to_string(), Duration::from_millis(5), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            TickOutcome::Continue
        })
        .unwrap();
        thread::sleep(Duration::from_millis(200));
        driver.join();
        let n = count.load(Ordering::SeqCst);
        // 40 expected; leave room for a loaded CI box
        assert!((5..=60).contains(&n), "ticked {n} times");
    }
}
