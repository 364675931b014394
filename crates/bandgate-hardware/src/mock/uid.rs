//! Mock card reader for testing and development.
//!
//! Tags are queued through a [`MockUidHandle`]; a blocked
//! [`read_uid`](UidDevice::read_uid) wakes as soon as one arrives or the
//! device is halted.

use crate::{HardwareError, Result, traits::UidDevice};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Default)]
struct State {
    pending: VecDeque<Step>,
    halted: bool,
    close_count: usize,
    read_attempts: usize,
    in_flight: usize,
}

#[derive(Debug)]
enum Step {
    Tag(Vec<u8>),
    Fail(String),
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mock card reader.
///
/// # Examples
///
/// ```
/// use bandgate_hardware::mock::MockUidDevice;
/// use bandgate_hardware::traits::UidDevice;
/// use std::time::Duration;
///
/// let (device, handle) = MockUidDevice::new();
/// handle.present(vec![0x04, 0xAB]);
///
/// assert_eq!(device.read_uid(Duration::from_millis(10)).unwrap(), vec![0x04, 0xAB]);
/// assert!(device.read_uid(Duration::from_millis(10)).is_err());
/// ```
#[derive(Debug)]
pub struct MockUidDevice {
    shared: Arc<Shared>,
}

impl MockUidDevice {
    /// Create a new mock reader and the handle that drives it.
    pub fn new() -> (Self, MockUidHandle) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MockUidHandle { shared },
        )
    }
}

impl UidDevice for MockUidDevice {
    fn read_uid(&self, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        state.read_attempts += 1;
        state.in_flight += 1;

        let result = loop {
            if state.halted {
                break Err(HardwareError::Halted);
            }
            match state.pending.pop_front() {
                Some(Step::Tag(uid)) => break Ok(uid),
                Some(Step::Fail(message)) => break Err(HardwareError::communication(message)),
                None => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break Err(HardwareError::timeout(timeout.as_millis() as u64));
            }
            state = self
                .shared
                .changed
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        };

        state.in_flight -= 1;
        self.shared.changed.notify_all();
        result
    }

    fn halt(&self) {
        trace!("Mock reader halted");
        self.shared.lock().halted = true;
        self.shared.changed.notify_all();
    }

    fn close(&self) -> Result<()> {
        self.shared.lock().close_count += 1;
        Ok(())
    }
}

/// Handle for controlling a [`MockUidDevice`].
#[derive(Debug, Clone)]
pub struct MockUidHandle {
    shared: Arc<Shared>,
}

impl MockUidHandle {
    /// Queue a tag for the next read.
    pub fn present(&self, uid: Vec<u8>) {
        self.shared.lock().pending.push_back(Step::Tag(uid));
        self.shared.changed.notify_all();
    }

    /// Make the next read fail with a transient communication error.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.shared
            .lock()
            .pending
            .push_back(Step::Fail(message.into()));
        self.shared.changed.notify_all();
    }

    pub fn is_halted(&self) -> bool {
        self.shared.lock().halted
    }

    /// How many times the device was closed.
    pub fn close_count(&self) -> usize {
        self.shared.lock().close_count
    }

    /// Total number of `read_uid` calls so far.
    pub fn read_attempts(&self) -> usize {
        self.shared.lock().read_attempts
    }

    /// Number of `read_uid` calls currently blocked.
    pub fn reads_in_flight(&self) -> usize {
        self.shared.lock().in_flight
    }

    /// Block until no read is in flight or `timeout` elapses. Returns whether
    /// the device went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        while state.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            state = self
                .shared
                .changed
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}
