//! Timeout-bounded reads over a blocking card reader.
//!
//! Each [`CardReader::read`] runs the device's blocking read loop on a
//! dedicated worker thread and races it against the caller's timeout. The
//! worker retries transient errors until a UID arrives, the device is
//! halted, or the read budget is exhausted. A worker whose caller has
//! already given up never reports a result and stops at the next
//! opportunity.
//!
//! The reader is shared by reference: [`CardReader::close`] may be called
//! from a signal handler while a read is in flight.

use crate::error::{HardwareError, Result};
use crate::traits::UidDevice;
use bandgate_core::Uid;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// Minimum pause between retries after a failed read.
const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Stand-in deadline for timeouts too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Result of one timeout-bounded read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A tag was read.
    Uid(Uid),

    /// No tag was presented before the timeout.
    TimedOut,

    /// The reader was halted or closed.
    Halted,
}

/// Shared handle to a blocking [`UidDevice`].
///
/// # Examples
///
/// ```
/// use bandgate_hardware::mock::MockUidDevice;
/// use bandgate_hardware::reader::{CardReader, ReadOutcome};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> bandgate_hardware::Result<()> {
///     let (device, handle) = MockUidDevice::new();
///     let reader = CardReader::new(device);
///
///     handle.present(vec![0x04, 0xAB, 0xCD, 0xEF]);
///     let outcome = reader.read(Duration::from_secs(1)).await?;
///     assert!(matches!(outcome, ReadOutcome::Uid(uid) if uid.as_str() == "04ABCDEF"));
///
///     reader.close()?;
///     assert_eq!(reader.read(Duration::from_secs(1)).await?, ReadOutcome::Halted);
///     Ok(())
/// }
/// ```
pub struct CardReader<D: UidDevice> {
    device: Arc<D>,
    /// Serialises access to the bus between workers and `close`.
    port: Arc<Mutex<()>>,
    closed: Arc<AtomicBool>,
}

impl<D: UidDevice> CardReader<D> {
    pub fn new(device: D) -> Self {
        Self {
            device: Arc::new(device),
            port: Arc::new(Mutex::new(())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wait up to `timeout` for the next tag.
    ///
    /// Returns `Halted` immediately once the reader has been closed.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Io` if the worker thread cannot be spawned.
    pub async fn read(&self, timeout: Duration) -> Result<ReadOutcome> {
        if self.is_closed() {
            return Ok(ReadOutcome::Halted);
        }

        let now = Instant::now();
        let worker = Worker {
            device: Arc::clone(&self.device),
            port: Arc::clone(&self.port),
            closed: Arc::clone(&self.closed),
            abandoned: Arc::new(AtomicBool::new(false)),
            deadline: now.checked_add(timeout).unwrap_or(now + FAR_FUTURE),
        };
        let _abandon = AbandonOnDrop(Arc::clone(&worker.abandoned));

        let (tx, rx) = oneshot::channel();
        thread::Builder::new()
            .name("uid-reader".into())
            .spawn(move || worker.run(tx))?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(WorkerResult::Uid(uid))) => Ok(ReadOutcome::Uid(uid)),
            Ok(Ok(WorkerResult::Halted)) => Ok(ReadOutcome::Halted),
            // Worker ran out of budget before the timer fired.
            Ok(Err(_)) if self.is_closed() => Ok(ReadOutcome::Halted),
            Ok(Err(_)) | Err(_) => Ok(ReadOutcome::TimedOut),
        }
    }

    /// Halt any in-flight read and release the device. Idempotent.
    ///
    /// The halt is issued without taking the bus guard so a worker blocked
    /// inside the device is interrupted; the device is then closed under the
    /// guard once that worker has let go.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!("Closing card reader");

        self.device.halt();
        let _port = lock(&self.port);
        self.device.close()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

enum WorkerResult {
    Uid(Uid),
    Halted,
}

struct Worker<D> {
    device: Arc<D>,
    port: Arc<Mutex<()>>,
    closed: Arc<AtomicBool>,
    abandoned: Arc<AtomicBool>,
    deadline: Instant,
}

impl<D: UidDevice> Worker<D> {
    fn run(self, tx: oneshot::Sender<WorkerResult>) {
        loop {
            if self.closed.load(Ordering::Acquire) {
                let _ = tx.send(WorkerResult::Halted);
                return;
            }
            if self.abandoned.load(Ordering::Acquire) {
                trace!("Read abandoned by caller");
                return;
            }
            let remaining = self.deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }

            let result = {
                let _port = lock(&self.port);
                if self.closed.load(Ordering::Acquire) {
                    Err(HardwareError::Halted)
                } else {
                    self.device.read_uid(remaining)
                }
            };

            if self.abandoned.load(Ordering::Acquire) {
                return;
            }

            match result {
                Ok(bytes) => match Uid::from_bytes(&bytes) {
                    Ok(uid) => {
                        let _ = tx.send(WorkerResult::Uid(uid));
                        return;
                    }
                    Err(e) => warn!(len = bytes.len(), error = %e, "Discarding unreadable UID"),
                },
                Err(e) if e.is_halt() => {
                    debug!("Card reader halted");
                    let _ = tx.send(WorkerResult::Halted);
                    return;
                }
                Err(HardwareError::Timeout { .. }) => continue,
                Err(e) => {
                    trace!(error = %e, "Transient read error, retrying");
                    let pause = MIN_RETRY_INTERVAL
                        .min(self.deadline.saturating_duration_since(Instant::now()));
                    thread::sleep(pause);
                }
            }
        }
    }
}

/// Marks the worker abandoned when the caller stops waiting, including when
/// the `read` future itself is dropped.
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn lock(port: &Mutex<()>) -> MutexGuard<'_, ()> {
    port.lock().unwrap_or_else(PoisonError::into_inner)
}
