//! Single-slot mailbox between the router and bridge callers.
//!
//! At most one bridge caller is *armed* at a time. Arming stores a ticket and
//! the sending half of a one-shot channel. The router delivers by taking the
//! sender out of the slot under the lock and sending the event through it;
//! a caller that gives up withdraws its ticket under the same lock. Whichever
//! happens first wins, so an event is either handed to exactly one caller or
//! returned to the router, never both and never neither.
//!
//! Callers that find the slot taken wait on a [`Notify`] until it is vacated
//! or their own deadline passes.

use bandgate_core::Event;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Notify, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Stand-in deadline for timeouts too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// How a bridge wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// The next scan was handed to this caller.
    Delivered(Event),

    /// The deadline passed first.
    TimedOut,

    /// The router was closed.
    Closed,
}

struct Armed {
    ticket: u64,
    tx: oneshot::Sender<Event>,
}

#[derive(Default)]
struct Slot {
    closed: bool,
    armed: Option<Armed>,
}

enum ArmAttempt {
    Armed(u64, oneshot::Receiver<Event>),
    Busy,
    Closed,
}

pub(crate) struct Mailbox {
    slot: Mutex<Slot>,
    /// Mirrors `slot.armed.is_some()` so routing can skip the lock.
    armed: AtomicBool,
    vacated: Notify,
    next_ticket: AtomicU64,
    shutdown: CancellationToken,
}

impl Mailbox {
    pub(crate) fn new(shutdown: CancellationToken) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            armed: AtomicBool::new(false),
            vacated: Notify::new(),
            next_ticket: AtomicU64::new(1),
            shutdown,
        }
    }

    /// Wait up to `timeout` for the next scan.
    pub(crate) async fn wait_for_event(&self, timeout: Duration) -> BridgeOutcome {
        if self.lock().closed {
            return BridgeOutcome::Closed;
        }
        if timeout.is_zero() {
            return BridgeOutcome::TimedOut;
        }
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now + FAR_FUTURE);

        let (ticket, mut rx) = loop {
            let vacated = self.vacated.notified();
            tokio::pin!(vacated);
            vacated.as_mut().enable();

            match self.try_arm() {
                ArmAttempt::Armed(ticket, rx) => break (ticket, rx),
                ArmAttempt::Closed => return BridgeOutcome::Closed,
                ArmAttempt::Busy => {}
            }

            trace!("Bridge slot taken, waiting");
            tokio::select! {
                _ = &mut vacated => {}
                _ = tokio::time::sleep_until(deadline) => return BridgeOutcome::TimedOut,
                _ = self.shutdown.cancelled() => return BridgeOutcome::Closed,
            }
        };

        let mut guard = WithdrawOnDrop {
            mailbox: self,
            ticket,
            active: true,
        };

        tokio::select! {
            biased;
            received = &mut rx => {
                guard.active = false;
                return match received {
                    Ok(event) => BridgeOutcome::Delivered(event),
                    // The sender is only dropped unsent when the mailbox closes
                    Err(_) => BridgeOutcome::Closed,
                };
            }
            _ = tokio::time::sleep_until(deadline) => {}
            _ = self.shutdown.cancelled() => {}
        }

        guard.active = false;
        if self.withdraw(ticket) {
            return if self.shutdown.is_cancelled() {
                BridgeOutcome::Closed
            } else {
                BridgeOutcome::TimedOut
            };
        }

        // The router took the ticket first: the event is already in the channel
        match rx.try_recv() {
            Ok(event) => BridgeOutcome::Delivered(event),
            Err(_) if self.shutdown.is_cancelled() => BridgeOutcome::Closed,
            Err(_) => BridgeOutcome::TimedOut,
        }
    }

    /// Hand `event` to the armed caller, if any.
    ///
    /// Returns the event back when no caller is armed or the armed caller
    /// has gone away.
    pub(crate) fn deliver(&self, event: Event) -> Result<(), Event> {
        if !self.armed.load(Ordering::Acquire) {
            return Err(event);
        }

        let result = {
            let mut slot = self.lock();
            let Some(armed) = slot.armed.take() else {
                return Err(event);
            };
            self.armed.store(false, Ordering::Release);
            trace!(ticket = armed.ticket, "Delivering to bridge caller");
            armed.tx.send(event)
        };
        self.vacated.notify_waiters();
        result
    }

    /// Whether a caller is currently armed.
    pub(crate) fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Release every waiting caller and refuse new ones.
    pub(crate) fn close(&self) {
        {
            let mut slot = self.lock();
            slot.closed = true;
            slot.armed = None;
            self.armed.store(false, Ordering::Release);
        }
        self.shutdown.cancel();
        self.vacated.notify_waiters();
    }

    fn try_arm(&self) -> ArmAttempt {
        let mut slot = self.lock();
        if slot.closed {
            return ArmAttempt::Closed;
        }
        if slot.armed.as_ref().is_some_and(|a| !a.tx.is_closed()) {
            return ArmAttempt::Busy;
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        slot.armed = Some(Armed { ticket, tx });
        self.armed.store(true, Ordering::Release);
        trace!(ticket, "Bridge caller armed");
        ArmAttempt::Armed(ticket, rx)
    }

    /// Remove `ticket` from the slot. Returns false if it was no longer there.
    fn withdraw(&self, ticket: u64) -> bool {
        let withdrawn = {
            let mut slot = self.lock();
            if slot.armed.as_ref().is_some_and(|a| a.ticket == ticket) {
                slot.armed = None;
                self.armed.store(false, Ordering::Release);
                true
            } else {
                false
            }
        };
        if withdrawn {
            trace!(ticket, "Bridge caller withdrew");
            self.vacated.notify_waiters();
        }
        withdrawn
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Withdraws the ticket if the waiting request is dropped mid-wait.
struct WithdrawOnDrop<'a> {
    mailbox: &'a Mailbox,
    ticket: u64,
    active: bool,
}

impl Drop for WithdrawOnDrop<'_> {
    fn drop(&mut self) {
        if self.active {
            self.mailbox.withdraw(self.ticket);
        }
    }
}
