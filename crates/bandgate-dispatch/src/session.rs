//! Per-pass coordination state shared by the handlers of one chain run.
//!
//! A [`Session`] maps names to exactly one live entry each:
//!
//! - a **task**: background work started by one handler and joined by a
//!   later one,
//! - a **payload**: a typed value handed from one handler to another,
//! - a **signal**: a cooperative stop request for a long-running effect.
//!
//! The session is owned by the thread running the pass. Background work
//! never touches it; it only completes its own one-shot channel, which the
//! joining handler waits on.
//!
//! ```
//! use bandgate_dispatch::{Session, SlotKey};
//!
//! const GREETING: SlotKey<String> = SlotKey::new("greeting");
//!
//! let mut session = Session::new();
//! session.start_async("work", || println!("background")).unwrap();
//! session.put(&GREETING, "hello".to_string()).unwrap();
//!
//! session.await_and_clear("work").unwrap();
//! assert_eq!(session.take(&GREETING).as_deref(), Some("hello"));
//! assert!(session.finish().is_ok());
//! ```

use crate::error::{EntryKind, SessionError};
use bandgate_hardware::StopSignal;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// A session name bound to the type of the payload stored under it.
pub struct SlotKey<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> SlotKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> fmt::Debug for SlotKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SlotKey").field(&self.name).finish()
    }
}

enum Entry {
    Task(oneshot::Receiver<()>),
    Payload(Box<dyn Any + Send>),
    Signal(StopSignal),
}

impl Entry {
    fn kind(&self) -> EntryKind {
        match self {
            Entry::Task(_) => EntryKind::Task,
            Entry::Payload(_) => EntryKind::Payload,
            Entry::Signal(_) => EntryKind::Signal,
        }
    }
}

/// Named entries live for the duration of one pass.
#[derive(Default)]
pub struct Session {
    entries: BTreeMap<String, Entry>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` on its own thread and register its completion under `name`.
    ///
    /// Does not wait for the work to start.
    ///
    /// # Errors
    ///
    /// - `SessionError::NameCollision` if `name` is live
    /// - `SessionError::Spawn` if the thread cannot be created
    pub fn start_async<F>(&mut self, name: &str, work: F) -> Result<(), SessionError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.ensure_vacant(name)?;

        let (done_tx, done_rx) = oneshot::channel();
        thread::Builder::new()
            .name(format!("task-{name}"))
            .spawn(move || {
                work();
                // A panic in `work` drops the sender unsent
                let _ = done_tx.send(());
            })
            .map_err(|source| SessionError::Spawn {
                name: name.to_string(),
                source,
            })?;

        trace!(task = name, "Started task");
        self.entries.insert(name.to_string(), Entry::Task(done_rx));
        Ok(())
    }

    /// Remove the task registered under `name` and block until it finishes.
    ///
    /// Must be called from a thread that may block (never from inside an
    /// async task).
    ///
    /// # Errors
    ///
    /// - `SessionError::NotLive` if nothing is registered under `name`
    /// - `SessionError::WrongKind` if the entry is not a task; it stays live
    /// - `SessionError::TaskPanicked` if the work panicked
    pub fn await_and_clear(&mut self, name: &str) -> Result<(), SessionError> {
        let entry = self.remove(name)?;
        let Entry::Task(done) = entry else {
            return Err(self.restore(name, entry, EntryKind::Task));
        };

        trace!(task = name, "Waiting for task");
        done.blocking_recv()
            .map_err(|_| SessionError::TaskPanicked {
                name: name.to_string(),
            })
    }

    /// Store a payload.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NameCollision` if the key's name is live.
    pub fn put<T: Send + 'static>(&mut self, key: &SlotKey<T>, value: T) -> Result<(), SessionError> {
        self.ensure_vacant(key.name)?;
        self.entries
            .insert(key.name.to_string(), Entry::Payload(Box::new(value)));
        Ok(())
    }

    /// Borrow a payload without removing it.
    pub fn get<T: 'static>(&self, key: &SlotKey<T>) -> Option<&T> {
        match self.entries.get(key.name)? {
            Entry::Payload(value) => value.downcast_ref(),
            _ => None,
        }
    }

    /// Remove and return a payload. Entries of another kind or type stay.
    pub fn take<T: 'static>(&mut self, key: &SlotKey<T>) -> Option<T> {
        match self.entries.remove(key.name)? {
            Entry::Payload(value) => match value.downcast::<T>() {
                Ok(value) => Some(*value),
                Err(value) => {
                    self.entries
                        .insert(key.name.to_string(), Entry::Payload(value));
                    None
                }
            },
            other => {
                self.entries.insert(key.name.to_string(), other);
                None
            }
        }
    }

    /// Register a fresh stop signal under `name` and return a handle to it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NameCollision` if `name` is live.
    pub fn create_signal(&mut self, name: &str) -> Result<StopSignal, SessionError> {
        self.ensure_vacant(name)?;
        let signal = StopSignal::new();
        self.entries
            .insert(name.to_string(), Entry::Signal(signal.clone()));
        Ok(signal)
    }

    /// Handle to a live stop signal.
    pub fn signal(&self, name: &str) -> Option<StopSignal> {
        match self.entries.get(name)? {
            Entry::Signal(signal) => Some(signal.clone()),
            _ => None,
        }
    }

    /// Cancel the signal registered under `name` and remove it.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotLive` if nothing is registered under `name`
    /// - `SessionError::WrongKind` if the entry is not a signal; it stays live
    pub fn close_signal(&mut self, name: &str) -> Result<(), SessionError> {
        let entry = self.remove(name)?;
        let Entry::Signal(signal) = entry else {
            return Err(self.restore(name, entry, EntryKind::Signal));
        };
        trace!(signal = name, "Closing signal");
        signal.cancel();
        Ok(())
    }

    pub fn is_live(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names of all live entries, sorted.
    pub fn live_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// End the pass.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LeakedEntries` naming every entry still live.
    /// Leaked signals are cancelled either way.
    pub fn finish(self) -> Result<(), SessionError> {
        if self.entries.is_empty() {
            Ok(())
        } else {
            Err(SessionError::LeakedEntries(self.live_names()))
        }
    }

    fn ensure_vacant(&self, name: &str) -> Result<(), SessionError> {
        if self.entries.contains_key(name) {
            return Err(SessionError::NameCollision {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<Entry, SessionError> {
        self.entries.remove(name).ok_or_else(|| SessionError::NotLive {
            name: name.to_string(),
        })
    }

    fn restore(&mut self, name: &str, entry: Entry, expected: EntryKind) -> SessionError {
        let found = entry.kind();
        self.entries.insert(name.to_string(), entry);
        SessionError::WrongKind {
            name: name.to_string(),
            expected,
            found,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, entry)| (name, entry.kind())))
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for (name, entry) in &self.entries {
            if let Entry::Signal(signal) = entry {
                debug!(signal = %name, "Cancelling signal left in session");
                signal.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    const COLOR: SlotKey<u32> = SlotKey::new("color");
    const COLOR_AS_TEXT: SlotKey<String> = SlotKey::new("color");

    #[test]
    fn test_await_waits_for_completion() {
        let mut session = Session::new();
        let done = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&done);
        session
            .start_async("slow", move || {
                std::thread::sleep(Duration::from_millis(30));
                flag.store(true, Ordering::SeqCst);
            })
            .unwrap();
        assert!(session.is_live("slow"));

        session.await_and_clear("slow").unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert!(!session.is_live("slow"));
    }

    #[test]
    fn test_name_collision_until_cleared() {
        let mut session = Session::new();
        session.start_async("sound", || {}).unwrap();

        let err = session.start_async("sound", || {}).unwrap_err();
        assert!(matches!(err, SessionError::NameCollision { ref name } if name == "sound"));

        session.await_and_clear("sound").unwrap();
        session.start_async("sound", || {}).unwrap();
        session.await_and_clear("sound").unwrap();
    }

    #[test]
    fn test_await_not_live() {
        let mut session = Session::new();
        assert!(matches!(
            session.await_and_clear("missing"),
            Err(SessionError::NotLive { .. })
        ));
    }

    #[test]
    fn test_await_wrong_kind_keeps_entry() {
        let mut session = Session::new();
        session.create_signal("stop").unwrap();

        let err = session.await_and_clear("stop").unwrap_err();
        assert!(matches!(
            err,
            SessionError::WrongKind {
                expected: EntryKind::Task,
                found: EntryKind::Signal,
                ..
            }
        ));
        assert!(session.is_live("stop"));
        session.close_signal("stop").unwrap();
    }

    #[test]
    fn test_panicking_task_is_reported() {
        let mut session = Session::new();
        session
            .start_async("boom", || panic!("effect failed"))
            .unwrap();

        assert!(matches!(
            session.await_and_clear("boom"),
            Err(SessionError::TaskPanicked { ref name }) if name == "boom"
        ));
    }

    #[test]
    fn test_payload_take_is_typed_and_once() {
        let mut session = Session::new();
        session.put(&COLOR, 0x00FF00).unwrap();

        assert_eq!(session.get(&COLOR), Some(&0x00FF00));
        assert_eq!(session.take(&COLOR_AS_TEXT), None);
        assert!(session.is_live("color"));

        assert_eq!(session.take(&COLOR), Some(0x00FF00));
        assert_eq!(session.take(&COLOR), None);
        assert!(session.is_empty());
    }

    #[test]
    fn test_put_collides_with_other_kinds() {
        let mut session = Session::new();
        session.create_signal("color").unwrap();
        assert!(matches!(
            session.put(&COLOR, 1),
            Err(SessionError::NameCollision { .. })
        ));
        assert_eq!(session.get(&COLOR), None);
        session.close_signal("color").unwrap();
    }

    #[test]
    fn test_close_signal_cancels() {
        let mut session = Session::new();
        let signal = session.create_signal("stop_spinning").unwrap();
        assert!(!signal.is_cancelled());
        assert!(session.signal("stop_spinning").is_some());

        session.close_signal("stop_spinning").unwrap();
        assert!(signal.is_cancelled());
        assert!(matches!(
            session.close_signal("stop_spinning"),
            Err(SessionError::NotLive { .. })
        ));
    }

    #[test]
    fn test_drop_cancels_live_signals() {
        let mut session = Session::new();
        let signal = session.create_signal("stop_spinning").unwrap();

        drop(session);
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_finish_reports_leftovers() {
        let mut session = Session::new();
        session.put(&COLOR, 7).unwrap();
        let signal = session.create_signal("stop").unwrap();

        match session.finish() {
            Err(SessionError::LeakedEntries(names)) => {
                assert_eq!(names, vec!["color".to_string(), "stop".to_string()]);
            }
            other => panic!("expected leaked entries, got {other:?}"),
        }
        assert!(signal.is_cancelled());
    }
}
