//! Priority-ordered handler registry and the pass runner.

use crate::error::{DispatchError, RegistryError, SessionError};
use crate::handler::Handler;
use crate::session::Session;
use bandgate_core::Event;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use tracing::{debug, trace};

/// Handlers keyed by a unique priority; lower priorities run first.
///
/// Populated once at startup. Once shared behind an `Arc` it can no longer
/// be changed.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<i32, Box<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` at `priority`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Conflict` naming the handler that already
    /// holds `priority`. That handler stays registered.
    pub fn register<H>(&mut self, priority: i32, handler: H) -> Result<(), RegistryError>
    where
        H: Handler + 'static,
    {
        match self.handlers.entry(priority) {
            Entry::Occupied(existing) => Err(RegistryError::Conflict {
                priority,
                existing: existing.get().name().to_string(),
            }),
            Entry::Vacant(slot) => {
                debug!(priority, handler = handler.name(), "Registered handler");
                slot.insert(Box::new(handler));
                Ok(())
            }
        }
    }

    /// Handlers in ascending priority order.
    pub fn ordered(&self) -> Vec<&dyn Handler> {
        self.handlers.values().map(|h| h.as_ref()).collect()
    }

    /// Registered priorities in ascending order.
    pub fn priorities(&self) -> Vec<i32> {
        self.handlers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run one pass over `event` with a fresh session.
    ///
    /// Blocks for the duration of the pass.
    ///
    /// # Errors
    ///
    /// - `DispatchError::Handler` for the first handler that fails; later
    ///   handlers do not run
    /// - `DispatchError::LeakedEntries` if the pass left session entries
    pub fn dispatch(&self, event: &mut Event) -> Result<(), DispatchError> {
        let mut session = Session::new();

        for (&priority, handler) in &self.handlers {
            trace!(priority, handler = handler.name(), uid = %event.uid(), "Running handler");
            handler
                .handle(event, &mut session)
                .map_err(|source| DispatchError::Handler {
                    priority,
                    handler: handler.name().to_string(),
                    source,
                })?;
        }

        match session.finish() {
            Err(SessionError::LeakedEntries(names)) => Err(DispatchError::LeakedEntries(names)),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(p, h)| (p, h.name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::handler::handler_fn;
    use crate::session::SlotKey;
    use bandgate_core::Classification;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    fn recorder(log: &Arc<Mutex<Vec<i32>>>, id: i32) -> impl Handler + 'static {
        let log = Arc::clone(log);
        handler_fn(format!("step-{id}"), move |_, _| {
            log.lock().unwrap().push(id);
            Ok(())
        })
    }

    fn event() -> Event {
        Event::new("AABBCCDD".parse().unwrap())
    }

    #[rstest]
    #[case(vec![12, 10, 999, 11])]
    #[case(vec![-5, 0, 5])]
    #[case(vec![3])]
    fn test_dispatch_runs_in_priority_order(#[case] priorities: Vec<i32>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        for &p in &priorities {
            registry.register(p, recorder(&log, p)).unwrap();
        }

        registry.dispatch(&mut event()).unwrap();

        let mut expected = priorities.clone();
        expected.sort_unstable();
        assert_eq!(*log.lock().unwrap(), expected);
        assert_eq!(registry.priorities(), expected);
    }

    #[test]
    fn test_conflict_keeps_existing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.register(5, recorder(&log, 1)).unwrap();

        let err = registry.register(5, recorder(&log, 2)).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Conflict {
                priority: 5,
                existing: "step-1".to_string()
            }
        );
        assert_eq!(registry.len(), 1);

        registry.dispatch(&mut event()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_failure_aborts_remaining_handlers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.register(1, recorder(&log, 1)).unwrap();
        registry
            .register(2, handler_fn("fails", |_, _| Err(HandlerError::failed("no service"))))
            .unwrap();
        registry.register(3, recorder(&log, 3)).unwrap();

        let err = registry.dispatch(&mut event()).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Handler { priority: 2, ref handler, .. } if handler == "fails"
        ));
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_handlers_see_classification() {
        let seen = Arc::new(Mutex::new(None));
        let mut registry = HandlerRegistry::new();
        registry
            .register(1, handler_fn("classify", |event, _| {
                event.classify(Classification::Authorized)?;
                Ok(())
            }))
            .unwrap();
        {
            let seen = Arc::clone(&seen);
            registry
                .register(2, handler_fn("observe", move |event, _| {
                    *seen.lock().unwrap() = Some(event.classification());
                    Ok(())
                }))
                .unwrap();
        }

        let mut event = event();
        registry.dispatch(&mut event).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(Classification::Authorized));
        assert_eq!(event.classification(), Classification::Authorized);
    }

    #[test]
    fn test_leftover_entries_are_reported() {
        const LEFTOVER: SlotKey<u8> = SlotKey::new("leftover");
        let mut registry = HandlerRegistry::new();
        registry
            .register(1, handler_fn("leaky", |_, session| {
                session.put(&LEFTOVER, 1)?;
                Ok(())
            }))
            .unwrap();

        let err = registry.dispatch(&mut event()).unwrap_err();
        assert!(matches!(err, DispatchError::LeakedEntries(ref names) if names == &["leftover"]));
    }

    #[test]
    fn test_empty_registry_dispatches() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.ordered().is_empty());
        registry.dispatch(&mut event()).unwrap();
    }
}
