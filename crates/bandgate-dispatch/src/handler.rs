//! The unit of work in a pass.

use crate::error::HandlerResult;
use crate::session::Session;
use bandgate_core::Event;
use std::fmt;

/// One step of the handler chain.
///
/// Handlers run on a blocking thread, one after another in priority order,
/// and may block for as long as their step needs. Work that should overlap
/// with later steps goes through [`Session::start_async`].
pub trait Handler: Send + Sync {
    /// Process one event.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining handlers of the pass.
    fn handle(&self, event: &mut Event, session: &mut Session) -> HandlerResult;

    /// Name used in logs and registration conflicts.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Handler built from a closure by [`handler_fn`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a named [`Handler`].
///
/// # Examples
///
/// ```
/// use bandgate_dispatch::{HandlerRegistry, handler_fn};
/// use bandgate_core::Classification;
///
/// let mut registry = HandlerRegistry::new();
/// registry
///     .register(
///         1,
///         handler_fn("deny_all", |event, _session| {
///             event.classify(Classification::Unauthorized)?;
///             Ok(())
///         }),
///     )
///     .unwrap();
/// ```
pub fn handler_fn<F>(name: impl Into<String>, f: F) -> FnHandler<F>
where
    F: Fn(&mut Event, &mut Session) -> HandlerResult + Send + Sync,
{
    FnHandler {
        name: name.into(),
        f,
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut Event, &mut Session) -> HandlerResult + Send + Sync,
{
    fn handle(&self, event: &mut Event, session: &mut Session) -> HandlerResult {
        (self.f)(event, session)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}
