use bandgate_core::{Classification, Event};
use bandgate_dispatch::{Handler, HandlerResult, Session};
use tracing::{debug, error, info, warn};

/// Last step of every pass: logs how the scan was classified.
pub struct Logging {
    permission: String,
}

impl Logging {
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
        }
    }
}

impl Handler for Logging {
    fn handle(&self, event: &mut Event, _session: &mut Session) -> HandlerResult {
        debug!(id = %event.id(), "{event}");
        match event.classification() {
            Classification::Unknown => error!(uid = %event.uid(), "Scan was never classified"),
            Classification::Authorized => {
                info!(uid = %event.uid(), "{} was authorized for '{}'", event.uid(), self.permission);
            }
            Classification::Unauthorized => {
                warn!(uid = %event.uid(), "{} was NOT authorized for '{}'", event.uid(), self.permission);
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "logging"
    }
}
