use super::MEDIA_CONFIG;
use bandgate_core::{Classification, Event};
use bandgate_dispatch::{Handler, HandlerResult, Session};
use bandgate_network::{Authorization, Authorizer};
use std::sync::Arc;
use tracing::trace;

/// Classifies the event by asking the authorizer for the configured
/// permission. A grant leaves its media config in the session.
pub struct Authorize {
    authorizer: Arc<dyn Authorizer>,
    permission: String,
}

impl Authorize {
    pub fn new(authorizer: Arc<dyn Authorizer>, permission: impl Into<String>) -> Self {
        Self {
            authorizer,
            permission: permission.into(),
        }
    }
}

impl Handler for Authorize {
    fn handle(&self, event: &mut Event, session: &mut Session) -> HandlerResult {
        trace!(uid = %event.uid(), permission = %self.permission, "Authorizing");
        match self.authorizer.authorize(event.uid(), &self.permission) {
            Authorization::Granted(config) => {
                event.classify(Classification::Authorized)?;
                session.put(&MEDIA_CONFIG, config)?;
            }
            Authorization::Denied => event.classify(Classification::Unauthorized)?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "authorize"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandgate_core::Uid;
    use bandgate_network::MediaConfig;

    struct Fixed(Authorization);

    impl Authorizer for Fixed {
        fn authorize(&self, _uid: &Uid, _permission: &str) -> Authorization {
            self.0.clone()
        }
    }

    #[test]
    fn test_grant_stores_media_config() {
        let handler = Authorize::new(Arc::new(Fixed(Authorization::Granted(MediaConfig::default()))), "Open Door");
        let mut event = Event::new("AB".parse().unwrap());
        let mut session = Session::new();

        handler.handle(&mut event, &mut session).unwrap();

        assert_eq!(event.classification(), Classification::Authorized);
        assert_eq!(session.take(&MEDIA_CONFIG), Some(MediaConfig::default()));
    }

    #[test]
    fn test_denial_leaves_session_empty() {
        let handler = Authorize::new(Arc::new(Fixed(Authorization::Denied)), "Open Door");
        let mut event = Event::new("AB".parse().unwrap());
        let mut session = Session::new();

        handler.handle(&mut event, &mut session).unwrap();

        assert_eq!(event.classification(), Classification::Unauthorized);
        assert!(session.is_empty());
    }

    #[test]
    fn test_already_classified_event_is_rejected() {
        let handler = Authorize::new(Arc::new(Fixed(Authorization::Denied)), "Open Door");
        let mut event = Event::new("AB".parse().unwrap());
        event.classify(Classification::Authorized).unwrap();

        assert!(handler.handle(&mut event, &mut Session::new()).is_err());
    }
}
