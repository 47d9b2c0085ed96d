//! Routing of inbound push messages.

use crate::message::{BuiltIn, Presentation, PushMessage};
use crate::registry::PushRegistry;
use mobilestack_client::ExecutionContext;
use std::sync::Arc;
use tracing::{debug, info};

/// Application hook that sees every message not rendered by the platform,
/// whether or not any transient callback is registered.
pub trait PushHandler: Send + Sync {
    fn on_push_message(&self, message: &PushMessage);
}

/// What became of a routed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// The platform should render this built-in presentation.
    Render(BuiltIn),
    /// Handed to subscribers; inline or posted to the router's context.
    Delivered,
}

/// Decides, per message, between platform rendering and application
/// delivery.
pub struct PushRouter {
    registry: Arc<PushRegistry>,
    handler: Option<Arc<dyn PushHandler>>,
    context: Option<Arc<dyn ExecutionContext>>,
}

impl PushRouter {
    pub fn new(registry: Arc<PushRegistry>) -> Self {
        Self {
            registry,
            handler: None,
            context: None,
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn PushHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Delivers application messages on `context` instead of the routing
    /// thread.
    pub fn with_context(mut self, context: Arc<dyn ExecutionContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn route(&self, message: PushMessage) -> Routed {
        match message.presentation() {
            Presentation::BuiltIn(built_in) => {
                debug!(?built_in, "rendering built-in push message");
                return Routed::Render(built_in);
            }
            Presentation::Unrecognized(kind) => {
                info!(%kind, "unrecognized built-in push type, delivering to application");
            }
            Presentation::Custom => {}
        }

        let registry = self.registry.clone();
        let handler = self.handler.clone();
        let deliver = move || {
            let invoked = registry.dispatch(&message);
            if let Some(handler) = handler {
                handler.on_push_message(&message);
            }
            debug!(callbacks = invoked, "push message delivered");
        };

        match &self.context {
            Some(context) => context.post(Box::new(deliver)),
            None => deliver(),
        }
        Routed::Delivered
    }
}
