//! Intent dispatch — a fixed handler table over the dialogue-bus seam.
//!
//! The table is built once at construction and never mutated afterwards.
//! Each recognized-intent event is routed by exact name match; an intent
//! with no registered handler is ignored, so a skill stays forward
//! compatible with intents this build does not yet answer.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dialogue::{DialogueApi, IntentMessage};
use crate::error::AppError;

/// An intent handler: a plain function or closure over the explicit bus
/// handle.  Handlers run synchronously with event delivery — the next event
/// is not dispatched until the handler returns.
pub type IntentHandler =
    Box<dyn Fn(&dyn DialogueApi, &IntentMessage) -> Result<(), AppError> + Send + Sync>;

/// Routes recognized-intent events to their handlers.
pub struct Dispatcher {
    api: Arc<dyn DialogueApi>,
    table: HashMap<String, IntentHandler>,
}

impl Dispatcher {
    /// Build the dispatcher with its fixed handler table.
    ///
    /// # Panics
    ///
    /// Panics if two handlers are registered under the same intent name — a
    /// programming error that must be caught before the run loop starts.
    pub fn new(api: Arc<dyn DialogueApi>, handlers: Vec<(&str, IntentHandler)>) -> Self {
        let mut table: HashMap<String, IntentHandler> = HashMap::new();
        for (name, handler) in handlers {
            if table.insert(name.to_string(), handler).is_some() {
                panic!("duplicate intent handler registered: {name:?}");
            }
        }

        let mut names: Vec<&str> = table.keys().map(String::as_str).collect();
        names.sort_unstable();
        info!(intents = ?names, "dispatcher ready");

        Self { api, table }
    }

    /// Route one event to its handler.
    ///
    /// Unknown intent names produce no action and no error.  A handler
    /// failure is logged and does not stop the dispatch loop.
    pub fn dispatch(&self, msg: &IntentMessage) {
        let name = msg.intent.intent_name.as_str();
        match self.table.get(name) {
            Some(handler) => {
                debug!(intent = name, session = %msg.session_id, "routing intent");
                if let Err(e) = handler(self.api.as_ref(), msg) {
                    warn!(intent = name, "handler failed: {e}");
                }
            }
            None => {
                debug!(intent = name, "no handler registered — ignoring");
            }
        }
    }
}
