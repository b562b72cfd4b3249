//! Handler registry: at most one callback per event kind.
//!
//! The registry is created once per client and shared (by `Arc`) with every
//! connection the client opens, so handlers survive reconnects. Registration
//! may happen before or during `listen()`; dispatch only ever reads.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use traq_core::{TraqError, TraqResult};

use crate::events::{self, EventKind};

/// A registered event callback. Receives the event body by value.
pub type Handler = Arc<dyn Fn(Value) + Send + Sync>;

/// Mapping from event kind to its single handler.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<EventKind, Handler>>>,
}

impl HandlerRegistry {
    /// Create a registry holding only the built-in `ERROR` handler.
    pub fn new() -> Self {
        let mut handlers: HashMap<EventKind, Handler> = HashMap::new();
        handlers.insert(EventKind::Error, Arc::new(log_gateway_error));
        Self {
            handlers: Arc::new(RwLock::new(handlers)),
        }
    }

    /// Register `handler` for `kind`.
    ///
    /// Fails with [`TraqError::DuplicateHandler`] if `kind` already has one,
    /// including the built-in `ERROR` handler.
    pub fn register<F>(&self, kind: EventKind, handler: F) -> TraqResult<()>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(&kind) {
            return Err(TraqError::DuplicateHandler(kind.as_str().to_string()));
        }
        handlers.insert(kind, Arc::new(handler));
        debug!(%kind, "handler registered");
        Ok(())
    }

    /// Register a handler that receives the body as a typed payload.
    ///
    /// Bodies that do not deserialize into `T` are logged and skipped.
    pub fn register_payload<T, F>(&self, kind: EventKind, handler: F) -> TraqResult<()>
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.register(kind, move |body| match events::parse_body::<T>(kind, body) {
            Ok(payload) => handler(payload),
            Err(e) => warn!(%kind, error = %e, "skipping typed handler"),
        })
    }

    /// Look up the handler for `kind`.
    ///
    /// The returned handle is a clone, so the lock is not held while it runs.
    pub fn get(&self, kind: EventKind) -> Option<Handler> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }

    /// Whether `kind` has a handler.
    pub fn contains(&self, kind: EventKind) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&kind)
    }

    /// Number of registered handlers, the built-in one included.
    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Always false: the built-in `ERROR` handler is present from the start.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Built-in `ERROR` handler.
fn log_gateway_error(body: Value) {
    match body.get("message").and_then(Value::as_str) {
        Some(message) => error!("gateway reported an error: {message}"),
        None => error!(body = %body, "gateway reported an error"),
    }
}
