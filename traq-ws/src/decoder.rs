//! Frame decoding and handler dispatch.
//!
//! `decode` turns an already-parsed JSON value into an [`Event`];
//! `decode_and_dispatch` additionally runs the registered handler for the
//! event's kind, if there is one, and hands the event back either way.

use std::panic::{self, AssertUnwindSafe};

use serde_json::{Map, Value};
use tracing::{error, trace};

use traq_core::DecodeError;

use crate::events::{Event, EventKind};
use crate::registry::HandlerRegistry;

/// Parse frame text into a JSON value.
pub fn decode_frame(text: &str) -> Result<Value, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

/// Classify a raw payload into a typed event.
///
/// The payload must be an object with a known string `type` and an object
/// `body`. Any other top-level fields are ignored. The body is moved into
/// the event untouched.
pub fn decode(raw: Value) -> Result<Event, DecodeError> {
    let mut fields: Map<String, Value> = match raw {
        Value::Object(fields) => fields,
        _ => return Err(DecodeError::NotAnObject),
    };

    let kind = match fields.get("type") {
        Some(Value::String(name)) => name.parse::<EventKind>()?,
        _ => return Err(DecodeError::MissingType),
    };

    let body = fields
        .remove("body")
        .ok_or_else(|| DecodeError::MissingBody(kind.as_str().to_string()))?;
    if !body.is_object() {
        return Err(DecodeError::BodyShape {
            kind: kind.as_str().to_string(),
            reason: format!("expected an object, got {}", json_type_name(&body)),
        });
    }

    Ok(Event { kind, body })
}

/// Decode `raw` and invoke the handler registered for its kind.
///
/// Unregistered kinds are a silent no-op. A handler that panics is logged
/// and does not affect the caller. The decoded event is returned whether or
/// not a handler ran.
pub fn decode_and_dispatch(raw: Value, registry: &HandlerRegistry) -> Result<Event, DecodeError> {
    let event = decode(raw)?;

    match registry.get(event.kind) {
        Some(handler) => {
            let body = event.body.clone();
            if panic::catch_unwind(AssertUnwindSafe(|| handler(body))).is_err() {
                error!(kind = %event.kind, "event handler panicked");
            }
        }
        None => trace!(kind = %event.kind, "no handler registered"),
    }

    Ok(event)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
