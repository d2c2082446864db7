//! Uniform response envelope returned by every public operation.
//!
//! Both engines hand results back in the same JSON shape:
//! `{"success": true, "result": …}` on success and
//! `{"success": false, "error": "…"}` on failure. Exactly one of
//! `result`/`error` is present, selected by `success`. The enum makes the
//! invariant structural rather than a convention over an open map.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;

/// Result of a catalog or registry operation.
///
/// Serializes to the two-key JSON contract described in the module docs.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// The operation succeeded; `result` carries its payload (possibly
    /// `Value::Null` for operations with nothing to report).
    Success { result: Value },

    /// The operation failed in an expected, reportable way.
    Failure { error: String },
}

impl Envelope {
    /// Build a success envelope from any JSON-convertible payload.
    pub fn ok(result: impl Into<Value>) -> Self {
        Envelope::Success {
            result: result.into(),
        }
    }

    /// Build a failure envelope from an error message.
    pub fn err(message: impl Into<String>) -> Self {
        Envelope::Failure {
            error: message.into(),
        }
    }

    /// True for the success shape.
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    /// The success payload, if any.
    pub fn result(&self) -> Option<&Value> {
        match self {
            Envelope::Success { result } => Some(result),
            Envelope::Failure { .. } => None,
        }
    }

    /// The failure message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Envelope::Success { .. } => None,
            Envelope::Failure { error } => Some(error),
        }
    }
}

impl Serialize for Envelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Envelope", 2)?;
        match self {
            Envelope::Success { result } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("result", result)?;
            }
            Envelope::Failure { error } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}
