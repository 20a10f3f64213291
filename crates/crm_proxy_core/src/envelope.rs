use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NO_SERVICE_MESSAGE: &str = "Ningun servicio utilizado";
pub const NO_SERVICE_FUNCTION: &str = "handler";

/// Uniform reply shape for every invocation, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyEnvelope {
    pub error: bool,
    pub message: String,
    pub payload: Value,
    pub function: String,
}

impl ReplyEnvelope {
    pub fn new(
        error: bool,
        message: impl Into<String>,
        payload: Value,
        function: impl Into<String>,
    ) -> Self {
        Self {
            error,
            message: message.into(),
            payload,
            function: function.into(),
        }
    }

    pub fn success(message: impl Into<String>, payload: Value, function: impl Into<String>) -> Self {
        Self::new(false, message, payload, function)
    }

    pub fn failure(message: impl Into<String>, payload: Value, function: impl Into<String>) -> Self {
        Self::new(true, message, payload, function)
    }

    /// Reply for an invocation that named no known service.
    pub fn no_service() -> Self {
        Self::failure(NO_SERVICE_MESSAGE, Value::Null, NO_SERVICE_FUNCTION)
    }
}
