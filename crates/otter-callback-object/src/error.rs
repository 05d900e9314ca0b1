//! Callback dispatch error types

use thiserror::Error;

use crate::value::Value;

/// Errors surfaced at Rust-level boundaries of the dispatch layer
///
/// Inside a dispatch, host exceptions live in the caller's
/// [`ExecState`](crate::runtime::ExecState) as a pending exception; they only
/// become a `CallbackError` when converted by [`ExecState::check`](crate::runtime::ExecState::check)
/// or a [`HostContext`](crate::bridge::HostContext) re-entry helper.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// A native callback signaled failure through its exception out-parameter
    #[error("Uncaught exception: {0}")]
    Exception(Box<ThrownValue>),

    /// Write rejected by a read-only attribute
    #[error("TypeError: Attempted to assign to readonly property '{name}'")]
    ReadOnly {
        /// Property name
        name: String,
    },

    /// Delete rejected by a don't-delete attribute
    #[error("TypeError: Unable to delete property '{name}'")]
    NonDeletable {
        /// Property name
        name: String,
    },

    /// Capability query and invocation scan disagree about a callback
    #[error("class chain of '{class}' reported {operation} support but no class provides it")]
    MissingCallback {
        /// The operation being invoked
        operation: &'static str,
        /// Leaf class name
        class: String,
    },

    /// A class definition mixed callback generations
    #[error("class '{class}' is {expected} but has a {found} callback")]
    GenerationMismatch {
        /// Class name
        class: String,
        /// Generation declared by the class
        expected: &'static str,
        /// Generation of the offending callback
        found: &'static str,
    },

    /// The same static name appears twice in one table
    #[error("class '{class}' defines static property '{name}' more than once")]
    DuplicateStaticName {
        /// Class name
        class: String,
        /// Duplicated property name
        name: String,
    },

    /// A static entry has an empty name
    #[error("class '{class}' defines a static property with an empty name")]
    InvalidStaticName {
        /// Class name
        class: String,
    },

    /// Host re-entry nested too deeply
    #[error("RangeError: Maximum native call depth ({limit}) exceeded")]
    NativeDepthExceeded {
        /// Configured limit
        limit: usize,
    },

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// A thrown managed value
#[derive(Debug)]
pub struct ThrownValue {
    /// The thrown value
    pub value: Value,
    /// Human-readable rendering of the value
    pub message: String,
}

impl std::fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl CallbackError {
    /// Create an exception from a thrown value
    pub fn exception(value: Value) -> Self {
        let message = describe_thrown(&value);
        Self::Exception(Box::new(ThrownValue { value, message }))
    }

    /// The thrown value, for `Exception` errors
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Self::Exception(thrown) => Some(&thrown.value),
            _ => None,
        }
    }

    /// Error constructor name used when this error is turned into a managed value
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::ReadOnly { .. } | Self::NonDeletable { .. } => "TypeError",
            Self::NativeDepthExceeded { .. } => "RangeError",
            _ => "Error",
        }
    }
}

/// Render a thrown value: error objects as `name: message`, others via Debug
fn describe_thrown(value: &Value) -> String {
    if let Some(s) = value.as_string() {
        return s.as_str().to_string();
    }
    if let Some(obj) = value.as_object() {
        let message = obj.base().get_own(&crate::string::JsString::intern("message"));
        let name = obj.base().get_own(&crate::string::JsString::intern("name"));
        if let (Some(Value::String(name)), Some(Value::String(message))) = (name, message) {
            return format!("{}: {}", name, message);
        }
    }
    format!("{:?}", value)
}

/// Result type for dispatch-layer operations
pub type CallbackResult<T> = std::result::Result<T, CallbackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_message_from_string() {
        let err = CallbackError::exception(Value::string("boom"));
        assert_eq!(err.to_string(), "Uncaught exception: boom");
        assert!(err.thrown_value().is_some());
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            CallbackError::ReadOnly { name: "x".into() }.error_kind(),
            "TypeError"
        );
        assert_eq!(
            CallbackError::NonDeletable { name: "x".into() }.error_kind(),
            "TypeError"
        );
        assert_eq!(
            CallbackError::NativeDepthExceeded { limit: 1 }.error_kind(),
            "RangeError"
        );
        assert_eq!(CallbackError::exception(Value::Null).error_kind(), "Error");
    }
}
