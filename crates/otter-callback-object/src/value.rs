//! Managed values seen by the dispatcher
//!
//! This is the minimal value model the dispatch layer needs: primitives,
//! interned strings, host objects and host functions. Objects and functions
//! compare by identity.

use std::sync::Arc;

use crate::callback_object::ObjectRef;
use crate::function::FunctionRef;
use crate::string::JsString;

/// A managed value
#[derive(Clone, Default)]
pub enum Value {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// Boolean primitive
    Boolean(bool),
    /// Number primitive
    Number(f64),
    /// String primitive
    String(Arc<JsString>),
    /// Host object backed by a class chain
    Object(ObjectRef),
    /// Callable function object
    Function(FunctionRef),
}

/// Type tag of a value, as reported to host code
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsType {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Boolean,
    /// Number
    Number,
    /// String
    String,
    /// Object (including functions)
    Object,
}

/// Hint passed to `convertToType`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferredType {
    /// Prefer a string result
    String,
    /// Prefer a number result
    Number,
}

impl PreferredType {
    /// The type tag handed to host conversion callbacks
    pub fn as_js_type(self) -> JsType {
        match self {
            Self::String => JsType::String,
            Self::Number => JsType::Number,
        }
    }
}

impl Value {
    /// Create `undefined`
    #[inline]
    pub const fn undefined() -> Self {
        Self::Undefined
    }

    /// Create `null`
    #[inline]
    pub const fn null() -> Self {
        Self::Null
    }

    /// Create a boolean
    #[inline]
    pub const fn boolean(b: bool) -> Self {
        Self::Boolean(b)
    }

    /// Create a number
    #[inline]
    pub const fn number(n: f64) -> Self {
        Self::Number(n)
    }

    /// Create an interned string
    pub fn string(s: &str) -> Self {
        Self::String(JsString::intern(s))
    }

    /// Wrap an object
    pub fn object(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }

    /// Wrap a function
    pub fn function(func: FunctionRef) -> Self {
        Self::Function(func)
    }

    /// Type tag of this value
    pub fn js_type(&self) -> JsType {
        match self {
            Self::Undefined => JsType::Undefined,
            Self::Null => JsType::Null,
            Self::Boolean(_) => JsType::Boolean,
            Self::Number(_) => JsType::Number,
            Self::String(_) => JsType::String,
            Self::Object(_) | Self::Function(_) => JsType::Object,
        }
    }

    /// Check for `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Check for `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check for an object or function
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Function(_))
    }

    /// Get the boolean, if this is one
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the number, if this is one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the string, if this is one
    pub fn as_string(&self) -> Option<&Arc<JsString>> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the host object, if this is one
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get the function, if this is one
    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Self::Function(func) => Some(func),
            _ => None,
        }
    }

    /// SameValue-style comparison; objects and functions compare by identity
    pub fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => {
                (a.is_nan() && b.is_nan()) || (a == b && a.is_sign_negative() == b.is_sign_negative())
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => ObjectRef::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => FunctionRef::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{:?}", s.as_str()),
            Self::Object(obj) => write!(f, "[object {}]", obj.class_name()),
            Self::Function(func) => write!(f, "[function {}]", func.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_equality() {
        assert_eq!(Value::undefined(), Value::Undefined);
        assert_eq!(Value::from(1), Value::number(1.0));
        assert_eq!(Value::number(f64::NAN), Value::number(f64::NAN));
        assert_ne!(Value::number(0.0), Value::number(-0.0));
        assert_eq!(Value::from("x"), Value::string("x"));
        assert_ne!(Value::null(), Value::undefined());
    }

    #[test]
    fn test_js_type() {
        assert_eq!(Value::boolean(true).js_type(), JsType::Boolean);
        assert_eq!(Value::string("s").js_type(), JsType::String);
        assert_eq!(PreferredType::Number.as_js_type(), JsType::Number);
    }
}
