//! Host-facing handles and the re-entry surface
//!
//! Host callbacks never see [`Value`] or [`ExecState`] directly. They receive
//! ABI-facing handles ([`ValueRef`], [`HostString`], [`PropertyNameAccumulator`])
//! and a [`HostContext`] through which they may call back into the runtime.
//! Exceptions travel out of callbacks through an `&mut Option<ValueRef>`
//! out-parameter.

use smallvec::SmallVec;
use std::sync::Arc;
use tracing::trace;

use crate::callback_object::ObjectRef;
use crate::class::ClassRef;
use crate::error::{CallbackError, CallbackResult};
use crate::function::{CallbackFunction, FunctionRef};
use crate::runtime::{ExecState, Runtime};
use crate::string::JsString;
use crate::value::Value;

/// Argument array handed to host callbacks
pub type Arguments = SmallVec<[ValueRef; 16]>;

/// Opaque value handle passed across the host boundary
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueRef(Value);

impl ValueRef {
    /// Wrap a managed value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// `undefined`
    pub fn undefined() -> Self {
        Self(Value::undefined())
    }

    /// `null`
    pub fn null() -> Self {
        Self(Value::null())
    }

    /// Number
    pub fn number(n: f64) -> Self {
        Self(Value::number(n))
    }

    /// Boolean
    pub fn boolean(b: bool) -> Self {
        Self(Value::boolean(b))
    }

    /// String
    pub fn string(s: &str) -> Self {
        Self(Value::string(s))
    }

    /// Object
    pub fn object(obj: &ObjectRef) -> Self {
        Self(Value::object(obj.clone()))
    }

    /// Borrow the managed value
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap the managed value
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Number, if this is one
    pub fn as_number(&self) -> Option<f64> {
        self.0.as_number()
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_string().map(|s| s.as_str())
    }

    /// Host object, if this is one
    pub fn as_object(&self) -> Option<&ObjectRef> {
        self.0.as_object()
    }

    /// Check for `undefined`
    pub fn is_undefined(&self) -> bool {
        self.0.is_undefined()
    }
}

impl From<Value> for ValueRef {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<ValueRef> for Value {
    fn from(value: ValueRef) -> Self {
        value.0
    }
}

/// Immutable property-name string handed to host callbacks
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HostString(Arc<JsString>);

impl HostString {
    /// Create from a Rust string (interned)
    pub fn new(s: &str) -> Self {
        Self(JsString::intern(s))
    }

    /// Wrap an interned name
    pub fn from_name(name: &Arc<JsString>) -> Self {
        Self(name.clone())
    }

    /// The string contents
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The interned name
    pub fn name(&self) -> &Arc<JsString> {
        &self.0
    }
}

impl std::fmt::Display for HostString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for HostString {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for HostString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Collector that enumeration callbacks append names to
///
/// Names are kept in append order; duplicates are not removed here.
pub struct PropertyNameAccumulator<'a> {
    names: &'a mut Vec<Arc<JsString>>,
}

impl<'a> PropertyNameAccumulator<'a> {
    pub(crate) fn new(names: &'a mut Vec<Arc<JsString>>) -> Self {
        Self { names }
    }

    /// Append a name
    pub fn add(&mut self, name: &HostString) {
        self.names.push(name.0.clone());
    }

    /// Append a name from a Rust string
    pub fn add_str(&mut self, name: &str) {
        self.names.push(JsString::intern(name));
    }

    /// Names collected so far, across every contributor
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check whether nothing has been collected yet
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Marshal an argument list into host-facing handles
pub(crate) fn marshal_arguments(args: &[Value]) -> Arguments {
    args.iter().cloned().map(ValueRef::new).collect()
}

/// Record a host exception, if one was reported, as the pending exception
pub(crate) fn raise_host_exception(exec: &mut ExecState, exception: Option<ValueRef>) -> bool {
    match exception {
        Some(exception) => {
            exec.throw(exception.into_value());
            true
        }
        None => false,
    }
}

/// Handle through which host callbacks re-enter the runtime
///
/// Every entry point reacquires the runtime lock, runs in a fresh
/// [`ExecState`], and turns an exception left pending by the operation into
/// `Err`. Nesting is bounded by [`RuntimeConfig::max_native_depth`](crate::RuntimeConfig).
#[derive(Clone, Debug)]
pub struct HostContext {
    runtime: Runtime,
    depth: usize,
}

impl HostContext {
    pub(crate) fn new(runtime: Runtime, depth: usize) -> Self {
        Self { runtime, depth }
    }

    /// The runtime
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Nesting depth of this context
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn enter(&self) -> CallbackResult<ExecState> {
        let limit = self.runtime.config().max_native_depth;
        if self.depth > limit {
            return Err(CallbackError::NativeDepthExceeded { limit });
        }
        trace!(depth = self.depth, "Host re-entering runtime");
        Ok(ExecState::new(self.runtime.clone(), self.depth))
    }

    fn finish<T>(mut exec: ExecState, result: T) -> CallbackResult<T> {
        exec.check()?;
        Ok(result)
    }

    /// Read a property through the full dispatch path
    pub fn get_property(&self, object: &ObjectRef, name: &str) -> CallbackResult<ValueRef> {
        let mut exec = self.enter()?;
        let value = object.get(&mut exec, name);
        Self::finish(exec, ValueRef::new(value))
    }

    /// Write a property through the full dispatch path
    pub fn set_property(
        &self,
        object: &ObjectRef,
        name: &str,
        value: &ValueRef,
    ) -> CallbackResult<bool> {
        let mut exec = self.enter()?;
        let written = object.set(&mut exec, name, value.value().clone());
        Self::finish(exec, written)
    }

    /// Check for a property through the full dispatch path
    pub fn has_property(&self, object: &ObjectRef, name: &str) -> CallbackResult<bool> {
        let mut exec = self.enter()?;
        let found = object.has(&mut exec, name);
        Self::finish(exec, found)
    }

    /// Delete a property through the full dispatch path
    pub fn delete_property(&self, object: &ObjectRef, name: &str) -> CallbackResult<bool> {
        let mut exec = self.enter()?;
        let deleted = object.delete(&mut exec, name);
        Self::finish(exec, deleted)
    }

    /// Call any callable value
    pub fn call_as_function(
        &self,
        callee: &ValueRef,
        this: &ValueRef,
        args: &[ValueRef],
    ) -> CallbackResult<ValueRef> {
        let mut exec = self.enter()?;
        let args: Vec<Value> = args.iter().map(|a| a.value().clone()).collect();
        let result = crate::dispatch::call_value(&mut exec, callee.value(), this.value(), &args);
        Self::finish(exec, ValueRef::new(result))
    }

    /// Construct through an object's `callAsConstructor` chain
    pub fn call_as_constructor(
        &self,
        constructor: &ObjectRef,
        args: &[ValueRef],
    ) -> CallbackResult<ValueRef> {
        let mut exec = self.enter()?;
        let args: Vec<Value> = args.iter().map(|a| a.value().clone()).collect();
        let result = crate::dispatch::construct_value(&mut exec, constructor, &args);
        Self::finish(exec, ValueRef::new(result))
    }

    /// Create an instance of `class`, running its initialize pass
    pub fn make_object(
        &self,
        class: &ClassRef,
        data: *mut std::ffi::c_void,
    ) -> CallbackResult<ObjectRef> {
        let mut exec = self.enter()?;
        let object = ObjectRef::create(&mut exec, class, data);
        Self::finish(exec, object)
    }

    /// Create a host function from a legacy callback
    pub fn make_function(
        &self,
        name: &str,
        callback: impl Fn(&HostContext, &ValueRef, &ValueRef, &[ValueRef], &mut Option<ValueRef>) -> ValueRef
            + Send
            + Sync
            + 'static,
    ) -> FunctionRef {
        CallbackFunction::legacy(JsString::intern(name), Arc::new(callback))
    }

    /// Create an error object suitable for the exception out-parameter
    pub fn make_error(&self, kind: &str, message: &str) -> CallbackResult<ValueRef> {
        let mut exec = self.enter()?;
        let error = exec.make_error(kind, message);
        Ok(ValueRef::new(error))
    }

    /// Turn an error from a re-entry helper into a value for the exception out-parameter
    pub fn exception_value(&self, error: &CallbackError) -> ValueRef {
        if let Some(value) = error.thrown_value() {
            return ValueRef::new(value.clone());
        }
        let mut exec = ExecState::new(self.runtime.clone(), self.depth);
        ValueRef::new(exec.error_value(error))
    }
}
