//! Runtime handle and per-dispatch execution state.
//!
//! A [`Runtime`] owns the runtime-wide lock, the configuration and the
//! finalization bookkeeping. An [`ExecState`] is the caller's context for a
//! dispatch: it holds one level of the lock and the pending exception slot
//! that host exceptions are raised into.

use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::{Arc, LazyLock};
use std::thread::{self, ThreadId};

use crate::bridge::HostContext;
use crate::callback_object::{ObjectRef, TypeInfo};
use crate::class::{ClassDefinition, ClassRef};
use crate::config::RuntimeConfig;
use crate::error::{CallbackError, CallbackResult};
use crate::lock::{DropAllLocks, RuntimeLock, RuntimeLockGuard};
use crate::object::PropertyAttributes;
use crate::string::JsString;
use crate::value::Value;

static ERROR_CLASS: LazyLock<ClassRef> = LazyLock::new(|| ClassDefinition::plain("Error"));

/// Object currently running its finalize pass on `thread`
#[derive(Debug, Clone)]
struct FinalizingEntry {
    thread: ThreadId,
    address: usize,
    captured: Option<TypeInfo>,
}

struct RuntimeInner {
    lock: RuntimeLock,
    config: RuntimeConfig,
    finalizing: Mutex<SmallVec<[FinalizingEntry; 2]>>,
}

/// Shared runtime handle
///
/// Cheap to clone; every clone refers to the same lock and configuration.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with default configuration
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                lock: RuntimeLock::new(),
                config,
                finalizing: Mutex::new(SmallVec::new()),
            }),
        }
    }

    /// Acquire the runtime lock and open an execution state
    pub fn enter(&self) -> ExecState {
        ExecState::new(self.clone(), 0)
    }

    /// The runtime-wide lock
    pub fn lock(&self) -> &RuntimeLock {
        &self.inner.lock
    }

    /// Release the runtime lock for the duration of a host call
    pub fn drop_all_locks(&self) -> DropAllLocks {
        self.inner.lock.drop_all_locks()
    }

    /// Get config
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Type info of the innermost object being finalized by the current thread
    pub fn currently_finalizing(&self) -> Option<TypeInfo> {
        let me = thread::current().id();
        self.inner
            .finalizing
            .lock()
            .iter()
            .rev()
            .find(|entry| entry.thread == me)
            .and_then(|entry| entry.captured.clone())
    }

    /// Check whether the object at `address` is being finalized
    pub fn is_finalizing(&self, address: usize) -> bool {
        self.inner
            .finalizing
            .lock()
            .iter()
            .any(|entry| entry.address == address)
    }

    /// Check whether two handles share one runtime
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn begin_finalizing(
        &self,
        address: usize,
        captured: Option<TypeInfo>,
    ) -> FinalizingScope<'_> {
        let thread = thread::current().id();
        self.inner.finalizing.lock().push(FinalizingEntry {
            thread,
            address,
            captured,
        });
        FinalizingScope {
            runtime: self,
            thread,
            address,
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Pops the finalizing record on drop
pub(crate) struct FinalizingScope<'a> {
    runtime: &'a Runtime,
    thread: ThreadId,
    address: usize,
}

impl Drop for FinalizingScope<'_> {
    fn drop(&mut self) {
        let mut finalizing = self.runtime.inner.finalizing.lock();
        if let Some(pos) = finalizing
            .iter()
            .rposition(|e| e.thread == self.thread && e.address == self.address)
        {
            finalizing.remove(pos);
        }
    }
}

/// Caller's execution context for a dispatch
///
/// Holds one level of the runtime lock for its whole lifetime. Exceptions
/// raised by host callbacks are stored here and stay pending until taken
/// or converted by [`check`](Self::check).
pub struct ExecState {
    runtime: Runtime,
    exception: Option<Value>,
    native_depth: usize,
    _guard: RuntimeLockGuard,
}

impl ExecState {
    pub(crate) fn new(runtime: Runtime, native_depth: usize) -> Self {
        let guard = runtime.lock().lock();
        Self {
            runtime,
            exception: None,
            native_depth,
            _guard: guard,
        }
    }

    /// The runtime this state belongs to
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Get config
    pub fn config(&self) -> &RuntimeConfig {
        self.runtime.config()
    }

    /// Nesting depth of host re-entry for this state
    pub fn native_depth(&self) -> usize {
        self.native_depth
    }

    /// Raise an exception in this context, replacing any pending one
    pub fn throw(&mut self, value: Value) {
        self.exception = Some(value);
    }

    /// Raise a new error object of the given kind
    pub fn throw_error(&mut self, kind: &str, message: &str) {
        let error = self.make_error(kind, message);
        self.throw(error);
    }

    /// Raise a TypeError
    pub fn throw_type_error(&mut self, message: &str) {
        self.throw_error("TypeError", message);
    }

    /// Raise a ReferenceError
    pub fn throw_reference_error(&mut self, message: &str) {
        self.throw_error("ReferenceError", message);
    }

    /// Pending exception, if any
    pub fn exception(&self) -> Option<&Value> {
        self.exception.as_ref()
    }

    /// Check for a pending exception
    pub fn has_exception(&self) -> bool {
        self.exception.is_some()
    }

    /// Take the pending exception
    pub fn take_exception(&mut self) -> Option<Value> {
        self.exception.take()
    }

    /// Convert a pending exception into an error
    pub fn check(&mut self) -> CallbackResult<()> {
        match self.exception.take() {
            Some(value) => Err(CallbackError::exception(value)),
            None => Ok(()),
        }
    }

    /// Create an error object with `name` and `message` properties
    pub fn make_error(&mut self, kind: &str, message: &str) -> Value {
        let error = ObjectRef::create(self, &ERROR_CLASS, std::ptr::null_mut());
        let hidden = PropertyAttributes::DONT_ENUM;
        error
            .base()
            .put_direct(JsString::intern("name"), Value::string(kind), hidden);
        error
            .base()
            .put_direct(JsString::intern("message"), Value::string(message), hidden);
        Value::object(error)
    }

    /// Turn an error into a managed value suitable for throwing
    pub fn error_value(&mut self, error: &CallbackError) -> Value {
        match error.thrown_value() {
            Some(value) => value.clone(),
            None => self.make_error(error.error_kind(), &error.to_string()),
        }
    }

    /// Context handed to host callbacks invoked from this state
    pub fn host_context(&self) -> HostContext {
        HostContext::new(self.runtime.clone(), self.native_depth + 1)
    }
}

impl std::fmt::Debug for ExecState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecState")
            .field("exception", &self.exception)
            .field("native_depth", &self.native_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_holds_lock() {
        let runtime = Runtime::new();
        {
            let _exec = runtime.enter();
            assert!(runtime.lock().is_held_by_current_thread());
        }
        assert!(!runtime.lock().is_held_by_current_thread());
    }

    #[test]
    fn test_pending_exception_check() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        assert!(exec.check().is_ok());

        exec.throw(Value::string("boom"));
        assert!(exec.has_exception());
        let err = exec.check().unwrap_err();
        assert_eq!(err.thrown_value(), Some(&Value::string("boom")));
        assert!(!exec.has_exception());
    }

    #[test]
    fn test_make_error_message() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        exec.throw_type_error("bad thing");
        let err = exec.check().unwrap_err();
        assert_eq!(err.to_string(), "Uncaught exception: TypeError: bad thing");
    }

    #[test]
    fn test_error_value_passes_thrown_through() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let thrown = Value::from(7);
        let err = CallbackError::exception(thrown.clone());
        assert_eq!(exec.error_value(&err), thrown);
    }
}
