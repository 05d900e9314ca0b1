//! Host function objects
//!
//! Materialized static functions and functions created through
//! [`HostContext::make_function`](crate::bridge::HostContext::make_function)
//! are [`CallbackFunction`]s. Invoking one releases the runtime lock exactly
//! like an object callout.

use std::sync::Arc;
use tracing::trace;

use crate::bridge::{ValueRef, marshal_arguments, raise_host_exception};
use crate::class::{CallAsFunctionCallback, CallAsFunctionCallbackEx, ClassRef, Versioned};
use crate::object::JsObject;
use crate::runtime::ExecState;
use crate::static_table::StaticCall;
use crate::string::JsString;
use crate::value::Value;

/// Callback bound into a function, with its class for extended callbacks
#[derive(Clone)]
enum Binding {
    Legacy(CallAsFunctionCallback),
    Extended(CallAsFunctionCallbackEx, ClassRef),
}

/// A callable backed by a native callback
pub struct CallbackFunction {
    name: Arc<JsString>,
    binding: Binding,
    base: JsObject,
}

impl CallbackFunction {
    /// Create a function from a legacy callback
    pub fn legacy(name: Arc<JsString>, callback: CallAsFunctionCallback) -> FunctionRef {
        Self::with_binding(name, Binding::Legacy(callback))
    }

    /// Create a function from an extended callback defined by `class`
    pub fn extended(
        name: Arc<JsString>,
        callback: CallAsFunctionCallbackEx,
        class: &ClassRef,
    ) -> FunctionRef {
        Self::with_binding(name, Binding::Extended(callback, class.clone()))
    }

    pub(crate) fn from_static(name: Arc<JsString>, call: &StaticCall, class: &ClassRef) -> FunctionRef {
        match call {
            Versioned::Legacy(f) => Self::legacy(name, f.clone()),
            Versioned::Extended(f) => Self::extended(name, f.clone(), class),
        }
    }

    fn with_binding(name: Arc<JsString>, binding: Binding) -> FunctionRef {
        FunctionRef(Arc::new(Self {
            name,
            binding,
            base: JsObject::new(),
        }))
    }

    /// Function name
    pub fn name(&self) -> &Arc<JsString> {
        &self.name
    }

    /// Class that defined an extended callback
    pub fn class(&self) -> Option<&ClassRef> {
        match &self.binding {
            Binding::Legacy(_) => None,
            Binding::Extended(_, class) => Some(class),
        }
    }

    /// Own-property storage of the function object
    pub fn base(&self) -> &JsObject {
        &self.base
    }
}

impl std::fmt::Debug for CallbackFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackFunction")
            .field("name", &self.name.as_str())
            .field("class", &self.class().map(|c| c.name()))
            .finish()
    }
}

/// Shared handle to a [`CallbackFunction`]; compares by identity
#[derive(Clone, Debug)]
pub struct FunctionRef(Arc<CallbackFunction>);

impl FunctionRef {
    /// Identity comparison
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Invoke the callback with the lock released
    ///
    /// A host exception is left pending on `exec` and `undefined` returned.
    pub fn call(&self, exec: &mut ExecState, this: &Value, args: &[Value]) -> Value {
        let ctx = exec.host_context();
        let callee = ValueRef::new(Value::function(self.clone()));
        let this = ValueRef::new(this.clone());
        let args = marshal_arguments(args);
        let mut exception = None;

        trace!(function = self.name.as_str(), "Calling host function");
        let result = {
            let _unlocked = exec.runtime().drop_all_locks();
            match &self.binding {
                Binding::Legacy(f) => f(&ctx, &callee, &this, &args, &mut exception),
                Binding::Extended(f, class) => f(&ctx, class, &callee, &this, &args, &mut exception),
            }
        };

        if raise_host_exception(exec, exception) {
            return Value::undefined();
        }
        result.into_value()
    }
}

impl std::ops::Deref for FunctionRef {
    type Target = CallbackFunction;

    fn deref(&self) -> &CallbackFunction {
        &self.0
    }
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl Eq for FunctionRef {}
