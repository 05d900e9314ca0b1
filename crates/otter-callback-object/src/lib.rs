//! # Otter Callback Object
//!
//! Host objects for the Otter runtime whose behavior is implemented by
//! native callbacks.
//!
//! An embedder describes a native class with [`ClassDefinition`]: per-operation
//! callbacks in one of two ABI generations, tables of static values and static
//! functions, and an optional parent class. Instances ([`ObjectRef`]) route
//! every property access, enumeration, call, construction, conversion and
//! instance check through the class chain before falling back to default
//! own-property behavior.
//!
//! ## Design Principles
//!
//! - **Chain of responsibility**: classes are walked leaf to root with fixed,
//!   per-operation precedence
//! - **Lock discipline**: the runtime lock is fully released around every host
//!   callout and restored afterwards
//! - **Pending exceptions**: host exceptions are raised into the caller's
//!   [`ExecState`] and surface as [`CallbackError`] at Rust boundaries
//!
//! ## Example
//!
//! ```
//! use otter_callback_object::{
//!     ClassDefinition, ObjectRef, PropertyAttributes, Runtime, StaticFunction, ValueRef,
//! };
//!
//! let class = ClassDefinition::new("Counter")
//!     .static_function(StaticFunction::new(
//!         "double",
//!         PropertyAttributes::NONE,
//!         |_ctx, _callee, _this, args, _exc| {
//!             ValueRef::number(args.first().and_then(|a| a.as_number()).unwrap_or(0.0) * 2.0)
//!         },
//!     ))
//!     .build()?;
//!
//! let runtime = Runtime::new();
//! let mut exec = runtime.enter();
//! let counter = ObjectRef::create(&mut exec, &class, std::ptr::null_mut());
//! let double = counter.get(&mut exec, "double");
//! let result = double
//!     .as_function()
//!     .unwrap()
//!     .call(&mut exec, &otter_callback_object::Value::undefined(), &[21.into()]);
//! assert_eq!(result.as_number(), Some(42.0));
//! # Ok::<(), otter_callback_object::CallbackError>(())
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod bridge;
pub mod callback_object;
pub mod class;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod function;
mod lifecycle;
pub mod lock;
pub mod object;
pub mod runtime;
pub mod static_table;
pub mod string;
pub mod value;

pub use bridge::{HostContext, HostString, PropertyNameAccumulator, ValueRef};
pub use callback_object::{CallbackObject, ObjectRef, TypeInfo};
pub use class::{
    ClassDefinition, ClassDescriptor, ClassGeneration, ClassRef, ExtendedCallbacks,
    LegacyCallbacks, Operation,
};
pub use config::RuntimeConfig;
pub use dispatch::{CallType, ConstructType, PropertySlot};
pub use error::{CallbackError, CallbackResult};
pub use function::{CallbackFunction, FunctionRef};
pub use lock::{DropAllLocks, RuntimeLock};
pub use object::{EnumerationMode, JsObject, PropertyAttributes};
pub use runtime::{ExecState, Runtime};
pub use static_table::{StaticFunction, StaticValue};
pub use string::JsString;
pub use value::{JsType, PreferredType, Value};
