//! Operation dispatch over the class chain
//!
//! Every intercepted operation walks the instance's classes from the leaf
//! toward the root and lets the first class that claims the operation handle
//! it. Property operations consult, per class and in this order, the
//! property callbacks, the static value table and the static function table;
//! when nothing claims a name the base object's own storage takes over.
//!
//! Host callouts always run with the runtime lock released. An exception
//! reported by a callback becomes the pending exception of the caller's
//! [`ExecState`] and stops the walk.

use std::sync::Arc;
use tracing::{trace, warn};

use crate::bridge::{
    HostContext, HostString, PropertyNameAccumulator, ValueRef, marshal_arguments,
    raise_host_exception,
};
use crate::callback_object::ObjectRef;
use crate::class::{ClassRef, Operation};
use crate::error::{CallbackError, CallbackResult};
use crate::function::CallbackFunction;
use crate::object::{EnumerationMode, PropertyAttributes, PropertyDescriptor};
use crate::runtime::ExecState;
use crate::string::JsString;
use crate::value::{PreferredType, Value};

/// Attributes reported for properties claimed by a class
pub const CLAIMED_ATTRIBUTES: PropertyAttributes =
    PropertyAttributes::from_bits_truncate(
        PropertyAttributes::READ_ONLY.bits() | PropertyAttributes::DONT_ENUM.bits(),
    );

const LAZY_ACCESSOR_MISSING: &str =
    "hasProperty callback returned true for a property that doesn't exist.";
const STATIC_FUNCTION_MISSING: &str =
    "Static function property defined with NULL callAsFunction callback.";

/// Where a property lookup found its answer
#[derive(Debug, Clone)]
pub enum PropertySlot {
    /// Value already produced by `getProperty` or a static value getter
    Value {
        /// The value (`undefined` when the callback raised)
        value: Value,
        /// Reported attributes
        attributes: PropertyAttributes,
    },
    /// Claimed by `hasProperty`; the value is fetched on retrieval
    LazyAccessor {
        /// Reported attributes
        attributes: PropertyAttributes,
    },
    /// Claimed by a static function entry; the callable is materialized on retrieval
    StaticFunction {
        /// Reported attributes
        attributes: PropertyAttributes,
    },
    /// Own property of the base object
    Own(PropertyDescriptor),
}

impl PropertySlot {
    /// Attributes reported for this slot
    pub fn attributes(&self) -> PropertyAttributes {
        match self {
            Self::Value { attributes, .. }
            | Self::LazyAccessor { attributes }
            | Self::StaticFunction { attributes } => *attributes,
            Self::Own(desc) => desc.attributes,
        }
    }
}

/// Result of the callable capability query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallType {
    /// Some class in the chain provides `callAsFunction`
    Host,
    /// Not callable
    None,
}

/// Result of the constructible capability query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructType {
    /// Some class in the chain provides `callAsConstructor`
    Host,
    /// Not constructible
    None,
}

/// Run a host callback with the runtime lock released
fn callout<R>(
    exec: &ExecState,
    operation: Operation,
    class: &ClassRef,
    f: impl FnOnce(&HostContext) -> R,
) -> R {
    let ctx = exec.host_context();
    trace!(operation = operation.as_str(), class = class.name(), "Host callout");
    let _unlocked = exec.runtime().drop_all_locks();
    f(&ctx)
}

/// Whether a write was terminally handled at one level
enum WriteStep {
    Done(bool),
    Continue,
}

impl ObjectRef {
    /// Find which part of the chain answers for `name`
    ///
    /// Callbacks run during the lookup. A `getProperty` exception still
    /// yields a slot (bound to `undefined`) with the exception left pending.
    pub fn get_own_property_slot(&self, exec: &mut ExecState, name: &str) -> Option<PropertySlot> {
        self.property_slot(exec, &JsString::intern(name))
    }

    fn property_slot(&self, exec: &mut ExecState, name: &Arc<JsString>) -> Option<PropertySlot> {
        let host_name = HostString::from_name(name);

        for class in self.class().chain() {
            if let Some(hook) = class.has_property_hook() {
                let found = callout(exec, Operation::HasProperty, class, |ctx| {
                    hook.call(ctx, self, &host_name)
                });
                if found {
                    return Some(PropertySlot::LazyAccessor {
                        attributes: CLAIMED_ATTRIBUTES,
                    });
                }
            } else if let Some(hook) = class.get_property_hook() {
                let mut exception = None;
                let value = callout(exec, Operation::GetProperty, class, |ctx| {
                    hook.call(ctx, self, &host_name, &mut exception)
                });
                if raise_host_exception(exec, exception) {
                    return Some(PropertySlot::Value {
                        value: Value::undefined(),
                        attributes: CLAIMED_ATTRIBUTES,
                    });
                }
                if let Some(value) = value {
                    return Some(PropertySlot::Value {
                        value: value.into_value(),
                        attributes: CLAIMED_ATTRIBUTES,
                    });
                }
            }

            let tables = class.static_tables();
            if tables.value(name).is_some() {
                if let Some(value) = self.static_value(exec, name) {
                    return Some(PropertySlot::Value {
                        value,
                        attributes: CLAIMED_ATTRIBUTES,
                    });
                }
            }

            if tables.function(name).is_some() {
                return Some(PropertySlot::StaticFunction {
                    attributes: CLAIMED_ATTRIBUTES,
                });
            }
        }

        self.base().get_own_property_descriptor(name).map(PropertySlot::Own)
    }

    /// Read a property
    ///
    /// On a host exception the result is `undefined` and the exception is pending.
    pub fn get(&self, exec: &mut ExecState, name: &str) -> Value {
        self.get_property(exec, &JsString::intern(name))
    }

    /// Read an indexed property through its decimal name
    pub fn get_by_index(&self, exec: &mut ExecState, index: u32) -> Value {
        self.get_property(exec, &JsString::intern(&index.to_string()))
    }

    fn get_property(&self, exec: &mut ExecState, name: &Arc<JsString>) -> Value {
        match self.property_slot(exec, name) {
            Some(PropertySlot::Value { value, .. }) => value,
            Some(PropertySlot::LazyAccessor { .. }) => self.callback_getter(exec, name),
            Some(PropertySlot::StaticFunction { .. }) => self.static_function_getter(exec, name),
            Some(PropertySlot::Own(desc)) => desc.value,
            None => Value::undefined(),
        }
    }

    /// Check whether any part of the chain or the base object has `name`
    pub fn has(&self, exec: &mut ExecState, name: &str) -> bool {
        self.property_slot(exec, &JsString::intern(name)).is_some()
    }

    /// Value of a static value entry: first getter in the chain that produces one
    fn static_value(&self, exec: &mut ExecState, name: &Arc<JsString>) -> Option<Value> {
        for class in self.class().chain() {
            let Some(entry) = class.static_tables().value(name) else {
                continue;
            };
            let Some(getter) = &entry.getter else {
                continue;
            };

            let hook = getter.hook(class);
            let mut exception = None;
            let value = callout(exec, Operation::GetProperty, class, |ctx| {
                hook.call(ctx, self, &entry.name, &mut exception)
            });
            if raise_host_exception(exec, exception) {
                return Some(Value::undefined());
            }
            if let Some(value) = value {
                return Some(value.into_value());
            }
        }
        None
    }

    /// Retrieve a property claimed by `hasProperty`
    fn callback_getter(&self, exec: &mut ExecState, name: &Arc<JsString>) -> Value {
        let host_name = HostString::from_name(name);

        for class in self.class().chain() {
            let Some(hook) = class.get_property_hook() else {
                continue;
            };
            let mut exception = None;
            let value = callout(exec, Operation::GetProperty, class, |ctx| {
                hook.call(ctx, self, &host_name, &mut exception)
            });
            if raise_host_exception(exec, exception) {
                return Value::undefined();
            }
            if let Some(value) = value {
                return value.into_value();
            }
        }

        warn!(
            class = self.class_name(),
            property = name.as_str(),
            "hasProperty claimed a property that no getProperty produced"
        );
        if exec.config().strict_lazy_accessors {
            exec.throw_reference_error(LAZY_ACCESSOR_MISSING);
        }
        Value::undefined()
    }

    /// Retrieve a property claimed by a static function entry
    fn static_function_getter(&self, exec: &mut ExecState, name: &Arc<JsString>) -> Value {
        if let Some(value) = self.base().get_own(name) {
            return value;
        }

        for class in self.class().chain() {
            let Some(entry) = class.static_tables().function(name) else {
                continue;
            };
            let Some(call) = &entry.call else {
                continue;
            };

            let function = Value::function(CallbackFunction::from_static(name.clone(), call, class));
            if exec.config().cache_static_functions {
                self.base()
                    .put_direct(name.clone(), function.clone(), entry.attributes);
            }
            return function;
        }

        exec.throw_reference_error(STATIC_FUNCTION_MISSING);
        Value::undefined()
    }

    /// Write a property
    ///
    /// Returns the raw outcome of whichever level handled the write, even
    /// when that level also raised an exception.
    pub fn set(&self, exec: &mut ExecState, name: &str, value: Value) -> bool {
        let name = JsString::intern(name);
        for class in self.class().chain() {
            if let WriteStep::Done(result) = self.write_callbacks(exec, class, &name, &value) {
                return result;
            }

            if let Some(entry) = class.static_tables().function(&name) {
                if self.base().has_own(&name) {
                    return self.base().put(name, value);
                }
                if entry.attributes.is_read_only() {
                    return false;
                }
                self.base().put_direct(name, value, PropertyAttributes::NONE);
                return true;
            }
        }
        self.base().put(name, value)
    }

    /// Write an indexed property through its decimal name
    ///
    /// A matching static function entry never installs an override here:
    /// read-only entries fail, others fall through to the default write.
    pub fn set_by_index(&self, exec: &mut ExecState, index: u32, value: Value) -> bool {
        let name = JsString::intern(&index.to_string());
        for class in self.class().chain() {
            if let WriteStep::Done(result) = self.write_callbacks(exec, class, &name, &value) {
                return result;
            }

            if let Some(entry) = class.static_tables().function(&name) {
                if entry.attributes.is_read_only() {
                    return false;
                }
                break;
            }
        }
        self.base().put(name, value)
    }

    /// `setProperty` and static value steps of the write path at one level
    fn write_callbacks(
        &self,
        exec: &mut ExecState,
        class: &ClassRef,
        name: &Arc<JsString>,
        value: &Value,
    ) -> WriteStep {
        let host_value = ValueRef::new(value.clone());

        if let Some(hook) = class.set_property_hook() {
            let host_name = HostString::from_name(name);
            let mut exception = None;
            let handled = callout(exec, Operation::SetProperty, class, |ctx| {
                hook.call(ctx, self, &host_name, &host_value, &mut exception)
            });
            if raise_host_exception(exec, exception) || handled {
                return WriteStep::Done(handled);
            }
        }

        if let Some(entry) = class.static_tables().value(name) {
            if entry.attributes.is_read_only() {
                return WriteStep::Done(false);
            }
            if let Some(setter) = &entry.setter {
                let hook = setter.hook(class);
                let mut exception = None;
                let handled = callout(exec, Operation::SetProperty, class, |ctx| {
                    hook.call(ctx, self, &entry.name, &host_value, &mut exception)
                });
                if raise_host_exception(exec, exception) || handled {
                    return WriteStep::Done(handled);
                }
            }
        }

        WriteStep::Continue
    }

    /// Write a property, turning failure into an error
    pub fn put_or_throw(&self, exec: &mut ExecState, name: &str, value: Value) -> CallbackResult<()> {
        let written = self.set(exec, name, value);
        exec.check()?;
        if !written {
            return Err(CallbackError::ReadOnly {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Delete a property
    ///
    /// A `deleteProperty` callback that raises reports the property as
    /// deleted; the exception stays pending.
    pub fn delete(&self, exec: &mut ExecState, name: &str) -> bool {
        let name = JsString::intern(name);
        let host_name = HostString::from_name(&name);

        for class in self.class().chain() {
            if let Some(hook) = class.delete_property_hook() {
                let mut exception = None;
                let deleted = callout(exec, Operation::DeleteProperty, class, |ctx| {
                    hook.call(ctx, self, &host_name, &mut exception)
                });
                if raise_host_exception(exec, exception) || deleted {
                    return true;
                }
            }

            let tables = class.static_tables();
            if let Some(entry) = tables.value(&name) {
                return !entry.attributes.is_dont_delete();
            }
            if let Some(entry) = tables.function(&name) {
                return !entry.attributes.is_dont_delete();
            }
        }

        self.base().delete(&name)
    }

    /// Delete an indexed property through its decimal name
    pub fn delete_by_index(&self, exec: &mut ExecState, index: u32) -> bool {
        self.delete(exec, &index.to_string())
    }

    /// Delete a property, turning failure into an error
    pub fn delete_or_throw(&self, exec: &mut ExecState, name: &str) -> CallbackResult<()> {
        let deleted = self.delete(exec, name);
        exec.check()?;
        if !deleted {
            return Err(CallbackError::NonDeletable {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Collect property names, leaf class first, base object last
    ///
    /// Names are not de-duplicated.
    pub fn own_property_names(&self, exec: &mut ExecState, mode: EnumerationMode) -> Vec<Arc<JsString>> {
        let mut names = Vec::new();

        for class in self.class().chain() {
            if let Some(hook) = class.get_property_names_hook() {
                let mut accumulator = PropertyNameAccumulator::new(&mut names);
                callout(exec, Operation::GetPropertyNames, class, |ctx| {
                    hook.call(ctx, self, &mut accumulator)
                });
            }

            let tables = class.static_tables();
            if let Some(values) = tables.values() {
                names.extend(
                    values
                        .iter()
                        .filter(|(_, entry)| entry.has_getter() && entry.attributes.is_enumerable(mode))
                        .map(|(name, _)| name.clone()),
                );
            }
            if let Some(functions) = tables.functions() {
                names.extend(
                    functions
                        .iter()
                        .filter(|(_, entry)| entry.attributes.is_enumerable(mode))
                        .map(|(name, _)| name.clone()),
                );
            }
        }

        self.base().collect_own_names(mode, &mut names);
        names
    }

    /// Capability query for calls
    pub fn call_type(&self) -> CallType {
        if self.class().chain().any(|c| c.provides(Operation::CallAsFunction)) {
            CallType::Host
        } else {
            CallType::None
        }
    }

    /// Capability query for construction
    pub fn construct_type(&self) -> ConstructType {
        if self.class().chain().any(|c| c.provides(Operation::CallAsConstructor)) {
            ConstructType::Host
        } else {
            ConstructType::None
        }
    }

    /// Call the object as a function
    ///
    /// Raises a TypeError when no class in the chain is callable.
    pub fn call(&self, exec: &mut ExecState, this: &Value, args: &[Value]) -> Value {
        if self.call_type() == CallType::None {
            exec.throw_type_error(&format!("{} is not a function", self.class_name()));
            return Value::undefined();
        }

        for class in self.class().chain() {
            let Some(hook) = class.call_as_function_hook() else {
                continue;
            };
            let callee = ValueRef::object(self);
            let this = ValueRef::new(this.clone());
            let args = marshal_arguments(args);
            let mut exception = None;
            let result = callout(exec, Operation::CallAsFunction, class, |ctx| {
                hook.call(ctx, &callee, &this, &args, &mut exception)
            });
            if raise_host_exception(exec, exception) {
                return Value::undefined();
            }
            return result.into_value();
        }

        self.missing_callback(Operation::CallAsFunction)
    }

    /// Use the object as a constructor
    ///
    /// Raises a TypeError when no class in the chain is constructible.
    pub fn construct(&self, exec: &mut ExecState, args: &[Value]) -> Value {
        if self.construct_type() == ConstructType::None {
            exec.throw_type_error(&format!("{} is not a constructor", self.class_name()));
            return Value::undefined();
        }

        for class in self.class().chain() {
            let Some(hook) = class.call_as_constructor_hook() else {
                continue;
            };
            let args = marshal_arguments(args);
            let mut exception = None;
            let result = callout(exec, Operation::CallAsConstructor, class, |ctx| {
                hook.call(ctx, self, &args, &mut exception)
            });
            if raise_host_exception(exec, exception) {
                return Value::undefined();
            }
            return result.into_value();
        }

        self.missing_callback(Operation::CallAsConstructor)
    }

    /// Capability query and invocation scan disagree: the chain is broken
    fn missing_callback(&self, operation: Operation) -> ! {
        let error = CallbackError::MissingCallback {
            operation: operation.as_str(),
            class: self.class_name().to_string(),
        };
        panic!("{error}")
    }

    /// `value instanceof self`; `false` when no class answers
    pub fn has_instance(&self, exec: &mut ExecState, value: &Value) -> bool {
        for class in self.class().chain() {
            let Some(hook) = class.has_instance_hook() else {
                continue;
            };
            let value = ValueRef::new(value.clone());
            let mut exception = None;
            let result = callout(exec, Operation::HasInstance, class, |ctx| {
                hook.call(ctx, self, &value, &mut exception)
            });
            raise_host_exception(exec, exception);
            return result;
        }
        false
    }

    /// Convert to a primitive
    ///
    /// The first class whose `convertToType` produces a value wins. Without
    /// one, a string hint yields `"[object <ClassName>]"` and a number hint NaN.
    pub fn convert_to_type(&self, exec: &mut ExecState, hint: PreferredType) -> Value {
        for class in self.class().chain() {
            let Some(hook) = class.convert_to_type_hook() else {
                continue;
            };
            let mut exception = None;
            let result = callout(exec, Operation::ConvertToType, class, |ctx| {
                hook.call(ctx, self, hint.as_js_type(), &mut exception)
            });
            if raise_host_exception(exec, exception) {
                return Value::undefined();
            }
            if let Some(result) = result {
                return result.into_value();
            }
        }

        match hint {
            PreferredType::String => Value::string(&format!("[object {}]", self.to_string_tag())),
            PreferredType::Number => Value::number(f64::NAN),
        }
    }
}

/// Call any value, raising a TypeError for non-callables
pub(crate) fn call_value(exec: &mut ExecState, callee: &Value, this: &Value, args: &[Value]) -> Value {
    match callee {
        Value::Function(function) => function.call(exec, this, args),
        Value::Object(object) => object.call(exec, this, args),
        other => {
            exec.throw_type_error(&format!("{:?} is not a function", other));
            Value::undefined()
        }
    }
}

/// Construct through an object's `callAsConstructor` chain
pub(crate) fn construct_value(exec: &mut ExecState, constructor: &ObjectRef, args: &[Value]) -> Value {
    constructor.construct(exec, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassDefinition, LegacyCallbacks};
    use crate::runtime::Runtime;
    use crate::static_table::{StaticFunction, StaticValue};

    fn create(exec: &mut ExecState, class: &ClassRef) -> ObjectRef {
        ObjectRef::create(exec, class, std::ptr::null_mut())
    }

    #[test]
    fn test_unclaimed_names_use_base_storage() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let class = ClassDefinition::new("Plain").build().unwrap();
        let obj = create(&mut exec, &class);

        assert!(obj.get(&mut exec, "missing").is_undefined());
        assert!(obj.set(&mut exec, "a", Value::from(1)));
        assert_eq!(obj.get(&mut exec, "a"), Value::from(1));
        assert!(matches!(
            obj.get_own_property_slot(&mut exec, "a"),
            Some(PropertySlot::Own(_))
        ));
        assert!(obj.delete(&mut exec, "a"));
        assert!(!obj.has(&mut exec, "a"));
    }

    #[test]
    fn test_claimed_slot_attributes() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let class = ClassDefinition::new("Claims")
            .legacy(LegacyCallbacks::new().has_property(|_, _, name| name == "lazy"))
            .static_function(StaticFunction::without_callback("f", PropertyAttributes::NONE))
            .build()
            .unwrap();
        let obj = create(&mut exec, &class);

        let slot = obj.get_own_property_slot(&mut exec, "lazy").unwrap();
        assert!(matches!(slot, PropertySlot::LazyAccessor { .. }));
        assert_eq!(slot.attributes(), CLAIMED_ATTRIBUTES);

        let slot = obj.get_own_property_slot(&mut exec, "f").unwrap();
        assert!(matches!(slot, PropertySlot::StaticFunction { .. }));
        assert!(slot.attributes().is_read_only());
    }

    #[test]
    fn test_has_property_false_skips_get_property_at_same_level() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let class = ClassDefinition::new("Skip")
            .legacy(
                LegacyCallbacks::new()
                    .has_property(|_, _, _| false)
                    .get_property(|_, _, _, _| Some(ValueRef::number(9.0))),
            )
            .build()
            .unwrap();
        let obj = create(&mut exec, &class);

        assert!(obj.get(&mut exec, "x").is_undefined());
        assert!(!obj.has(&mut exec, "x"));
    }

    #[test]
    fn test_static_value_getter_without_value_falls_through() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let root = ClassDefinition::new("Root")
            .static_value(
                StaticValue::new("v", PropertyAttributes::NONE)
                    .getter(|_, _, _, _| Some(ValueRef::string("root"))),
            )
            .build()
            .unwrap();
        let leaf = ClassDefinition::new("Leaf")
            .parent(&root)
            .static_value(StaticValue::new("v", PropertyAttributes::NONE).getter(|_, _, _, _| None))
            .build()
            .unwrap();
        let obj = create(&mut exec, &leaf);

        assert_eq!(obj.get(&mut exec, "v"), Value::string("root"));
    }

    #[test]
    fn test_static_function_without_callback_raises_reference_error() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let class = ClassDefinition::new("Null")
            .static_function(StaticFunction::without_callback("f", PropertyAttributes::NONE))
            .build()
            .unwrap();
        let obj = create(&mut exec, &class);

        assert!(obj.get(&mut exec, "f").is_undefined());
        let err = exec.check().unwrap_err();
        assert!(err.to_string().contains(STATIC_FUNCTION_MISSING));
    }

    #[test]
    fn test_put_or_throw_reports_read_only() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let class = ClassDefinition::new("Const")
            .static_value(
                StaticValue::new("pi", PropertyAttributes::READ_ONLY)
                    .getter(|_, _, _, _| Some(ValueRef::number(2.5))),
            )
            .build()
            .unwrap();
        let obj = create(&mut exec, &class);

        let err = obj.put_or_throw(&mut exec, "pi", Value::from(3)).unwrap_err();
        assert!(matches!(err, CallbackError::ReadOnly { ref name } if name == "pi"));
        assert!(obj.put_or_throw(&mut exec, "other", Value::from(3)).is_ok());
    }

    #[test]
    fn test_default_conversion() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let class = ClassDefinition::new("Thing").build().unwrap();
        let obj = create(&mut exec, &class);

        assert_eq!(
            obj.convert_to_type(&mut exec, PreferredType::String),
            Value::string("[object Thing]")
        );
        let n = obj.convert_to_type(&mut exec, PreferredType::Number);
        assert!(n.as_number().unwrap().is_nan());
    }

    #[test]
    fn test_call_non_callable_raises_type_error() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let class = ClassDefinition::new("Inert").build().unwrap();
        let obj = create(&mut exec, &class);

        assert_eq!(obj.call_type(), CallType::None);
        assert_eq!(obj.construct_type(), ConstructType::None);
        assert!(obj.call(&mut exec, &Value::undefined(), &[]).is_undefined());
        let err = exec.check().unwrap_err();
        assert_eq!(err.to_string(), "Uncaught exception: TypeError: Inert is not a function");

        obj.construct(&mut exec, &[]);
        assert!(exec.check().is_err());

        call_value(&mut exec, &Value::from(1), &Value::undefined(), &[]);
        assert!(exec.check().is_err());
    }
}
