//! Native class descriptors
//!
//! A class is described once by the host through [`ClassDefinition`] and frozen
//! into an immutable [`ClassDescriptor`] shared through [`ClassRef`]. Its
//! callbacks belong to exactly one ABI generation:
//!
//! - **Legacy** callbacks receive the context, the instance and the
//!   operation's arguments.
//! - **Extended** callbacks additionally receive the [`ClassRef`] of the class
//!   they were registered on, so one implementation shared by several classes
//!   of a chain can tell which level invoked it.
//!
//! Descriptors link to an optional parent, forming the chain the dispatcher
//! walks from the most-derived class to the root.
//!
//! # Example
//!
//! ```
//! use otter_callback_object::{ClassDefinition, LegacyCallbacks, Runtime, ObjectRef, ValueRef};
//!
//! let base = ClassDefinition::new("Base")
//!     .legacy(LegacyCallbacks::new().get_property(|_ctx, _obj, name, _exc| {
//!         (name == "x").then(|| ValueRef::number(1.0))
//!     }))
//!     .build()
//!     .unwrap();
//! let derived = ClassDefinition::new("Derived").parent(&base).build().unwrap();
//!
//! let runtime = Runtime::new();
//! let mut exec = runtime.enter();
//! let obj = ObjectRef::create(&mut exec, &derived, std::ptr::null_mut());
//! assert_eq!(obj.get(&mut exec, "x").as_number(), Some(1.0));
//! ```

use std::sync::Arc;

use crate::bridge::{HostContext, HostString, PropertyNameAccumulator, ValueRef};
use crate::callback_object::{CallbackObject, ObjectRef};
use crate::error::{CallbackError, CallbackResult};
use crate::static_table::{StaticFunction, StaticTables, StaticValue};
use crate::value::JsType;

// Legacy callback signatures

/// Runs once per class level when an instance is created
pub type InitializeCallback = Arc<dyn Fn(&HostContext, &ObjectRef) + Send + Sync>;
/// Runs once per class level when an instance is destroyed
pub type FinalizeCallback = Arc<dyn Fn(&CallbackObject) + Send + Sync>;
/// Answers whether the class claims a property name
pub type HasPropertyCallback =
    Arc<dyn Fn(&HostContext, &ObjectRef, &HostString) -> bool + Send + Sync>;
/// Produces a property value; `None` means "not handled here"
pub type GetPropertyCallback = Arc<
    dyn Fn(&HostContext, &ObjectRef, &HostString, &mut Option<ValueRef>) -> Option<ValueRef>
        + Send
        + Sync,
>;
/// Handles a property write; `true` means handled
pub type SetPropertyCallback = Arc<
    dyn Fn(&HostContext, &ObjectRef, &HostString, &ValueRef, &mut Option<ValueRef>) -> bool
        + Send
        + Sync,
>;
/// Handles a property delete; `true` means deleted
pub type DeletePropertyCallback = Arc<
    dyn Fn(&HostContext, &ObjectRef, &HostString, &mut Option<ValueRef>) -> bool + Send + Sync,
>;
/// Appends host-provided names during enumeration
pub type GetPropertyNamesCallback =
    Arc<dyn Fn(&HostContext, &ObjectRef, &mut PropertyNameAccumulator<'_>) + Send + Sync>;
/// Invoked when the instance (or a static function) is called; receives callee and `this`
pub type CallAsFunctionCallback = Arc<
    dyn Fn(&HostContext, &ValueRef, &ValueRef, &[ValueRef], &mut Option<ValueRef>) -> ValueRef
        + Send
        + Sync,
>;
/// Invoked when the instance is used as a constructor
pub type CallAsConstructorCallback = Arc<
    dyn Fn(&HostContext, &ObjectRef, &[ValueRef], &mut Option<ValueRef>) -> ValueRef
        + Send
        + Sync,
>;
/// Answers `value instanceof this`
pub type HasInstanceCallback = Arc<
    dyn Fn(&HostContext, &ObjectRef, &ValueRef, &mut Option<ValueRef>) -> bool + Send + Sync,
>;
/// Converts the instance to a primitive; `None` means "not handled here"
pub type ConvertToTypeCallback = Arc<
    dyn Fn(&HostContext, &ObjectRef, JsType, &mut Option<ValueRef>) -> Option<ValueRef>
        + Send
        + Sync,
>;

// Extended callback signatures: same as legacy, plus the registering class

/// Extended [`InitializeCallback`]
pub type InitializeCallbackEx = Arc<dyn Fn(&HostContext, &ClassRef, &ObjectRef) + Send + Sync>;
/// Extended [`FinalizeCallback`]
pub type FinalizeCallbackEx = Arc<dyn Fn(&ClassRef, &CallbackObject) + Send + Sync>;
/// Extended [`HasPropertyCallback`]
pub type HasPropertyCallbackEx =
    Arc<dyn Fn(&HostContext, &ClassRef, &ObjectRef, &HostString) -> bool + Send + Sync>;
/// Extended [`GetPropertyCallback`]
pub type GetPropertyCallbackEx = Arc<
    dyn Fn(&HostContext, &ClassRef, &ObjectRef, &HostString, &mut Option<ValueRef>) -> Option<ValueRef>
        + Send
        + Sync,
>;
/// Extended [`SetPropertyCallback`]
pub type SetPropertyCallbackEx = Arc<
    dyn Fn(&HostContext, &ClassRef, &ObjectRef, &HostString, &ValueRef, &mut Option<ValueRef>) -> bool
        + Send
        + Sync,
>;
/// Extended [`DeletePropertyCallback`]
pub type DeletePropertyCallbackEx = Arc<
    dyn Fn(&HostContext, &ClassRef, &ObjectRef, &HostString, &mut Option<ValueRef>) -> bool
        + Send
        + Sync,
>;
/// Extended [`GetPropertyNamesCallback`]
pub type GetPropertyNamesCallbackEx = Arc<
    dyn Fn(&HostContext, &ClassRef, &ObjectRef, &mut PropertyNameAccumulator<'_>) + Send + Sync,
>;
/// Extended [`CallAsFunctionCallback`]
pub type CallAsFunctionCallbackEx = Arc<
    dyn Fn(&HostContext, &ClassRef, &ValueRef, &ValueRef, &[ValueRef], &mut Option<ValueRef>) -> ValueRef
        + Send
        + Sync,
>;
/// Extended [`CallAsConstructorCallback`]
pub type CallAsConstructorCallbackEx = Arc<
    dyn Fn(&HostContext, &ClassRef, &ObjectRef, &[ValueRef], &mut Option<ValueRef>) -> ValueRef
        + Send
        + Sync,
>;
/// Extended [`HasInstanceCallback`]
pub type HasInstanceCallbackEx = Arc<
    dyn Fn(&HostContext, &ClassRef, &ObjectRef, &ValueRef, &mut Option<ValueRef>) -> bool
        + Send
        + Sync,
>;
/// Extended [`ConvertToTypeCallback`]
pub type ConvertToTypeCallbackEx = Arc<
    dyn Fn(&HostContext, &ClassRef, &ObjectRef, JsType, &mut Option<ValueRef>) -> Option<ValueRef>
        + Send
        + Sync,
>;

/// ABI generation of a class's callbacks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassGeneration {
    /// Callbacks without the class argument
    Legacy,
    /// Callbacks receiving the registering class
    Extended,
}

impl ClassGeneration {
    /// Lowercase name, for diagnostics
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Extended => "extended",
        }
    }
}

/// A callback tagged with its generation
#[derive(Clone)]
pub enum Versioned<L, E> {
    /// Legacy-generation callback
    Legacy(L),
    /// Extended-generation callback
    Extended(E),
}

impl<L, E> Versioned<L, E> {
    /// Generation of the wrapped callback
    pub fn generation(&self) -> ClassGeneration {
        match self {
            Self::Legacy(_) => ClassGeneration::Legacy,
            Self::Extended(_) => ClassGeneration::Extended,
        }
    }

    /// Bind to the class that owns the callback, ready to call
    pub(crate) fn hook<'a>(&'a self, class: &'a ClassRef) -> Hook<'a, L, E> {
        match self {
            Self::Legacy(f) => Hook::Legacy(f),
            Self::Extended(f) => Hook::Extended(f, class),
        }
    }
}

/// Operations a class can intercept
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Instance construction
    Initialize,
    /// Instance destruction
    Finalize,
    /// Property existence
    HasProperty,
    /// Property read
    GetProperty,
    /// Property write
    SetProperty,
    /// Property delete
    DeleteProperty,
    /// Property enumeration
    GetPropertyNames,
    /// Calling the instance
    CallAsFunction,
    /// Constructing with the instance
    CallAsConstructor,
    /// `instanceof`
    HasInstance,
    /// Primitive conversion
    ConvertToType,
}

impl Operation {
    /// Callback slot name, for diagnostics
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Finalize => "finalize",
            Self::HasProperty => "hasProperty",
            Self::GetProperty => "getProperty",
            Self::SetProperty => "setProperty",
            Self::DeleteProperty => "deleteProperty",
            Self::GetPropertyNames => "getPropertyNames",
            Self::CallAsFunction => "callAsFunction",
            Self::CallAsConstructor => "callAsConstructor",
            Self::HasInstance => "hasInstance",
            Self::ConvertToType => "convertToType",
        }
    }
}

macro_rules! callback_setters {
    ($( $(#[$doc:meta])* $field:ident: ($($arg:ty),*) $(-> $ret:ty)?; )*) => {
        $(
            $(#[$doc])*
            pub fn $field(
                mut self,
                f: impl Fn($($arg),*) $(-> $ret)? + Send + Sync + 'static,
            ) -> Self {
                self.$field = Some(Arc::new(f));
                self
            }
        )*
    };
}

/// Callback slots of a legacy-generation class
#[derive(Clone, Default)]
pub struct LegacyCallbacks {
    /// `initialize`
    pub initialize: Option<InitializeCallback>,
    /// `finalize`
    pub finalize: Option<FinalizeCallback>,
    /// `hasProperty`
    pub has_property: Option<HasPropertyCallback>,
    /// `getProperty`
    pub get_property: Option<GetPropertyCallback>,
    /// `setProperty`
    pub set_property: Option<SetPropertyCallback>,
    /// `deleteProperty`
    pub delete_property: Option<DeletePropertyCallback>,
    /// `getPropertyNames`
    pub get_property_names: Option<GetPropertyNamesCallback>,
    /// `callAsFunction`
    pub call_as_function: Option<CallAsFunctionCallback>,
    /// `callAsConstructor`
    pub call_as_constructor: Option<CallAsConstructorCallback>,
    /// `hasInstance`
    pub has_instance: Option<HasInstanceCallback>,
    /// `convertToType`
    pub convert_to_type: Option<ConvertToTypeCallback>,
}

impl LegacyCallbacks {
    /// All slots empty
    pub fn new() -> Self {
        Self::default()
    }

    callback_setters! {
        /// Set `initialize`
        initialize: (&HostContext, &ObjectRef);
        /// Set `finalize`
        finalize: (&CallbackObject);
        /// Set `hasProperty`
        has_property: (&HostContext, &ObjectRef, &HostString) -> bool;
        /// Set `getProperty`
        get_property: (&HostContext, &ObjectRef, &HostString, &mut Option<ValueRef>) -> Option<ValueRef>;
        /// Set `setProperty`
        set_property: (&HostContext, &ObjectRef, &HostString, &ValueRef, &mut Option<ValueRef>) -> bool;
        /// Set `deleteProperty`
        delete_property: (&HostContext, &ObjectRef, &HostString, &mut Option<ValueRef>) -> bool;
        /// Set `getPropertyNames`
        get_property_names: (&HostContext, &ObjectRef, &mut PropertyNameAccumulator<'_>);
        /// Set `callAsFunction`
        call_as_function: (&HostContext, &ValueRef, &ValueRef, &[ValueRef], &mut Option<ValueRef>) -> ValueRef;
        /// Set `callAsConstructor`
        call_as_constructor: (&HostContext, &ObjectRef, &[ValueRef], &mut Option<ValueRef>) -> ValueRef;
        /// Set `hasInstance`
        has_instance: (&HostContext, &ObjectRef, &ValueRef, &mut Option<ValueRef>) -> bool;
        /// Set `convertToType`
        convert_to_type: (&HostContext, &ObjectRef, JsType, &mut Option<ValueRef>) -> Option<ValueRef>;
    }
}

/// Callback slots of an extended-generation class
#[derive(Clone, Default)]
pub struct ExtendedCallbacks {
    /// `initialize`
    pub initialize: Option<InitializeCallbackEx>,
    /// `finalize`
    pub finalize: Option<FinalizeCallbackEx>,
    /// `hasProperty`
    pub has_property: Option<HasPropertyCallbackEx>,
    /// `getProperty`
    pub get_property: Option<GetPropertyCallbackEx>,
    /// `setProperty`
    pub set_property: Option<SetPropertyCallbackEx>,
    /// `deleteProperty`
    pub delete_property: Option<DeletePropertyCallbackEx>,
    /// `getPropertyNames`
    pub get_property_names: Option<GetPropertyNamesCallbackEx>,
    /// `callAsFunction`
    pub call_as_function: Option<CallAsFunctionCallbackEx>,
    /// `callAsConstructor`
    pub call_as_constructor: Option<CallAsConstructorCallbackEx>,
    /// `hasInstance`
    pub has_instance: Option<HasInstanceCallbackEx>,
    /// `convertToType`
    pub convert_to_type: Option<ConvertToTypeCallbackEx>,
}

impl ExtendedCallbacks {
    /// All slots empty
    pub fn new() -> Self {
        Self::default()
    }

    callback_setters! {
        /// Set `initialize`
        initialize: (&HostContext, &ClassRef, &ObjectRef);
        /// Set `finalize`
        finalize: (&ClassRef, &CallbackObject);
        /// Set `hasProperty`
        has_property: (&HostContext, &ClassRef, &ObjectRef, &HostString) -> bool;
        /// Set `getProperty`
        get_property: (&HostContext, &ClassRef, &ObjectRef, &HostString, &mut Option<ValueRef>) -> Option<ValueRef>;
        /// Set `setProperty`
        set_property: (&HostContext, &ClassRef, &ObjectRef, &HostString, &ValueRef, &mut Option<ValueRef>) -> bool;
        /// Set `deleteProperty`
        delete_property: (&HostContext, &ClassRef, &ObjectRef, &HostString, &mut Option<ValueRef>) -> bool;
        /// Set `getPropertyNames`
        get_property_names: (&HostContext, &ClassRef, &ObjectRef, &mut PropertyNameAccumulator<'_>);
        /// Set `callAsFunction`
        call_as_function: (&HostContext, &ClassRef, &ValueRef, &ValueRef, &[ValueRef], &mut Option<ValueRef>) -> ValueRef;
        /// Set `callAsConstructor`
        call_as_constructor: (&HostContext, &ClassRef, &ObjectRef, &[ValueRef], &mut Option<ValueRef>) -> ValueRef;
        /// Set `hasInstance`
        has_instance: (&HostContext, &ClassRef, &ObjectRef, &ValueRef, &mut Option<ValueRef>) -> bool;
        /// Set `convertToType`
        convert_to_type: (&HostContext, &ClassRef, &ObjectRef, JsType, &mut Option<ValueRef>) -> Option<ValueRef>;
    }
}

/// The active callback set of a class
#[derive(Clone)]
pub enum ClassCallbacks {
    /// Legacy-generation slots
    Legacy(LegacyCallbacks),
    /// Extended-generation slots
    Extended(ExtendedCallbacks),
}

impl ClassCallbacks {
    /// Generation of this callback set
    pub fn generation(&self) -> ClassGeneration {
        match self {
            Self::Legacy(_) => ClassGeneration::Legacy,
            Self::Extended(_) => ClassGeneration::Extended,
        }
    }
}

impl Default for ClassCallbacks {
    fn default() -> Self {
        Self::Legacy(LegacyCallbacks::default())
    }
}

/// Host-supplied description of a class, validated by [`build`](Self::build)
#[derive(Clone, Default)]
pub struct ClassDefinition {
    name: String,
    parent: Option<ClassRef>,
    callbacks: ClassCallbacks,
    static_values: Vec<StaticValue>,
    static_functions: Vec<StaticFunction>,
}

impl ClassDefinition {
    /// Start a legacy class with no callbacks
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the parent class
    pub fn parent(mut self, parent: &ClassRef) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Use legacy-generation callbacks
    pub fn legacy(mut self, callbacks: LegacyCallbacks) -> Self {
        self.callbacks = ClassCallbacks::Legacy(callbacks);
        self
    }

    /// Use extended-generation callbacks
    pub fn extended(mut self, callbacks: ExtendedCallbacks) -> Self {
        self.callbacks = ClassCallbacks::Extended(callbacks);
        self
    }

    /// Add a static value entry
    pub fn static_value(mut self, value: StaticValue) -> Self {
        self.static_values.push(value);
        self
    }

    /// Add a static function entry
    pub fn static_function(mut self, function: StaticFunction) -> Self {
        self.static_functions.push(function);
        self
    }

    /// Validate and freeze into a descriptor
    pub fn build(self) -> CallbackResult<ClassRef> {
        let generation = self.callbacks.generation();
        let generations = self
            .static_values
            .iter()
            .flat_map(|v| v.generations())
            .chain(self.static_functions.iter().filter_map(|f| f.generation()));
        for found in generations {
            if found != generation {
                return Err(CallbackError::GenerationMismatch {
                    class: self.name,
                    expected: generation.as_str(),
                    found: found.as_str(),
                });
            }
        }

        let tables = StaticTables::new(&self.name, self.static_values, self.static_functions)?;
        Ok(ClassRef(Arc::new(ClassDescriptor {
            name: self.name,
            parent: self.parent,
            callbacks: self.callbacks,
            tables,
        })))
    }

    /// A callback-free class; cannot fail validation
    pub(crate) fn plain(name: &str) -> ClassRef {
        ClassRef(Arc::new(ClassDescriptor {
            name: name.to_string(),
            parent: None,
            callbacks: ClassCallbacks::default(),
            tables: StaticTables::empty(),
        }))
    }
}

/// Immutable native class record
pub struct ClassDescriptor {
    name: String,
    parent: Option<ClassRef>,
    callbacks: ClassCallbacks,
    tables: StaticTables,
}

impl ClassDescriptor {
    /// Class name (may be empty)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent class
    pub fn parent(&self) -> Option<&ClassRef> {
        self.parent.as_ref()
    }

    /// Generation of this class's callbacks
    pub fn generation(&self) -> ClassGeneration {
        self.callbacks.generation()
    }

    /// The active callback set
    pub fn callbacks(&self) -> &ClassCallbacks {
        &self.callbacks
    }

    /// Static tables, built on first use
    pub fn static_tables(&self) -> &StaticTables {
        &self.tables
    }

    /// Check whether this class itself provides a callback for `operation`
    pub fn provides(&self, operation: Operation) -> bool {
        macro_rules! slot {
            ($cb:expr) => {
                match operation {
                    Operation::Initialize => $cb.initialize.is_some(),
                    Operation::Finalize => $cb.finalize.is_some(),
                    Operation::HasProperty => $cb.has_property.is_some(),
                    Operation::GetProperty => $cb.get_property.is_some(),
                    Operation::SetProperty => $cb.set_property.is_some(),
                    Operation::DeleteProperty => $cb.delete_property.is_some(),
                    Operation::GetPropertyNames => $cb.get_property_names.is_some(),
                    Operation::CallAsFunction => $cb.call_as_function.is_some(),
                    Operation::CallAsConstructor => $cb.call_as_constructor.is_some(),
                    Operation::HasInstance => $cb.has_instance.is_some(),
                    Operation::ConvertToType => $cb.convert_to_type.is_some(),
                }
            };
        }
        match &self.callbacks {
            ClassCallbacks::Legacy(cb) => slot!(cb),
            ClassCallbacks::Extended(cb) => slot!(cb),
        }
    }
}

impl std::fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("generation", &self.generation())
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .finish()
    }
}

/// Shared handle to a class descriptor; compares by identity
#[derive(Clone)]
pub struct ClassRef(Arc<ClassDescriptor>);

impl std::ops::Deref for ClassRef {
    type Target = ClassDescriptor;

    fn deref(&self) -> &ClassDescriptor {
        &self.0
    }
}

impl std::fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl Eq for ClassRef {}

macro_rules! hook_accessor {
    ($name:ident, $field:ident, $legacy:ty, $extended:ty) => {
        pub(crate) fn $name(&self) -> Option<Hook<'_, $legacy, $extended>> {
            match &self.0.callbacks {
                ClassCallbacks::Legacy(cb) => cb.$field.as_ref().map(Hook::Legacy),
                ClassCallbacks::Extended(cb) => {
                    cb.$field.as_ref().map(|f| Hook::Extended(f, self))
                }
            }
        }
    };
}

impl ClassRef {
    /// Identity comparison
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Stable identity of this descriptor
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// This class followed by its ancestors, leaf to root
    pub fn chain(&self) -> impl Iterator<Item = &ClassRef> {
        std::iter::successors(Some(self), |class| class.parent())
    }

    hook_accessor!(initialize_hook, initialize, InitializeCallback, InitializeCallbackEx);
    hook_accessor!(finalize_hook, finalize, FinalizeCallback, FinalizeCallbackEx);
    hook_accessor!(has_property_hook, has_property, HasPropertyCallback, HasPropertyCallbackEx);
    hook_accessor!(get_property_hook, get_property, GetPropertyCallback, GetPropertyCallbackEx);
    hook_accessor!(set_property_hook, set_property, SetPropertyCallback, SetPropertyCallbackEx);
    hook_accessor!(
        delete_property_hook,
        delete_property,
        DeletePropertyCallback,
        DeletePropertyCallbackEx
    );
    hook_accessor!(
        get_property_names_hook,
        get_property_names,
        GetPropertyNamesCallback,
        GetPropertyNamesCallbackEx
    );
    hook_accessor!(
        call_as_function_hook,
        call_as_function,
        CallAsFunctionCallback,
        CallAsFunctionCallbackEx
    );
    hook_accessor!(
        call_as_constructor_hook,
        call_as_constructor,
        CallAsConstructorCallback,
        CallAsConstructorCallbackEx
    );
    hook_accessor!(has_instance_hook, has_instance, HasInstanceCallback, HasInstanceCallbackEx);
    hook_accessor!(
        convert_to_type_hook,
        convert_to_type,
        ConvertToTypeCallback,
        ConvertToTypeCallbackEx
    );
}

/// A callback resolved at one chain level, bound to its class for extended calls
pub(crate) enum Hook<'a, L, E> {
    Legacy(&'a L),
    Extended(&'a E, &'a ClassRef),
}

impl Hook<'_, InitializeCallback, InitializeCallbackEx> {
    pub(crate) fn call(&self, ctx: &HostContext, object: &ObjectRef) {
        match self {
            Hook::Legacy(f) => f(ctx, object),
            Hook::Extended(f, class) => f(ctx, class, object),
        }
    }
}

impl Hook<'_, FinalizeCallback, FinalizeCallbackEx> {
    pub(crate) fn call(&self, object: &CallbackObject) {
        match self {
            Hook::Legacy(f) => f(object),
            Hook::Extended(f, class) => f(class, object),
        }
    }
}

impl Hook<'_, HasPropertyCallback, HasPropertyCallbackEx> {
    pub(crate) fn call(&self, ctx: &HostContext, object: &ObjectRef, name: &HostString) -> bool {
        match self {
            Hook::Legacy(f) => f(ctx, object, name),
            Hook::Extended(f, class) => f(ctx, class, object, name),
        }
    }
}

impl Hook<'_, GetPropertyCallback, GetPropertyCallbackEx> {
    pub(crate) fn call(
        &self,
        ctx: &HostContext,
        object: &ObjectRef,
        name: &HostString,
        exception: &mut Option<ValueRef>,
    ) -> Option<ValueRef> {
        match self {
            Hook::Legacy(f) => f(ctx, object, name, exception),
            Hook::Extended(f, class) => f(ctx, class, object, name, exception),
        }
    }
}

impl Hook<'_, SetPropertyCallback, SetPropertyCallbackEx> {
    pub(crate) fn call(
        &self,
        ctx: &HostContext,
        object: &ObjectRef,
        name: &HostString,
        value: &ValueRef,
        exception: &mut Option<ValueRef>,
    ) -> bool {
        match self {
            Hook::Legacy(f) => f(ctx, object, name, value, exception),
            Hook::Extended(f, class) => f(ctx, class, object, name, value, exception),
        }
    }
}

impl Hook<'_, DeletePropertyCallback, DeletePropertyCallbackEx> {
    pub(crate) fn call(
        &self,
        ctx: &HostContext,
        object: &ObjectRef,
        name: &HostString,
        exception: &mut Option<ValueRef>,
    ) -> bool {
        match self {
            Hook::Legacy(f) => f(ctx, object, name, exception),
            Hook::Extended(f, class) => f(ctx, class, object, name, exception),
        }
    }
}

impl Hook<'_, GetPropertyNamesCallback, GetPropertyNamesCallbackEx> {
    pub(crate) fn call(
        &self,
        ctx: &HostContext,
        object: &ObjectRef,
        names: &mut PropertyNameAccumulator<'_>,
    ) {
        match self {
            Hook::Legacy(f) => f(ctx, object, names),
            Hook::Extended(f, class) => f(ctx, class, object, names),
        }
    }
}

impl Hook<'_, CallAsFunctionCallback, CallAsFunctionCallbackEx> {
    pub(crate) fn call(
        &self,
        ctx: &HostContext,
        callee: &ValueRef,
        this: &ValueRef,
        args: &[ValueRef],
        exception: &mut Option<ValueRef>,
    ) -> ValueRef {
        match self {
            Hook::Legacy(f) => f(ctx, callee, this, args, exception),
            Hook::Extended(f, class) => f(ctx, class, callee, this, args, exception),
        }
    }
}

impl Hook<'_, CallAsConstructorCallback, CallAsConstructorCallbackEx> {
    pub(crate) fn call(
        &self,
        ctx: &HostContext,
        constructor: &ObjectRef,
        args: &[ValueRef],
        exception: &mut Option<ValueRef>,
    ) -> ValueRef {
        match self {
            Hook::Legacy(f) => f(ctx, constructor, args, exception),
            Hook::Extended(f, class) => f(ctx, class, constructor, args, exception),
        }
    }
}

impl Hook<'_, HasInstanceCallback, HasInstanceCallbackEx> {
    pub(crate) fn call(
        &self,
        ctx: &HostContext,
        object: &ObjectRef,
        value: &ValueRef,
        exception: &mut Option<ValueRef>,
    ) -> bool {
        match self {
            Hook::Legacy(f) => f(ctx, object, value, exception),
            Hook::Extended(f, class) => f(ctx, class, object, value, exception),
        }
    }
}

impl Hook<'_, ConvertToTypeCallback, ConvertToTypeCallbackEx> {
    pub(crate) fn call(
        &self,
        ctx: &HostContext,
        object: &ObjectRef,
        hint: JsType,
        exception: &mut Option<ValueRef>,
    ) -> Option<ValueRef> {
        match self {
            Hook::Legacy(f) => f(ctx, object, hint, exception),
            Hook::Extended(f, class) => f(ctx, class, object, hint, exception),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::PropertyAttributes;

    #[test]
    fn test_chain_order() {
        let root = ClassDefinition::new("Root").build().unwrap();
        let middle = ClassDefinition::new("Middle").parent(&root).build().unwrap();
        let leaf = ClassDefinition::new("Leaf").parent(&middle).build().unwrap();

        let names: Vec<&str> = leaf.chain().map(|c| c.name()).collect();
        assert_eq!(names, ["Leaf", "Middle", "Root"]);
    }

    #[test]
    fn test_generation_selects_slots() {
        let legacy = ClassDefinition::new("L")
            .legacy(LegacyCallbacks::new().has_property(|_, _, _| true))
            .build()
            .unwrap();
        let extended = ClassDefinition::new("E")
            .extended(ExtendedCallbacks::new().has_property(|_, _, _, _| true))
            .build()
            .unwrap();

        assert_eq!(legacy.generation(), ClassGeneration::Legacy);
        assert_eq!(extended.generation(), ClassGeneration::Extended);
        assert!(legacy.provides(Operation::HasProperty));
        assert!(extended.provides(Operation::HasProperty));
        assert!(!extended.provides(Operation::GetProperty));
        assert!(matches!(extended.has_property_hook(), Some(Hook::Extended(..))));
        assert!(matches!(legacy.has_property_hook(), Some(Hook::Legacy(_))));
    }

    #[test]
    fn test_mixed_generation_rejected() {
        let err = ClassDefinition::new("Mixed")
            .extended(ExtendedCallbacks::new())
            .static_value(
                StaticValue::new("v", PropertyAttributes::NONE)
                    .getter(|_, _, _, _| Some(ValueRef::number(1.0))),
            )
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CallbackError::GenerationMismatch {
                expected: "extended",
                found: "legacy",
                ..
            }
        ));
    }

    #[test]
    fn test_class_ref_identity() {
        let a = ClassDefinition::new("Same").build().unwrap();
        let b = ClassDefinition::new("Same").build().unwrap();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }
}
