//! Host-class instances
//!
//! A [`CallbackObject`] pairs default own-property storage with the leaf
//! class that intercepts operations on it, an opaque host data pointer and
//! the type snapshot captured when initialization finished.

use std::ffi::c_void;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, OnceLock};

use crate::class::{ClassGeneration, ClassRef};
use crate::lifecycle;
use crate::object::JsObject;
use crate::runtime::{ExecState, Runtime};

/// Name reported for instances of anonymous classes
pub const DEFAULT_CLASS_NAME: &str = "Object";

/// Snapshot of an instance's type identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Leaf class name
    pub class_name: String,
    /// Identity of the leaf class descriptor
    pub class_id: usize,
    /// Callback generation of the leaf class
    pub generation: ClassGeneration,
}

impl TypeInfo {
    pub(crate) fn of(class: &ClassRef) -> Self {
        Self {
            class_name: class.name().to_string(),
            class_id: class.id(),
            generation: class.generation(),
        }
    }
}

/// An object whose behavior is driven by a chain of native classes
pub struct CallbackObject {
    base: JsObject,
    class: ClassRef,
    private: AtomicPtr<c_void>,
    type_info: OnceLock<TypeInfo>,
    runtime: Runtime,
}

impl CallbackObject {
    /// Default own-property storage
    pub fn base(&self) -> &JsObject {
        &self.base
    }

    /// Leaf class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// The runtime this object was created in
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Leaf class name, or `"Object"` for an anonymous class
    pub fn class_name(&self) -> &str {
        match self.class.name() {
            "" => DEFAULT_CLASS_NAME,
            name => name,
        }
    }

    /// Tag used by the default string conversion (`[object <tag>]`)
    pub fn to_string_tag(&self) -> &str {
        self.class_name()
    }

    /// Host data pointer; never dereferenced by the runtime
    pub fn private_data(&self) -> *mut c_void {
        self.private.load(Ordering::Acquire)
    }

    /// Replace the host data pointer
    pub fn set_private(&self, data: *mut c_void) {
        self.private.store(data, Ordering::Release);
    }

    /// Check whether `class` appears anywhere in this instance's chain
    pub fn inherits(&self, class: &ClassRef) -> bool {
        self.class.chain().any(|c| ClassRef::ptr_eq(c, class))
    }

    /// Type identity captured at the end of initialization
    pub fn type_info(&self) -> Option<&TypeInfo> {
        self.type_info.get()
    }

    /// Stable address of this instance
    pub fn address(&self) -> usize {
        self as *const Self as usize
    }

    pub(crate) fn capture_type_info(&self) {
        let _ = self.type_info.set(TypeInfo::of(&self.class));
    }
}

impl Drop for CallbackObject {
    fn drop(&mut self) {
        lifecycle::finalize(self);
    }
}

impl std::fmt::Debug for CallbackObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackObject")
            .field("class", &self.class_name())
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a [`CallbackObject`]; compares by identity
#[derive(Clone)]
pub struct ObjectRef(Arc<CallbackObject>);

impl ObjectRef {
    /// Create an instance of `class` and run its initialize pass
    pub fn create(exec: &mut ExecState, class: &ClassRef, data: *mut c_void) -> Self {
        let object = Self(Arc::new(CallbackObject {
            base: JsObject::new(),
            class: class.clone(),
            private: AtomicPtr::new(data),
            type_info: OnceLock::new(),
            runtime: exec.runtime().clone(),
        }));
        lifecycle::initialize(exec, &object);
        object
    }

    /// Identity comparison
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl std::ops::Deref for ObjectRef {
    type Target = CallbackObject;

    fn deref(&self) -> &CallbackObject {
        &self.0
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl Eq for ObjectRef {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassDefinition;

    #[test]
    fn test_class_name_defaults() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let named = ClassDefinition::new("Widget").build().unwrap();
        let anon = ClassDefinition::new("").build().unwrap();

        let a = ObjectRef::create(&mut exec, &named, std::ptr::null_mut());
        let b = ObjectRef::create(&mut exec, &anon, std::ptr::null_mut());
        assert_eq!(a.class_name(), "Widget");
        assert_eq!(b.class_name(), "Object");
        assert_eq!(b.to_string_tag(), "Object");
    }

    #[test]
    fn test_private_data_round_trip() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let class = ClassDefinition::new("Holder").build().unwrap();
        let mut slot = 42u32;
        let ptr = &mut slot as *mut u32 as *mut c_void;

        let obj = ObjectRef::create(&mut exec, &class, ptr);
        assert_eq!(obj.private_data(), ptr);
        obj.set_private(std::ptr::null_mut());
        assert!(obj.private_data().is_null());
    }

    #[test]
    fn test_inherits_walks_chain() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let root = ClassDefinition::new("Root").build().unwrap();
        let leaf = ClassDefinition::new("Leaf").parent(&root).build().unwrap();
        let other = ClassDefinition::new("Other").build().unwrap();

        let obj = ObjectRef::create(&mut exec, &leaf, std::ptr::null_mut());
        assert!(obj.inherits(&root));
        assert!(obj.inherits(&leaf));
        assert!(!obj.inherits(&other));
    }

    #[test]
    fn test_type_info_captured() {
        let runtime = Runtime::new();
        let mut exec = runtime.enter();
        let class = ClassDefinition::new("Snap").build().unwrap();
        let obj = ObjectRef::create(&mut exec, &class, std::ptr::null_mut());

        let info = obj.type_info().unwrap();
        assert_eq!(info.class_name, "Snap");
        assert_eq!(info.class_id, class.id());
        assert_eq!(info.generation, ClassGeneration::Legacy);
    }
}
