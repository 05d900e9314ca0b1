//! Static value and static function tables
//!
//! Classes may declare named properties backed by native accessors (static
//! values) or by native functions (static functions). Definitions are kept as
//! given and turned into name-keyed tables the first time the dispatcher
//! looks at them.

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::sync::{Arc, OnceLock};

use crate::bridge::{HostContext, HostString, ValueRef};
use crate::callback_object::ObjectRef;
use crate::class::{
    CallAsFunctionCallback, CallAsFunctionCallbackEx, ClassGeneration, ClassRef,
    GetPropertyCallback, GetPropertyCallbackEx, SetPropertyCallback, SetPropertyCallbackEx,
    Versioned,
};
use crate::error::{CallbackError, CallbackResult};
use crate::object::PropertyAttributes;
use crate::string::JsString;

/// Getter of a static value
pub type StaticGetter = Versioned<GetPropertyCallback, GetPropertyCallbackEx>;
/// Setter of a static value
pub type StaticSetter = Versioned<SetPropertyCallback, SetPropertyCallbackEx>;
/// Implementation of a static function
pub type StaticCall = Versioned<CallAsFunctionCallback, CallAsFunctionCallbackEx>;

/// Host definition of a static value
#[derive(Clone)]
pub struct StaticValue {
    name: String,
    getter: Option<StaticGetter>,
    setter: Option<StaticSetter>,
    attributes: PropertyAttributes,
}

impl StaticValue {
    /// A static value with no accessors yet
    pub fn new(name: impl Into<String>, attributes: PropertyAttributes) -> Self {
        Self {
            name: name.into(),
            getter: None,
            setter: None,
            attributes,
        }
    }

    /// Legacy getter
    pub fn getter(
        mut self,
        f: impl Fn(&HostContext, &ObjectRef, &HostString, &mut Option<ValueRef>) -> Option<ValueRef>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.getter = Some(Versioned::Legacy(Arc::new(f)));
        self
    }

    /// Legacy setter
    pub fn setter(
        mut self,
        f: impl Fn(&HostContext, &ObjectRef, &HostString, &ValueRef, &mut Option<ValueRef>) -> bool
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.setter = Some(Versioned::Legacy(Arc::new(f)));
        self
    }

    /// Extended getter
    pub fn getter_ex(
        mut self,
        f: impl Fn(&HostContext, &ClassRef, &ObjectRef, &HostString, &mut Option<ValueRef>) -> Option<ValueRef>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.getter = Some(Versioned::Extended(Arc::new(f)));
        self
    }

    /// Extended setter
    pub fn setter_ex(
        mut self,
        f: impl Fn(&HostContext, &ClassRef, &ObjectRef, &HostString, &ValueRef, &mut Option<ValueRef>) -> bool
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.setter = Some(Versioned::Extended(Arc::new(f)));
        self
    }

    pub(crate) fn generations(&self) -> impl Iterator<Item = ClassGeneration> + '_ {
        self.getter
            .iter()
            .map(Versioned::generation)
            .chain(self.setter.iter().map(Versioned::generation))
    }
}

/// Host definition of a static function
#[derive(Clone)]
pub struct StaticFunction {
    name: String,
    call: Option<StaticCall>,
    attributes: PropertyAttributes,
}

impl StaticFunction {
    /// A static function with a legacy implementation
    pub fn new(
        name: impl Into<String>,
        attributes: PropertyAttributes,
        f: impl Fn(&HostContext, &ValueRef, &ValueRef, &[ValueRef], &mut Option<ValueRef>) -> ValueRef
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            call: Some(Versioned::Legacy(Arc::new(f))),
            attributes,
        }
    }

    /// A static function with an extended implementation
    pub fn new_ex(
        name: impl Into<String>,
        attributes: PropertyAttributes,
        f: impl Fn(&HostContext, &ClassRef, &ValueRef, &ValueRef, &[ValueRef], &mut Option<ValueRef>) -> ValueRef
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            call: Some(Versioned::Extended(Arc::new(f))),
            attributes,
        }
    }

    /// A static function entry with no implementation
    ///
    /// Reading it raises a ReferenceError.
    pub fn without_callback(name: impl Into<String>, attributes: PropertyAttributes) -> Self {
        Self {
            name: name.into(),
            call: None,
            attributes,
        }
    }

    pub(crate) fn generation(&self) -> Option<ClassGeneration> {
        self.call.as_ref().map(Versioned::generation)
    }
}

/// A static value as stored in its class's table
pub struct StaticValueEntry {
    pub(crate) name: HostString,
    pub(crate) getter: Option<StaticGetter>,
    pub(crate) setter: Option<StaticSetter>,
    pub(crate) attributes: PropertyAttributes,
}

impl StaticValueEntry {
    /// Property name
    pub fn name(&self) -> &HostString {
        &self.name
    }

    /// Declared attributes
    pub fn attributes(&self) -> PropertyAttributes {
        self.attributes
    }

    /// Check for a getter
    pub fn has_getter(&self) -> bool {
        self.getter.is_some()
    }

    /// Check for a setter
    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }
}

/// A static function as stored in its class's table
pub struct StaticFunctionEntry {
    pub(crate) name: HostString,
    pub(crate) call: Option<StaticCall>,
    pub(crate) attributes: PropertyAttributes,
}

impl StaticFunctionEntry {
    /// Property name
    pub fn name(&self) -> &HostString {
        &self.name
    }

    /// Declared attributes
    pub fn attributes(&self) -> PropertyAttributes {
        self.attributes
    }

    /// Check for an implementation
    pub fn has_callback(&self) -> bool {
        self.call.is_some()
    }
}

/// Static values of one class, in declaration order
pub type StaticValueTable = IndexMap<Arc<JsString>, StaticValueEntry, FxBuildHasher>;
/// Static functions of one class, in declaration order
pub type StaticFunctionTable = IndexMap<Arc<JsString>, StaticFunctionEntry, FxBuildHasher>;

/// Both static tables of a class, built on first use
pub struct StaticTables {
    value_defs: Vec<StaticValue>,
    function_defs: Vec<StaticFunction>,
    values: OnceLock<Option<StaticValueTable>>,
    functions: OnceLock<Option<StaticFunctionTable>>,
}

impl StaticTables {
    /// Validate names; tables themselves are built lazily
    pub(crate) fn new(
        class: &str,
        values: Vec<StaticValue>,
        functions: Vec<StaticFunction>,
    ) -> CallbackResult<Self> {
        check_names(class, values.iter().map(|v| v.name.as_str()))?;
        check_names(class, functions.iter().map(|f| f.name.as_str()))?;
        Ok(Self {
            value_defs: values,
            function_defs: functions,
            values: OnceLock::new(),
            functions: OnceLock::new(),
        })
    }

    pub(crate) fn empty() -> Self {
        Self {
            value_defs: Vec::new(),
            function_defs: Vec::new(),
            values: OnceLock::new(),
            functions: OnceLock::new(),
        }
    }

    /// Static value table, or `None` when the class declares none
    pub fn values(&self) -> Option<&StaticValueTable> {
        self.values
            .get_or_init(|| {
                (!self.value_defs.is_empty()).then(|| {
                    self.value_defs
                        .iter()
                        .map(|def| {
                            let name = HostString::new(&def.name);
                            let entry = StaticValueEntry {
                                name: name.clone(),
                                getter: def.getter.clone(),
                                setter: def.setter.clone(),
                                attributes: def.attributes,
                            };
                            (name.name().clone(), entry)
                        })
                        .collect()
                })
            })
            .as_ref()
    }

    /// Static function table, or `None` when the class declares none
    pub fn functions(&self) -> Option<&StaticFunctionTable> {
        self.functions
            .get_or_init(|| {
                (!self.function_defs.is_empty()).then(|| {
                    self.function_defs
                        .iter()
                        .map(|def| {
                            let name = HostString::new(&def.name);
                            let entry = StaticFunctionEntry {
                                name: name.clone(),
                                call: def.call.clone(),
                                attributes: def.attributes,
                            };
                            (name.name().clone(), entry)
                        })
                        .collect()
                })
            })
            .as_ref()
    }

    /// Look up a static value by name
    pub fn value(&self, name: &JsString) -> Option<&StaticValueEntry> {
        self.values()?.get(name)
    }

    /// Look up a static function by name
    pub fn function(&self, name: &JsString) -> Option<&StaticFunctionEntry> {
        self.functions()?.get(name)
    }
}

fn check_names<'a>(class: &str, names: impl Iterator<Item = &'a str>) -> CallbackResult<()> {
    let mut seen = rustc_hash::FxHashSet::default();
    for name in names {
        if name.is_empty() {
            return Err(CallbackError::InvalidStaticName {
                class: class.to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(CallbackError::DuplicateStaticName {
                class: class.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(
        _: &HostContext,
        _: &ValueRef,
        _: &ValueRef,
        _: &[ValueRef],
        _: &mut Option<ValueRef>,
    ) -> ValueRef {
        ValueRef::undefined()
    }

    #[test]
    fn test_tables_keep_declaration_order() {
        let tables = StaticTables::new(
            "T",
            vec![
                StaticValue::new("b", PropertyAttributes::NONE),
                StaticValue::new("a", PropertyAttributes::READ_ONLY),
            ],
            vec![StaticFunction::new("f", PropertyAttributes::NONE, noop)],
        )
        .unwrap();

        let names: Vec<&str> = tables.values().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        let a = tables.value(&JsString::new("a")).unwrap();
        assert!(a.attributes().is_read_only());
        assert!(!a.has_getter());
        assert!(tables.function(&JsString::new("f")).unwrap().has_callback());
    }

    #[test]
    fn test_empty_tables_are_absent() {
        let tables = StaticTables::empty();
        assert!(tables.values().is_none());
        assert!(tables.functions().is_none());
        assert!(tables.value(&JsString::new("x")).is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = StaticTables::new(
            "Dup",
            vec![
                StaticValue::new("x", PropertyAttributes::NONE),
                StaticValue::new("x", PropertyAttributes::NONE),
            ],
            Vec::new(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, CallbackError::DuplicateStaticName { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = StaticTables::new(
            "Anon",
            Vec::new(),
            vec![StaticFunction::without_callback("", PropertyAttributes::NONE)],
        )
        .err()
        .unwrap();
        assert!(matches!(err, CallbackError::InvalidStaticName { .. }));
    }

    #[test]
    fn test_same_name_in_both_tables_allowed() {
        let tables = StaticTables::new(
            "Both",
            vec![StaticValue::new("x", PropertyAttributes::NONE)],
            vec![StaticFunction::new("x", PropertyAttributes::NONE, noop)],
        );
        assert!(tables.is_ok());
    }
}
