//! Base object storage
//!
//! Every host object and host function owns a `JsObject`: the plain own-property
//! storage that the dispatcher falls back to when no class in the chain claims
//! an operation. Properties keep insertion order so enumeration is stable.

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

use crate::string::JsString;
use crate::value::Value;

/// Property attribute bits
///
/// Bit positions match the embedding API's `kJSPropertyAttribute*` constants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PropertyAttributes(u32);

impl PropertyAttributes {
    /// No attributes: writable, enumerable, deletable
    pub const NONE: Self = Self(0);
    /// Writes are rejected
    pub const READ_ONLY: Self = Self(1 << 1);
    /// Skipped by enumeration unless the mode includes hidden names
    pub const DONT_ENUM: Self = Self(1 << 2);
    /// Deletes are rejected
    pub const DONT_DELETE: Self = Self(1 << 3);

    /// Raw bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build from raw bits, dropping unknown ones
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & (Self::READ_ONLY.0 | Self::DONT_ENUM.0 | Self::DONT_DELETE.0))
    }

    /// Check whether all bits of `other` are set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Read-only bit set
    pub const fn is_read_only(self) -> bool {
        self.contains(Self::READ_ONLY)
    }

    /// Enumerable under the given mode
    pub const fn is_enumerable(self, mode: EnumerationMode) -> bool {
        !self.contains(Self::DONT_ENUM) || mode.include_dont_enum
    }

    /// Don't-delete bit set
    pub const fn is_dont_delete(self) -> bool {
        self.contains(Self::DONT_DELETE)
    }
}

impl std::ops::BitOr for PropertyAttributes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for PropertyAttributes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Which names an enumeration collects
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnumerationMode {
    /// Also collect `DontEnum` names
    pub include_dont_enum: bool,
}

impl EnumerationMode {
    /// Enumerable names only
    pub const fn enumerable() -> Self {
        Self {
            include_dont_enum: false,
        }
    }

    /// Every name, including `DontEnum` ones
    pub const fn all() -> Self {
        Self {
            include_dont_enum: true,
        }
    }
}

/// An own data property
#[derive(Clone, Debug)]
pub struct PropertyDescriptor {
    /// The value
    pub value: Value,
    /// Attributes
    pub attributes: PropertyAttributes,
}

impl PropertyDescriptor {
    /// Create a plain data property
    pub fn data(value: Value) -> Self {
        Self {
            value,
            attributes: PropertyAttributes::NONE,
        }
    }

    /// Create a data property with specific attributes
    pub fn data_with_attrs(value: Value, attributes: PropertyAttributes) -> Self {
        Self { value, attributes }
    }
}

type PropertyMap = IndexMap<Arc<JsString>, PropertyDescriptor, FxBuildHasher>;

/// Own-property storage with default get/set/delete/enumerate behavior
///
/// Thread-safe with interior mutability.
pub struct JsObject {
    properties: RwLock<PropertyMap>,
}

impl JsObject {
    /// Create an empty object
    pub fn new() -> Self {
        Self {
            properties: RwLock::new(PropertyMap::default()),
        }
    }

    /// Get an own property's value
    pub fn get_own(&self, name: &JsString) -> Option<Value> {
        self.properties.read().get(name).map(|desc| desc.value.clone())
    }

    /// Get an own property's descriptor
    pub fn get_own_property_descriptor(&self, name: &JsString) -> Option<PropertyDescriptor> {
        self.properties.read().get(name).cloned()
    }

    /// Check for an own property
    pub fn has_own(&self, name: &JsString) -> bool {
        self.properties.read().contains_key(name)
    }

    /// Default write
    ///
    /// Existing properties keep their attributes and reject the write when
    /// read-only; new properties are created with no attributes. The replaced
    /// value is dropped after the storage lock is released, so a host
    /// finalizer it triggers may read this object again.
    pub fn put(&self, name: Arc<JsString>, value: Value) -> bool {
        let replaced = {
            let mut props = self.properties.write();
            match props.get_mut(&*name) {
                Some(desc) if desc.attributes.is_read_only() => return false,
                Some(desc) => Some(std::mem::replace(&mut desc.value, value)),
                None => props
                    .insert(name, PropertyDescriptor::data(value))
                    .map(|desc| desc.value),
            }
        };
        drop(replaced);
        true
    }

    /// Install a property directly, replacing any existing one and its attributes
    pub fn put_direct(&self, name: Arc<JsString>, value: Value, attributes: PropertyAttributes) {
        let replaced = self
            .properties
            .write()
            .insert(name, PropertyDescriptor::data_with_attrs(value, attributes));
        drop(replaced);
    }

    /// Default delete
    ///
    /// Absent properties report success; `DontDelete` ones fail.
    pub fn delete(&self, name: &JsString) -> bool {
        let removed = {
            let mut props = self.properties.write();
            match props.get(name) {
                Some(desc) if desc.attributes.is_dont_delete() => return false,
                Some(_) => props.shift_remove(name),
                None => None,
            }
        };
        drop(removed);
        true
    }

    /// Append own property names visible under `mode`, in insertion order
    pub fn collect_own_names(&self, mode: EnumerationMode, names: &mut Vec<Arc<JsString>>) {
        let props = self.properties.read();
        names.extend(
            props
                .iter()
                .filter(|(_, desc)| desc.attributes.is_enumerable(mode))
                .map(|(name, _)| name.clone()),
        );
    }

    /// Number of own properties
    pub fn len(&self) -> usize {
        self.properties.read().len()
    }

    /// Check for no own properties
    pub fn is_empty(&self) -> bool {
        self.properties.read().is_empty()
    }
}

impl Default for JsObject {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JsObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsObject")
            .field("properties", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Arc<JsString> {
        JsString::intern(s)
    }

    #[test]
    fn test_object_get_set() {
        let obj = JsObject::new();

        assert!(obj.put(name("foo"), Value::from(42)));
        assert_eq!(obj.get_own(&name("foo")), Some(Value::from(42)));
        assert!(obj.has_own(&name("foo")));
        assert!(!obj.has_own(&name("bar")));
    }

    #[test]
    fn test_read_only_put_rejected() {
        let obj = JsObject::new();
        obj.put_direct(name("ro"), Value::from(1), PropertyAttributes::READ_ONLY);

        assert!(!obj.put(name("ro"), Value::from(2)));
        assert_eq!(obj.get_own(&name("ro")), Some(Value::from(1)));
    }

    #[test]
    fn test_delete() {
        let obj = JsObject::new();
        obj.put(name("a"), Value::from(1));
        obj.put_direct(name("b"), Value::from(2), PropertyAttributes::DONT_DELETE);

        assert!(obj.delete(&name("a")));
        assert!(!obj.has_own(&name("a")));
        assert!(!obj.delete(&name("b")));
        assert!(obj.has_own(&name("b")));
        assert!(obj.delete(&name("missing")));
    }

    #[test]
    fn test_enumeration_respects_dont_enum() {
        let obj = JsObject::new();
        obj.put(name("visible"), Value::from(1));
        obj.put_direct(name("hidden"), Value::from(2), PropertyAttributes::DONT_ENUM);

        let mut names = Vec::new();
        obj.collect_own_names(EnumerationMode::enumerable(), &mut names);
        assert_eq!(names, vec![name("visible")]);

        names.clear();
        obj.collect_own_names(EnumerationMode::all(), &mut names);
        assert_eq!(names, vec![name("visible"), name("hidden")]);
    }

    #[test]
    fn test_attribute_bits() {
        let attrs = PropertyAttributes::READ_ONLY | PropertyAttributes::DONT_ENUM;
        assert!(attrs.is_read_only());
        assert!(!attrs.is_dont_delete());
        assert!(!attrs.is_enumerable(EnumerationMode::enumerable()));
        assert!(attrs.is_enumerable(EnumerationMode::all()));
        assert_eq!(attrs.bits(), 0b110);
        assert_eq!(PropertyAttributes::from_bits_truncate(0xff).bits(), 0b1110);
    }

    #[test]
    fn test_object_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JsObject>();
    }
}
