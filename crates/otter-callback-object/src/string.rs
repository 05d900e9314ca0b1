//! Interned property-name strings
//!
//! Property names travel through every dispatch step, so they are interned
//! once and compared by content hash afterwards.

use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

/// Global string intern table
///
/// Entries are never evicted: every name looked up through dispatch stays
/// interned for the life of the process, including the decimal names the
/// `*_by_index` operations produce. Embedders probing unbounded index ranges
/// should expect the table to grow accordingly.
static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::new);

/// String interning table
///
/// Instance-based so tests and embedders can use an isolated table; the
/// global table backs [`JsString::intern`].
pub struct StringTable {
    strings: DashMap<Arc<str>, Arc<JsString>, FxBuildHasher>,
}

impl StringTable {
    /// Create a new string table
    pub fn new() -> Self {
        Self {
            strings: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Intern a string in this table
    pub fn intern(&self, s: &str) -> Arc<JsString> {
        if let Some(existing) = self.strings.get(s) {
            return existing.clone();
        }

        let js_str = Arc::new(JsString::new(s));
        self.strings
            .entry(js_str.data.clone())
            .or_insert(js_str)
            .clone()
    }

    /// Check if a string is interned in this table
    pub fn is_interned(&self, s: &str) -> bool {
        self.strings.contains_key(s)
    }

    /// Get the number of interned strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

/// An immutable string with a precomputed hash
#[derive(Clone)]
pub struct JsString {
    data: Arc<str>,
    hash: u64,
}

impl JsString {
    /// Create or retrieve an interned string (using global table)
    pub fn intern(s: &str) -> Arc<Self> {
        STRING_TABLE.intern(s)
    }

    /// Create a string without interning
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        let data: Arc<str> = s.into();
        let hash = Self::compute_hash(&data);
        Self { data, hash }
    }

    /// Get the string as a str slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Get the length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if string is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get precomputed hash value
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    fn compute_hash(s: &str) -> u64 {
        let mut hasher = FxHasher::default();
        s.hash(&mut hasher);
        hasher.finish()
    }
}

impl std::fmt::Debug for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JsString({:?})", self.data)
    }
}

impl std::fmt::Display for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.data)
    }
}

impl PartialEq for JsString {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.data == other.data
    }
}

impl Eq for JsString {}

impl Hash for JsString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.data
    }
}
