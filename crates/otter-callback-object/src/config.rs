//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::CallbackResult;

/// Configuration for a [`Runtime`](crate::runtime::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Maximum nesting of host code re-entering the runtime.
    /// Default: 256
    pub max_native_depth: usize,

    /// Cache materialized static functions as own properties.
    /// Default: true
    pub cache_static_functions: bool,

    /// Raise a ReferenceError when a property claimed by `hasProperty`
    /// produces no value on retrieval, instead of reading `undefined`.
    /// Default: false
    pub strict_lazy_accessors: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_native_depth: 256,
            cache_static_functions: true,
            strict_lazy_accessors: false,
        }
    }
}

impl RuntimeConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON; missing fields take their defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use otter_callback_object::RuntimeConfig;
    ///
    /// let config = RuntimeConfig::from_json(r#"{ "maxNativeDepth": 8 }"#).unwrap();
    /// assert_eq!(config.max_native_depth, 8);
    /// assert!(config.cache_static_functions);
    /// ```
    pub fn from_json(json: &str) -> CallbackResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the maximum native re-entry depth.
    pub fn max_native_depth(mut self, depth: usize) -> Self {
        self.max_native_depth = depth;
        self
    }

    /// Enable or disable the static function cache.
    pub fn cache_static_functions(mut self, enabled: bool) -> Self {
        self.cache_static_functions = enabled;
        self
    }

    /// Enable or disable strict lazy accessors.
    pub fn strict_lazy_accessors(mut self, enabled: bool) -> Self {
        self.strict_lazy_accessors = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_native_depth, 256);
        assert!(config.cache_static_functions);
        assert!(!config.strict_lazy_accessors);
    }

    #[test]
    fn test_from_json_partial() {
        let config = RuntimeConfig::from_json(r#"{ "strictLazyAccessors": true }"#).unwrap();
        assert!(config.strict_lazy_accessors);
        assert_eq!(config.max_native_depth, 256);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(RuntimeConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_builder_setters() {
        let config = RuntimeConfig::new()
            .max_native_depth(4)
            .cache_static_functions(false)
            .strict_lazy_accessors(true);
        assert_eq!(config.max_native_depth, 4);
        assert!(!config.cache_static_functions);
        assert!(config.strict_lazy_accessors);
    }
}
