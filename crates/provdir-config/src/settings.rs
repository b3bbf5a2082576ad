//! Immutable settings snapshot with typed accessors.

use serde_json::Value;

use crate::keys;
use crate::merger::{self, ConfigSource, Layer};
use crate::{ConfigError, Result};

/// A merged, read-only view of every configuration layer.
///
/// Overrides never mutate a snapshot in place: [`Settings::with_override`] and
/// [`Settings::without`] return a new snapshot whose version is one higher.
#[derive(Debug, Clone)]
pub struct Settings {
    tree: Value,
    applied: Vec<(ConfigSource, String)>,
    version: u64,
}

impl Settings {
    /// Build a snapshot from parsed layers
    pub fn from_layers(layers: Vec<Layer>) -> Self {
        let (tree, applied) = merger::merge_layers(layers);
        Self {
            tree,
            applied,
            version: 0,
        }
    }

    /// Build a snapshot from a single TOML document, treated as a file layer
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(Self::from_layers(vec![Layer::from_toml(
            ConfigSource::File,
            "inline",
            toml_str,
        )?]))
    }

    /// Monotonic snapshot version; 0 for a freshly loaded configuration
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Layers that contributed to this snapshot, lowest priority first
    pub fn applied_layers(&self) -> &[(ConfigSource, String)] {
        &self.applied
    }

    /// Raw value at a dotted key
    pub fn value(&self, key: &str) -> Option<&Value> {
        merger::lookup(&self.tree, key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Scalar value rendered as a string. Tables and arrays yield `None`.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.value(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// `true` only for a boolean `true` or a string equal to "true" ignoring case
    pub fn get_bool(&self, key: &str) -> bool {
        match self.value(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// Like [`Settings::get_bool`], but `default` when the key is absent
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        if self.contains(key) {
            self.get_bool(key)
        } else {
            default
        }
    }

    /// Unsigned integer value; strings holding a number are accepted
    pub fn get_u64_or(&self, key: &str, default: u64) -> u64 {
        match self.value(key) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// True when the key is absent or holds only whitespace
    pub fn is_blank(&self, key: &str) -> bool {
        self.get(key).is_none_or(|v| v.trim().is_empty())
    }

    /// Sorted dotted names of every scalar setting
    pub fn property_names(&self) -> Vec<String> {
        merger::leaf_keys(&self.tree)
    }

    /// New snapshot with `key` set to a string value
    pub fn with_override(&self, key: &str, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        merger::insert(&mut next.tree, key, Value::String(value.into()));
        next.bump(key);
        next
    }

    /// New snapshot with `key` removed
    pub fn without(&self, key: &str) -> Self {
        let mut next = self.clone();
        merger::remove(&mut next.tree, key);
        next.bump(key);
        next
    }

    fn bump(&mut self, key: &str) {
        self.version += 1;
        self.applied.push((ConfigSource::Runtime, key.to_string()));
    }

    /// Startup validation: cloud upload needs every credential key to be non-blank
    pub fn validate(&self) -> Result<()> {
        if self.get_bool(keys::AWS_S3_EXPORT_ENABLED) {
            for key in keys::AWS_S3_REQUIRED {
                if self.is_blank(key) {
                    return Err(ConfigError::validation(format!(
                        "AWS S3 export is enabled but config option '{key}' is blank or has invalid value"
                    )));
                }
            }
        }
        Ok(())
    }
}
