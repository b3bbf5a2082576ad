//! Layer merging with priority ordering
//!
//! Priority order (lowest to highest):
//! 1. Defaults - packaged `provdir.toml`
//! 2. File config - `conf/provdir.toml`, then `../conf/provdir.toml`
//! 3. Runtime - overrides applied to a loaded snapshot

use serde_json::{Map, Value};

use crate::ConfigError;

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSource {
    /// Packaged defaults
    Default,
    /// Override file on disk
    File,
    /// Runtime override
    Runtime,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::File => write!(f, "file"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

/// Priority levels for configuration sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Default = 0,
    File = 10,
    Runtime = 40,
}

impl From<ConfigSource> for Priority {
    fn from(source: ConfigSource) -> Self {
        match source {
            ConfigSource::Default => Priority::Default,
            ConfigSource::File => Priority::File,
            ConfigSource::Runtime => Priority::Runtime,
        }
    }
}

/// One parsed configuration layer
#[derive(Debug, Clone)]
pub struct Layer {
    pub source: ConfigSource,
    /// Where the layer came from (file path or a label)
    pub origin: String,
    tree: Value,
}

impl Layer {
    /// Parse a layer from TOML text
    pub fn from_toml(
        source: ConfigSource,
        origin: impl Into<String>,
        toml_str: &str,
    ) -> Result<Self, ConfigError> {
        let origin = origin.into();
        let tree: Value = toml::from_str(toml_str)
            .map_err(|e| ConfigError::parse(format!("TOML parse error in {origin}: {e}")))?;
        Ok(Self {
            source,
            origin,
            tree,
        })
    }

    pub fn tree(&self) -> &Value {
        &self.tree
    }

    pub fn priority(&self) -> Priority {
        Priority::from(self.source)
    }
}

/// Merge layers into one tree. Layers are applied in priority order; layers sharing a
/// priority keep their relative order, so the later file wins.
pub fn merge_layers(mut layers: Vec<Layer>) -> (Value, Vec<(ConfigSource, String)>) {
    layers.sort_by_key(Layer::priority);

    let mut merged = Value::Object(Map::new());
    let mut applied = Vec::with_capacity(layers.len());
    for layer in layers {
        deep_merge(&mut merged, layer.tree);
        applied.push((layer.source, layer.origin));
    }
    (merged, applied)
}

/// Deep merge two JSON values (right takes precedence for conflicts)
pub(crate) fn deep_merge(left: &mut Value, right: Value) {
    match (left, right) {
        (Value::Object(left_map), Value::Object(right_map)) => {
            for (key, right_value) in right_map {
                if let Some(left_value) = left_map.get_mut(&key) {
                    deep_merge(left_value, right_value);
                } else {
                    left_map.insert(key, right_value);
                }
            }
        }
        (left, right) => {
            *left = right;
        }
    }
}

/// Resolve a dotted key against a tree
pub(crate) fn lookup<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(tree, |node, segment| node.as_object()?.get(segment))
}

/// Set a dotted key, creating intermediate tables. A scalar standing where a table is
/// needed is replaced.
pub(crate) fn insert(tree: &mut Value, key: &str, value: Value) {
    let mut node = tree;
    let mut segments = key.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            unreachable!("node was just made an object");
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Remove a dotted key, returning the removed value
pub(crate) fn remove(tree: &mut Value, key: &str) -> Option<Value> {
    let (parent, leaf) = match key.rsplit_once('.') {
        Some((parent, leaf)) => (lookup_mut(tree, parent)?, leaf),
        None => (tree, key),
    };
    parent.as_object_mut()?.remove(leaf)
}

fn lookup_mut<'a>(tree: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    key.split('.')
        .try_fold(tree, |node, segment| node.as_object_mut()?.get_mut(segment))
}

/// Dotted names of every scalar leaf, sorted
pub(crate) fn leaf_keys(tree: &Value) -> Vec<String> {
    fn walk(prefix: &str, node: &Value, out: &mut Vec<String>) {
        match node {
            Value::Object(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    walk(&path, child, out);
                }
            }
            _ if !prefix.is_empty() => out.push(prefix.to_string()),
            _ => {}
        }
    }

    let mut out = Vec::new();
    walk("", tree, &mut out);
    out.sort();
    out
}
