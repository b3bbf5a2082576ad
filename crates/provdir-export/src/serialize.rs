//! Bundle to pretty-printed JSON.

use serde_json::{Map, Value, json};

use crate::bundle::{BundleEntry, ExportBundle, Record};
use crate::error::Result;

/// Serialize a bundle. Field order follows insertion, so equal bundles give equal text.
pub fn serialize(bundle: &ExportBundle) -> Result<String> {
    Ok(serde_json::to_string_pretty(&bundle_to_value(bundle))?)
}

pub fn bundle_to_value(bundle: &ExportBundle) -> Value {
    let mut out = Map::new();
    out.insert("resourceType".to_string(), json!("Bundle"));
    out.insert("type".to_string(), json!(bundle.bundle_type().as_str()));
    if !bundle.is_empty() {
        out.insert(
            "entry".to_string(),
            Value::Array(bundle.entries().iter().map(entry_to_value).collect()),
        );
    }
    Value::Object(out)
}

fn entry_to_value(entry: &BundleEntry) -> Value {
    let mut out = Map::new();
    out.insert("fullUrl".to_string(), json!(entry.full_url));
    out.insert("resource".to_string(), record_to_value(&entry.resource));
    if let Some(request) = &entry.request {
        out.insert(
            "request".to_string(),
            json!({ "method": request.method.as_str(), "url": request.url }),
        );
    }
    Value::Object(out)
}

fn record_to_value(record: &Record) -> Value {
    let mut out = Map::new();
    out.insert("resourceType".to_string(), json!(record.kind.resource_type()));
    out.insert("id".to_string(), json!(record.id));
    for (key, value) in &record.body {
        out.insert(key.clone(), value.clone());
    }
    if !record.extensions.is_empty() {
        let extensions = record
            .extensions
            .iter()
            .map(|ext| json!({ "url": ext.url, "valueInteger": ext.value }))
            .collect();
        out.insert("extension".to_string(), Value::Array(extensions));
    }
    Value::Object(out)
}
