//! Immutable OpenAPI document snapshots.
//!
//! A `Document` owns two halves: the raw document as parsed, and a copy with
//! every local `#/...` reference expanded. Neither half is ever mutated in
//! place. `update_with` applies an operation to a fresh clone of the raw half
//! and rebuilds the dereferenced half, so each pipeline stage sees exactly the
//! output of the previous one and earlier snapshots stay valid.
//!
//! Dereferencing keeps a stack of references being expanded; re-entering an
//! active reference leaves the `$ref` node intact instead of inlining forever,
//! which makes self- and mutually-recursive schemas safe to process.

// Internal imports (std, crate)
use crate::config::Config;
use crate::error::{Error, Result};
use std::path::Path;

// External imports (alphabetized)
use serde_json::{Map, Value};
use tokio::fs;

/// An immutable snapshot of an OpenAPI document.
#[derive(Debug, Clone)]
pub struct Document {
    document: Value,
    dereferenced: Value,
}

impl Document {
    /// Build a snapshot from an in-memory document value.
    pub fn new(document: Value) -> Result<Self> {
        let dereferenced = dereference(&document)?;
        Ok(Self {
            document,
            dereferenced,
        })
    }

    /// Load a snapshot from a JSON or YAML file.
    ///
    /// Only `3.0.x` documents are accepted.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let document = parse_content(&content).map_err(|e| {
            Error::openapi(format!(
                "Failed to parse OpenAPI document at {}: {}",
                path.display(),
                e
            ))
        })?;
        if !is_v3(&document) {
            return Err(Error::openapi("document is not a valid V3 OpenAPI document"));
        }
        Self::new(document)
    }

    /// The raw document, references intact.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// The document with local references expanded.
    pub fn dereferenced(&self) -> &Value {
        &self.dereferenced
    }

    /// Apply `op` to a clone of the raw document and build a new snapshot.
    ///
    /// The receiver is left untouched; the returned snapshot carries the
    /// operation's output and a freshly computed dereferenced half.
    pub fn update_with<F>(&self, op: F) -> Result<Document>
    where
        F: FnOnce(Value) -> Result<Value>,
    {
        let updated = op(self.document.clone())?;
        Document::new(updated)
    }

    /// Check the raw document against the OpenAPI structural model.
    pub fn validate(&self) -> Result<()> {
        serde_json::from_value::<openapiv3::OpenAPI>(self.document.clone())
            .map(|_| ())
            .map_err(|e| {
                Error::validation(format!(
                    "document does not follow the OpenAPI specification: {e}"
                ))
            })
    }

    /// Pretty-printed JSON of the raw document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.document)?)
    }
}

/// Stamp `info.title` and `info.version` from the config, then apply the
/// user's `normalize_input` hook if one is set.
pub fn normalize_document(api: &Document, config: &Config) -> Result<Document> {
    let stamped = api.update_with(|mut document| {
        let root = document
            .as_object_mut()
            .ok_or_else(|| Error::openapi("document root must be an object"))?;
        let info = root
            .entry("info")
            .or_insert_with(|| Value::Object(Map::new()));
        let info = info
            .as_object_mut()
            .ok_or_else(|| Error::openapi("document 'info' must be an object"))?;
        info.insert("title".to_string(), Value::String(config.name.clone()));
        info.insert("version".to_string(), Value::String(config.version.clone()));
        Ok(document)
    })?;

    match &config.normalize_input {
        Some(hook) => stamped.update_with(|document| hook(document, config).map_err(Error::hook)),
        None => Ok(stamped),
    }
}

/// Parse content as either JSON or YAML.
fn parse_content(content: &str) -> std::result::Result<Value, String> {
    if let Ok(json) = serde_json::from_str(content) {
        return Ok(json);
    }
    if let Ok(json) = serde_yaml::from_str(content) {
        return Ok(json);
    }
    Err("content is neither valid JSON nor YAML".to_string())
}

fn is_v3(document: &Value) -> bool {
    document
        .get("openapi")
        .and_then(Value::as_str)
        .map(|version| version.starts_with("3.0."))
        .unwrap_or(false)
}

/// Expand every local `#/...` reference in `root`.
fn dereference(root: &Value) -> Result<Value> {
    let mut active = Vec::new();
    resolve_refs(root, root, &mut active)
}

fn resolve_refs(root: &Value, value: &Value, active: &mut Vec<String>) -> Result<Value> {
    match value {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                if !reference.starts_with('#') {
                    // External references are out of scope, keep them as-is.
                    log::debug!("Skipping non-local reference {reference}");
                    return Ok(value.clone());
                }
                if active.iter().any(|r| r == reference) {
                    // Cycle: keep the node referential instead of inlining.
                    return Ok(value.clone());
                }
                let target = root.pointer(&reference[1..]).ok_or_else(|| {
                    Error::openapi(format!("Could not resolve reference {reference}"))
                })?;
                active.push(reference.to_string());
                let resolved = resolve_refs(root, target, active);
                active.pop();
                return resolved;
            }

            let mut resolved = Map::new();
            for (key, entry) in map {
                resolved.insert(key.clone(), resolve_refs(root, entry, active)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => {
            let resolved = items
                .iter()
                .map(|item| resolve_refs(root, item, active))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(resolved))
        }
        other => Ok(other.clone()),
    }
}
