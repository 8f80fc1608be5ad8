//! Reference map: the registry of named component schemas.
//!
//! The map is built in two phases. Phase one registers every schema under
//! `#/components/schemas/<name>` with its raw and dereferenced bodies, so that
//! forward and cyclic references resolve by name before any type exists.
//! Phase two compiles each raw body against the completed map, storing the
//! resulting descriptor and its direct dependencies on the item.
//!
//! Compiling the raw body (not the dereferenced one) is what turns `$ref`
//! nodes into named identifiers and dependency records; the dereferenced body
//! stays on the item as the resolution target for downstream consumers.

// Internal imports (std, crate)
use crate::error::Result;
use crate::schema::compiler::{compile, CompileMode};
use crate::schema::types::{Dependency, TypeDescriptor};
use crate::support::SupportTypes;

// External imports (alphabetized)
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Canonical reference string for a named component schema.
pub fn component_reference(name: &str) -> String {
    format!("#/components/schemas/{name}")
}

/// One named schema tracked by the reference map.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceItem {
    pub name: String,
    #[serde(rename = "ref")]
    pub reference: String,
    /// Schema body as declared in the document, `$ref` nodes intact.
    #[serde(skip)]
    pub raw: Value,
    /// Schema body with local references expanded.
    #[serde(skip)]
    pub dereferenced: Value,
    /// Compiled descriptor, present after phase two.
    #[serde(rename = "type")]
    pub ty: Option<TypeDescriptor>,
    /// Direct dependencies, deduplicated by name in first-encountered order.
    pub dependencies: Vec<Dependency>,
}

/// Insertion-ordered registry keyed by canonical reference string.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceMap {
    items: IndexMap<String, ReferenceItem>,
}

impl ReferenceMap {
    /// Phase one: register every named schema, types unresolved.
    ///
    /// `schemas` and `dereferenced` are the `components.schemas` objects of
    /// the raw and dereferenced document halves, keyed by schema name.
    pub fn build(schemas: &Map<String, Value>, dereferenced: &Map<String, Value>) -> Self {
        let mut items = IndexMap::new();
        for (name, raw) in schemas {
            let reference = component_reference(name);
            let dereferenced_body = dereferenced
                .get(name)
                .cloned()
                .unwrap_or_else(|| raw.clone());
            items.insert(
                reference.clone(),
                ReferenceItem {
                    name: name.clone(),
                    reference,
                    raw: raw.clone(),
                    dereferenced: dereferenced_body,
                    ty: None,
                    dependencies: Vec::new(),
                },
            );
        }
        Self { items }
    }

    /// Phase two: compile every raw body and store descriptor + dependencies.
    pub fn resolve_all(mut self, support_types: &SupportTypes) -> Result<Self> {
        let references: Vec<String> = self.items.keys().cloned().collect();
        for reference in references {
            let raw = match self.items.get(&reference) {
                Some(item) => item.raw.clone(),
                None => continue,
            };
            let compiled = compile(&reference, &raw, &self, support_types, CompileMode::WithRef)?;
            if let Some(item) = self.items.get_mut(&reference) {
                item.ty = Some(compiled.descriptor);
                item.dependencies = compiled.dependencies;
            }
        }
        Ok(self)
    }

    /// Look up an item by its canonical reference string.
    pub fn get(&self, reference: &str) -> Option<&ReferenceItem> {
        self.items.get(reference)
    }

    /// Name of the schema a reference string points at, if registered.
    pub fn name_for(&self, reference: &str) -> Option<&str> {
        self.items.get(reference).map(|item| item.name.as_str())
    }

    /// Iterate items in registration (declaration) order.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
