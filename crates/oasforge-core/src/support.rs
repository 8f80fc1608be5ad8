//! Support type registry.
//!
//! Support types back schema `format` values (`date-time`, `uuid`, ...) with
//! dedicated named types shipped alongside the registry directory. The
//! registry is loaded once from a `types.json` manifest and then only read by
//! the compiler; a format miss is a warning, never an error.

// Internal imports (std, crate)
use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// External imports (alphabetized)
use indexmap::IndexMap;
use serde::Deserialize;

/// A named type registered for a schema `format`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportType {
    /// Identifier the compiled type refers to.
    pub export_name: String,
    /// Source file backing the identifier, for downstream import generation.
    pub source_path: PathBuf,
}

/// Registry keyed by schema `format`.
pub type SupportTypes = HashMap<String, SupportType>;

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    export: String,
    /// File name relative to the registry directory, `<format>.ts` when absent.
    file: Option<String>,
}

/// Load the support type registry from `dir`.
///
/// Reads `types.json` in `dir` and checks that every referenced source file
/// exists. Entries with a missing file are skipped with a warning. A missing
/// manifest yields an empty registry; a malformed manifest is an error.
pub async fn load_support_types<P: AsRef<Path>>(dir: P) -> Result<SupportTypes> {
    let dir = dir.as_ref();
    let manifest_path = dir.join("types.json");

    if tokio::fs::metadata(&manifest_path).await.is_err() {
        log::warn!(
            "Support type manifest not found: {}",
            manifest_path.display()
        );
        return Ok(SupportTypes::new());
    }

    let content = tokio::fs::read_to_string(&manifest_path).await?;
    let manifest: IndexMap<String, ManifestEntry> = serde_json::from_str(&content)?;

    let mut types = SupportTypes::new();
    for (format, entry) in manifest {
        let file = entry.file.unwrap_or_else(|| format!("{format}.ts"));
        let source_path = dir.join(&file);
        if tokio::fs::metadata(&source_path).await.is_err() {
            log::warn!(
                "Type {} could not be loaded. File does not exist: {}",
                format,
                source_path.display()
            );
            continue;
        }
        types.insert(
            format,
            SupportType {
                export_name: entry.export,
                source_path,
            },
        );
    }

    Ok(types)
}
