//! Operation drivers.
//!
//! [`generate`] is the entry point of a full run: it loads and normalizes
//! the input document, then executes the configured operations in a fixed
//! order, codegen first, document transformation second. Both operations
//! read the same immutable snapshot, so their outputs never observe each
//! other's mutations.

// Internal imports (std, crate)
use crate::config::{CodegenKind, CodegenOptions, Config};
use crate::contracts::{make_handler_contract, route_schema, HandlerContract, RouteSchema};
use crate::document::{normalize_document, Document};
use crate::error::Result;
use crate::openapi::{method_entries, operation_id, Method};
use crate::routes::group_by_first_tag;
use crate::schema::{ReferenceItem, ReferenceMap};
use crate::support::{load_support_types, SupportTypes};
use crate::transform::run_openapi_operation;
use std::path::Path;

// External imports (alphabetized)
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tokio::fs;

/// One route registration of the router model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRegistration {
    pub method: Method,
    pub path: String,
    /// Operation id the registered handler is named after.
    pub handler: String,
    /// Validation model, absent for `no_schemas` runs and schema-less
    /// operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<RouteSchema>,
}

/// Everything one codegen run produced.
#[derive(Debug, Serialize)]
pub struct CodegenArtifacts {
    /// Compiled named types, in declaration order.
    pub types: Vec<ReferenceItem>,
    /// Handler contracts grouped by tag.
    pub contracts: IndexMap<String, Vec<HandlerContract>>,
    /// Route registrations grouped by tag.
    pub router: IndexMap<String, Vec<RouteRegistration>>,
}

/// Run the codegen operation over a document snapshot.
///
/// Returns `None` when the document has no named component schemas to
/// compile. Artifacts are written as JSON models under the configured
/// output directory, gated by the codegen kind: types always, contracts for
/// `contracts` and `fastify`, the router for `fastify` only.
pub async fn run_codegen_operation(
    openapi: &Document,
    options: &CodegenOptions,
) -> Result<Option<CodegenArtifacts>> {
    let schemas = openapi
        .document()
        .pointer("/components/schemas")
        .and_then(Value::as_object);
    let dereferenced = openapi
        .dereferenced()
        .pointer("/components/schemas")
        .and_then(Value::as_object);
    let (Some(schemas), Some(dereferenced)) = (schemas, dereferenced) else {
        log::warn!("The document has no `components.schemas`, skipping codegen.");
        return Ok(None);
    };

    let support_types = match &options.support_types {
        Some(dir) => load_support_types(dir).await?,
        None => SupportTypes::default(),
    };

    let reference_map = ReferenceMap::build(schemas, dereferenced).resolve_all(&support_types)?;
    let paths = openapi.document().get("paths").unwrap_or(&Value::Null);
    let grouped = group_by_first_tag(paths);

    let wants_contracts = options.kind.wants_contracts();
    let wants_schemas = options.kind.wants_route_schemas();
    let wants_router = matches!(options.kind, CodegenKind::Fastify { .. });

    let mut contracts: IndexMap<String, Vec<HandlerContract>> = IndexMap::new();
    let mut router: IndexMap<String, Vec<RouteRegistration>> = IndexMap::new();
    if wants_contracts {
        for (tag, routes) in &grouped {
            let mut tag_contracts = Vec::new();
            let mut registrations = Vec::new();
            for route in routes {
                for (method, operation) in method_entries(&route.item) {
                    let id = operation_id(operation)?;
                    let twin = openapi
                        .dereferenced()
                        .get("paths")
                        .and_then(|paths| paths.get(&route.path))
                        .and_then(|item| item.get(method.as_str()))
                        .unwrap_or(operation);

                    tag_contracts.push(make_handler_contract(
                        id,
                        operation,
                        twin,
                        &reference_map,
                    )?);
                    if wants_router {
                        let schema = if wants_schemas {
                            route_schema(operation, &reference_map)
                        } else {
                            None
                        };
                        registrations.push(RouteRegistration {
                            method,
                            path: route.path.clone(),
                            handler: id.to_string(),
                            schema,
                        });
                    }
                }
            }
            contracts.insert(tag.clone(), tag_contracts);
            if wants_router {
                router.insert(tag.clone(), registrations);
            }
        }
    }

    let artifacts = CodegenArtifacts {
        types: reference_map.iter().cloned().collect(),
        contracts,
        router,
    };

    if let Some(output) = &options.output {
        write_artifacts(&artifacts, options, output).await?;
    }

    Ok(Some(artifacts))
}

async fn write_artifacts(
    artifacts: &CodegenArtifacts,
    options: &CodegenOptions,
    output: &Path,
) -> Result<()> {
    fs::create_dir_all(output).await?;
    fs::write(
        output.join("types.json"),
        serde_json::to_string_pretty(&artifacts.types)?,
    )
    .await?;
    if options.kind.wants_contracts() {
        fs::write(
            output.join("contracts.json"),
            serde_json::to_string_pretty(&artifacts.contracts)?,
        )
        .await?;
    }
    if matches!(options.kind, CodegenKind::Fastify { .. }) {
        fs::write(
            output.join("router.json"),
            serde_json::to_string_pretty(&artifacts.router)?,
        )
        .await?;
    }
    log::info!("Codegen artifacts written at {}", output.display());
    Ok(())
}

/// Load the input document and apply the configured normalization.
pub async fn load_document(config: &Config) -> Result<Document> {
    let document = Document::from_file(&config.input).await?;
    normalize_document(&document, config)
}

/// Run every configured operation over the input document.
pub async fn generate(config: &Config) -> Result<Document> {
    config.validate()?;
    let document = load_document(config).await?;

    if let Some(codegen) = &config.operations.codegen {
        log::info!("Codegen >");
        run_codegen_operation(&document, codegen).await?;
    }

    if let Some(openapi) = &config.operations.openapi {
        log::info!("Openapi >");
        return run_openapi_operation(document, openapi, config).await;
    }

    Ok(document)
}
