//! Document transformation pipeline.
//!
//! [`run_openapi_operation`] threads a [`Document`] through the configured
//! stages in a fixed order: `pre_transform`, CORS, security schemes, gateway
//! integration, `post_transform`. A stage runs iff its configuration entry is
//! present, and each stage produces a fresh snapshot through
//! [`Document::update_with`]. The transformed document is then validated
//! against the OpenAPI structural model and persisted, unless the operation
//! is a dry run.

// Internal imports (std, crate)
use crate::config::{Config, OpenApiOptions};
use crate::document::Document;
use crate::error::{Error, Result};

// External imports (alphabetized)
use tokio::fs;

pub mod cors;
pub mod gateway;
pub mod security;

/// Run the document transformation operation.
///
/// Returns the final snapshot so callers can inspect the transformed
/// document even when persistence was skipped.
pub async fn run_openapi_operation(
    openapi: Document,
    options: &OpenApiOptions,
    config: &Config,
) -> Result<Document> {
    let mut document = openapi;

    if let Some(pre_transform) = &options.pre_transform {
        document = document.update_with(|doc| {
            pre_transform(doc, config).map_err(|e| {
                log::error!("Could not pre-transform the document.");
                Error::hook(e)
            })
        })?;
    }

    if let Some(transformation) = &options.transformation {
        if let Some(update_route) = &transformation.cors {
            document = document.update_with(|doc| cors::apply_cors(doc, update_route))?;
        }
        if let Some(security_schemes) = &transformation.security_schemes {
            document =
                document.update_with(|doc| security::apply_security(doc, security_schemes))?;
        }
        if let Some(gateway_options) = &transformation.api_gateway_integration {
            document = document
                .update_with(|doc| gateway::apply_gateway_integration(doc, gateway_options))?;
        }
    }

    if let Some(post_transform) = &options.post_transform {
        document = document.update_with(|doc| {
            post_transform(doc, config).map_err(|e| {
                log::error!("Could not post-transform the document.");
                Error::hook(e)
            })
        })?;
    }

    if options.validate_schema {
        if let Err(e) = document.validate() {
            log::error!("The transformed document does not follow the OpenAPI specification.");
            return Err(e);
        }
    }

    if options.dry_run {
        log::info!("The transformed document is valid but was not saved (dry run).");
    } else if let Some(output) = &options.output {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(output, document.to_json()?).await.map_err(|e| {
            log::error!("Could not save file {}", output.display());
            e
        })?;
        log::info!("Successfully written file at {}", output.display());
    } else {
        log::error!(
            "`operations.openapi.output` is not defined, the transformed document was not saved"
        );
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        GatewayIntegrationOptions, SecuritySchemesOptions, TransformationOptions,
    };
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn petstore() -> Document {
        Document::new(json!({
            "openapi": "3.0.0",
            "info": {"title": "petstore", "version": "1.0.0"},
            "paths": {
                "/pets": {
                    "get": {
                        "operationId": "listPets",
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            },
            "components": {}
        }))
        .unwrap()
    }

    fn config() -> Config {
        Config::new("petstore", "openapi.yaml")
    }

    fn scheme_map() -> serde_json::Map<String, Value> {
        json!({"petstore_auth": {"type": "apiKey", "name": "x-api-key", "in": "header"}})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn runs_the_stages_in_order() {
        let options = OpenApiOptions {
            dry_run: true,
            validate_schema: false,
            transformation: Some(
                TransformationOptions {
                    cors: None,
                    security_schemes: Some(SecuritySchemesOptions::new(scheme_map())),
                    api_gateway_integration: Some(
                        GatewayIntegrationOptions::new("https://api.example.com/v1")
                            .with_route_integration(Box::new(|_, _, default| Ok(default))),
                    ),
                }
                .with_cors(Box::new(|_, default| Ok(Some(default)))),
            ),
            ..OpenApiOptions::default()
        }
        .with_pre_transform(Box::new(|mut doc, _| {
            doc["info"]["x-stage"] = json!("pre");
            Ok(doc)
        }))
        .with_post_transform(Box::new(|mut doc, _| {
            // The CORS options operation must already be installed here.
            assert!(doc["paths"]["/pets"].get("options").is_some());
            doc["info"]["x-stage"] = json!("post");
            Ok(doc)
        }));

        let document = run_openapi_operation(petstore(), &options, &config())
            .await
            .unwrap();
        let raw = document.document();
        assert_eq!(raw["info"]["x-stage"], "post");
        assert_eq!(raw["paths"]["/pets"]["options"]["summary"], "CORS");
        assert_eq!(
            raw["paths"]["/pets"]["get"]["security"],
            json!([{"petstore_auth": []}])
        );
        assert_eq!(
            raw["paths"]["/pets"]["get"]["x-amazon-apigateway-integration"]["uri"],
            "https://api.example.com/v1/pets"
        );
    }

    #[tokio::test]
    async fn skips_missing_stages() {
        let options = OpenApiOptions {
            dry_run: true,
            validate_schema: false,
            ..OpenApiOptions::default()
        };
        let before = petstore();
        let document = run_openapi_operation(before.clone(), &options, &config())
            .await
            .unwrap();
        assert_eq!(document.document(), before.document());
    }

    #[tokio::test]
    async fn writes_the_raw_document_to_the_output_file() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out").join("openapi.json");
        let options = OpenApiOptions {
            output: Some(output.clone()),
            ..OpenApiOptions::default()
        };

        run_openapi_operation(petstore(), &options, &config())
            .await
            .unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, *petstore().document());
    }

    #[tokio::test]
    async fn dry_run_skips_persistence() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("openapi.json");
        let options = OpenApiOptions {
            output: Some(output.clone()),
            dry_run: true,
            ..OpenApiOptions::default()
        };

        run_openapi_operation(petstore(), &options, &config())
            .await
            .unwrap();
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn schema_validation_failures_are_reported() {
        // `info.version` is required by the structural model.
        let document = Document::new(json!({
            "openapi": "3.0.0",
            "info": {"title": "petstore"},
            "paths": {}
        }))
        .unwrap();
        let options = OpenApiOptions {
            dry_run: true,
            ..OpenApiOptions::default()
        };

        let err = run_openapi_operation(document.clone(), &options, &config())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // The same document passes when validation is disabled.
        let options = OpenApiOptions {
            dry_run: true,
            validate_schema: false,
            ..OpenApiOptions::default()
        };
        assert!(run_openapi_operation(document, &options, &config())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn hook_failures_stop_the_pipeline() {
        let options = OpenApiOptions {
            dry_run: true,
            ..OpenApiOptions::default()
        }
        .with_pre_transform(Box::new(|_, _| Err("refused".into())));

        let err = run_openapi_operation(petstore(), &options, &config())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Hook(_)));
    }
}
