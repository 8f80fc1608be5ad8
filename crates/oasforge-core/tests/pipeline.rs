//! End-to-end tests for the oasforge-core library
//!
//! These drive a small petstore document through the full transformation
//! pipeline and the codegen operation, the way the CLI does, and check the
//! observable outputs: the transformed document halves, the persisted file
//! and the generated models.

use oasforge_core::config::{
    CodegenKind, CodegenOptions, Config, GatewayIntegrationOptions, OpenApiOptions, Operations,
    SecurityDecision, SecuritySchemesOptions, TransformationOptions,
};
use oasforge_core::openapi::Method;
use oasforge_core::schema::{Dependency, Field, PrimitiveKind, TypeDescriptor};
use oasforge_core::{generate, run_codegen_operation, run_openapi_operation, Document};
use serde_json::{json, Value};
use tempfile::tempdir;

/// A petstore document exercising references, a reference cycle, query and
/// path parameters and a referenced request body.
fn petstore() -> Value {
    json!({
        "openapi": "3.0.0",
        "info": {"title": "Swagger Petstore", "version": "1.0.0"},
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "listPets",
                    "tags": ["pets"],
                    "parameters": [
                        {"name": "limit", "in": "query", "schema": {"type": "integer"}}
                    ],
                    "responses": {
                        "200": {
                            "description": "A paged array of pets",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/Pets"}
                                }
                            }
                        }
                    }
                },
                "post": {
                    "operationId": "createPet",
                    "tags": ["pets"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/Pet"}
                            }
                        }
                    },
                    "responses": {"201": {"description": "Null response"}}
                }
            },
            "/pets/{petId}": {
                "get": {
                    "operationId": "showPetById",
                    "tags": ["pets"],
                    "parameters": [
                        {"name": "petId", "in": "path", "required": true,
                         "schema": {"type": "string"}}
                    ],
                    "responses": {
                        "200": {
                            "description": "A single pet",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/Pet"}
                                }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Pet": {
                    "type": "object",
                    "required": ["id", "name"],
                    "properties": {
                        "id": {"type": "integer"},
                        "name": {"type": "string"},
                        "tag": {"type": "string"}
                    }
                },
                "Pets": {
                    "type": "array",
                    "items": {"$ref": "#/components/schemas/Pet"}
                },
                "Node": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "string"},
                        "next": {"$ref": "#/components/schemas/Node"}
                    }
                }
            }
        }
    })
}

#[tokio::test]
async fn transforms_a_document_end_to_end() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out").join("openapi.json");

    let schemes = json!({
        "api_key": {"type": "apiKey", "name": "x-api-key", "in": "header"},
        "admin_key": {"type": "apiKey", "name": "x-admin-key", "in": "header"}
    });
    let mut gateway = GatewayIntegrationOptions::new("https://backend.example.com/api/")
        .with_route_integration(Box::new(|_, _, mut default| {
            default["timeoutInMillis"] = json!(29000);
            Ok(default)
        }));
    gateway.security_schemes_extensions = Some(
        json!({"api_key": {"x-amazon-apigateway-authtype": "custom"}})
            .as_object()
            .cloned()
            .unwrap(),
    );
    gateway.binary_media_types = Some(vec!["image/png".to_string()]);

    let transformation = TransformationOptions {
        cors: None,
        security_schemes: Some(
            SecuritySchemesOptions::new(schemes.as_object().cloned().unwrap())
                .with_filter_security(Box::new(|path, _, default| {
                    assert_eq!(default, &json!([{"api_key": []}, {"admin_key": []}]));
                    if path == "/pets/{petId}" {
                        Ok(SecurityDecision::None)
                    } else {
                        Ok(SecurityDecision::Default)
                    }
                })),
        ),
        api_gateway_integration: Some(gateway),
    }
    .with_cors(Box::new(|path, default| {
        if path == "/pets" {
            Ok(Some(default))
        } else {
            Ok(None)
        }
    }));

    let options = OpenApiOptions {
        output: Some(output.clone()),
        transformation: Some(transformation),
        ..OpenApiOptions::default()
    }
    .with_pre_transform(Box::new(|mut document, config| {
        document["info"]["description"] = json!(format!("Managed by {}", config.name));
        Ok(document)
    }))
    .with_post_transform(Box::new(|document, _| {
        // The stages have already run when the post hook sees the document.
        assert!(document["paths"]["/pets"]["get"]["security"].is_array());
        Ok(document)
    }));

    let config = Config::new("petstore", "unused.yaml");
    let input = Document::new(petstore()).unwrap();
    let document = run_openapi_operation(input, &options, &config).await.unwrap();
    let raw = document.document();

    // The pre transform survived every stage.
    assert_eq!(raw["info"]["description"], "Managed by petstore");

    // CORS was installed on /pets only, with the first operation's
    // parameters copied onto the synthetic options operation.
    let cors = &raw["paths"]["/pets"]["options"];
    assert_eq!(cors["summary"], "CORS");
    assert_eq!(cors["parameters"][0]["name"], "limit");
    assert!(raw["paths"]["/pets/{petId}"].get("options").is_none());

    // The configured schemes were installed and drive the default security
    // list; the filter stripped /pets/{petId} and options stays untouched.
    assert_eq!(
        raw["components"]["securitySchemes"]["admin_key"]["name"],
        "x-admin-key"
    );
    assert_eq!(
        raw["paths"]["/pets"]["get"]["security"],
        json!([{"api_key": []}, {"admin_key": []}])
    );
    assert!(raw["paths"]["/pets/{petId}"]["get"].get("security").is_none());
    assert!(cors.get("security").is_none());

    // The gateway integration lands on every operation, options included.
    let integration = &raw["paths"]["/pets/{petId}"]["get"]["x-amazon-apigateway-integration"];
    assert_eq!(integration["type"], "http_proxy");
    assert_eq!(integration["httpMethod"], "GET");
    assert_eq!(
        integration["uri"],
        "https://backend.example.com/api/pets/{petId}"
    );
    assert_eq!(integration["timeoutInMillis"], 29000);
    assert_eq!(
        integration["cacheKeyParameters"],
        json!(["integration.request.path.petId"])
    );
    assert_eq!(
        cors["x-amazon-apigateway-integration"]["httpMethod"],
        "OPTIONS"
    );

    // Scheme extensions and binary media types.
    assert_eq!(
        raw["components"]["securitySchemes"]["api_key"]["x-amazon-apigateway-authtype"],
        "custom"
    );
    assert_eq!(
        raw["x-amazon-apigateway-binary-media-types"],
        json!(["image/png"])
    );

    // The raw half keeps its references while the dereferenced half expands
    // them, synthetic operations included.
    assert_eq!(
        raw["paths"]["/pets"]["get"]["responses"]["200"]["content"]["application/json"]["schema"]
            ["$ref"],
        "#/components/schemas/Pets"
    );
    let dereferenced = document.dereferenced();
    assert_eq!(dereferenced["paths"]["/pets"]["options"]["summary"], "CORS");
    assert_eq!(
        dereferenced["paths"]["/pets"]["get"]["responses"]["200"]["content"]["application/json"]
            ["schema"]["type"],
        "array"
    );

    // The persisted file is the raw half, pretty printed.
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        document.to_json().unwrap()
    );
}

#[tokio::test]
async fn compiles_component_schemas_with_their_dependencies() {
    let options = CodegenOptions {
        output: None,
        support_types: None,
        kind: CodegenKind::Typings,
    };
    let document = Document::new(petstore()).unwrap();
    let artifacts = run_codegen_operation(&document, &options)
        .await
        .unwrap()
        .unwrap();

    let names: Vec<&str> = artifacts.types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Pet", "Pets", "Node"]);

    let pet = &artifacts.types[0];
    assert_eq!(
        pet.ty.as_ref().unwrap(),
        &TypeDescriptor::Interface(vec![
            Field {
                name: "id".to_string(),
                ty: TypeDescriptor::Primitive(PrimitiveKind::Integer),
                optional: false,
            },
            Field {
                name: "name".to_string(),
                ty: TypeDescriptor::Primitive(PrimitiveKind::String),
                optional: false,
            },
            Field {
                name: "tag".to_string(),
                ty: TypeDescriptor::Primitive(PrimitiveKind::String),
                optional: true,
            },
        ])
    );
    assert!(pet.dependencies.is_empty());

    let pets = &artifacts.types[1];
    assert_eq!(
        pets.ty.as_ref().unwrap(),
        &TypeDescriptor::array(TypeDescriptor::identifier("Pet"))
    );
    assert_eq!(
        pets.dependencies,
        vec![Dependency::schema("Pet", "#/components/schemas/Pet")]
    );

    // The self reference compiles to an identifier instead of recursing.
    let node = &artifacts.types[2];
    assert_eq!(
        node.ty.as_ref().unwrap(),
        &TypeDescriptor::Interface(vec![
            Field {
                name: "value".to_string(),
                ty: TypeDescriptor::Primitive(PrimitiveKind::String),
                optional: true,
            },
            Field {
                name: "next".to_string(),
                ty: TypeDescriptor::identifier("Node"),
                optional: true,
            },
        ])
    );
    assert_eq!(
        node.dependencies,
        vec![Dependency::schema("Node", "#/components/schemas/Node")]
    );
}

#[tokio::test]
async fn builds_contracts_and_router_models_by_tag() {
    let options = CodegenOptions {
        output: None,
        support_types: None,
        kind: CodegenKind::Fastify {
            iots_router: false,
            no_schemas: false,
        },
    };
    let document = Document::new(petstore()).unwrap();
    let artifacts = run_codegen_operation(&document, &options)
        .await
        .unwrap()
        .unwrap();

    let contracts = &artifacts.contracts["pets"];
    let names: Vec<&str> = contracts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["ListPets", "CreatePet", "ShowPetById"]);

    let list_pets = &contracts[0];
    assert_eq!(list_pets.arguments.len(), 1);
    assert_eq!(list_pets.arguments[0].name, "ListPets_query");
    assert_eq!(
        list_pets.arguments[0].descriptor.as_ref().unwrap(),
        &TypeDescriptor::Interface(vec![Field {
            name: "limit".to_string(),
            ty: TypeDescriptor::Primitive(PrimitiveKind::Integer),
            optional: true,
        }])
    );
    assert!(list_pets.imports.is_empty());

    // A referenced body becomes an import, not an inline descriptor.
    let create_pet = &contracts[1];
    assert_eq!(create_pet.arguments.len(), 1);
    assert_eq!(create_pet.arguments[0].name, "Pet");
    assert!(create_pet.arguments[0].descriptor.is_none());
    assert_eq!(create_pet.imports, ["Pet"]);

    let registrations = &artifacts.router["pets"];
    assert_eq!(registrations.len(), 3);

    assert_eq!(registrations[0].method, Method::Get);
    assert_eq!(registrations[0].path, "/pets");
    assert_eq!(registrations[0].handler, "listPets");
    let list_schema = registrations[0].schema.as_ref().unwrap();
    assert_eq!(
        list_schema.querystring.as_ref().unwrap(),
        &json!({
            "type": "object",
            "properties": {"limit": {"type": "integer"}},
            "required": []
        })
    );
    assert_eq!(list_schema.responses.as_ref().unwrap()["200"], "Pets");

    let create_schema = registrations[1].schema.as_ref().unwrap();
    assert_eq!(create_schema.body.as_deref(), Some("Pet"));
    assert!(create_schema.responses.is_none());

    assert_eq!(registrations[2].path, "/pets/{petId}");
    let show_schema = registrations[2].schema.as_ref().unwrap();
    assert_eq!(
        show_schema.params.as_ref().unwrap(),
        &json!({
            "type": "object",
            "properties": {"petId": {"type": "string"}},
            "required": ["petId"]
        })
    );
    assert_eq!(show_schema.responses.as_ref().unwrap()["200"], "Pet");
}

#[tokio::test]
async fn generate_runs_both_operations_from_one_config() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("petstore.yaml");
    let codegen_dir = dir.path().join("generated");
    let openapi_out = dir.path().join("dist").join("openapi.json");
    std::fs::write(&input, serde_yaml::to_string(&petstore()).unwrap()).unwrap();

    let mut config = Config::new("petstore-api", &input);
    config.version = "2.0.0".to_string();
    config.operations = Operations {
        openapi: Some(OpenApiOptions {
            output: Some(openapi_out.clone()),
            ..OpenApiOptions::default()
        }),
        codegen: Some(CodegenOptions {
            output: Some(codegen_dir.clone()),
            support_types: None,
            kind: CodegenKind::Typings,
        }),
    };

    let document = generate(&config).await.unwrap();

    // The configured identity was stamped onto the document.
    assert_eq!(document.document()["info"]["title"], "petstore-api");
    assert_eq!(document.document()["info"]["version"], "2.0.0");

    // Both operations persisted their outputs.
    let types: Value =
        serde_json::from_str(&std::fs::read_to_string(codegen_dir.join("types.json")).unwrap())
            .unwrap();
    let names: Vec<&str> = types
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, ["Pet", "Pets", "Node"]);

    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&openapi_out).unwrap()).unwrap();
    assert_eq!(written["info"]["title"], "petstore-api");
}
