//! Security schemes transformation stage.

// Internal imports (std, crate)
use crate::config::{SecurityDecision, SecuritySchemesOptions};
use crate::error::{Error, Result};
use crate::openapi::Method;

// External imports (alphabetized)
use serde_json::{Map, Value};

/// Install security schemes and per-operation `security` requirements.
///
/// The configured schemes are written under `components.securitySchemes`
/// unless the document already defines some, in which case the existing ones
/// win. The default requirement list names every scheme of the document, and
/// the `filter_security` hook can override it per operation. `options`
/// operations never receive a `security` member.
pub fn apply_security(mut document: Value, options: &SecuritySchemesOptions) -> Result<Value> {
    let default_security = {
        let components = document
            .get_mut("components")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                Error::precondition(
                    "OpenAPI document does not have a `components` object. Please add it to your file.",
                )
            })?;

        if components.contains_key("securitySchemes") {
            log::info!("`securitySchemes` already defined. Skipping securitySchemes assignation.");
        } else {
            components.insert(
                "securitySchemes".to_string(),
                Value::Object(options.scheme.clone()),
            );
        }

        // The defaults name the schemes of the document, not of the config.
        let entries = components
            .get("securitySchemes")
            .and_then(Value::as_object)
            .map(|schemes| {
                schemes
                    .keys()
                    .map(|name| {
                        let mut requirement = Map::new();
                        requirement.insert(name.clone(), Value::Array(Vec::new()));
                        Value::Object(requirement)
                    })
                    .collect()
            })
            .unwrap_or_default();
        Value::Array(entries)
    };

    let paths = document
        .get_mut("paths")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| Error::precondition("OpenAPI document does not have a `paths` object."))?;

    let path_keys: Vec<String> = paths.keys().cloned().collect();
    for path_key in path_keys {
        let Some(path_object) = paths.get_mut(&path_key).and_then(Value::as_object_mut) else {
            continue;
        };
        let method_keys: Vec<(String, Method)> = path_object
            .iter()
            .filter(|(_, value)| value.is_object())
            .filter_map(|(key, _)| Method::parse(key).map(|method| (key.clone(), method)))
            .collect();

        for (key, method) in method_keys {
            if method == Method::Options {
                continue;
            }
            let decision = match &options.filter_security {
                Some(filter) => {
                    filter(&path_key, method, &default_security).map_err(|e| {
                        log::error!("Could not add `security` to route {path_key}");
                        Error::hook(e)
                    })?
                }
                None => SecurityDecision::Default,
            };
            let security = match decision {
                SecurityDecision::Default => default_security.clone(),
                SecurityDecision::Custom(value) => value,
                SecurityDecision::None => continue,
            };
            if let Some(operation) = path_object.get_mut(&key).and_then(Value::as_object_mut) {
                operation.insert("security".to_string(), security);
            }
        }
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scheme_map() -> Map<String, Value> {
        json!({
            "api_key": {"type": "apiKey", "name": "x-api-key", "in": "header"},
            "oauth": {"type": "http", "scheme": "bearer"}
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn petstore() -> Value {
        json!({
            "openapi": "3.0.0",
            "components": {},
            "paths": {
                "/pets": {
                    "get": {"operationId": "listPets", "responses": {"200": {"description": "ok"}}},
                    "options": {"summary": "CORS", "responses": {"200": {"description": "ok"}}},
                    "parameters": []
                }
            }
        })
    }

    #[test]
    fn installs_schemes_and_default_requirements() {
        let options = SecuritySchemesOptions::new(scheme_map());
        let document = apply_security(petstore(), &options).unwrap();

        assert_eq!(
            document["components"]["securitySchemes"]["api_key"]["type"],
            "apiKey"
        );
        assert_eq!(
            document["paths"]["/pets"]["get"]["security"],
            json!([{"api_key": []}, {"oauth": []}])
        );
    }

    #[test]
    fn options_operations_never_receive_security() {
        let options = SecuritySchemesOptions::new(scheme_map());
        let document = apply_security(petstore(), &options).unwrap();

        assert!(document["paths"]["/pets"]["options"]
            .get("security")
            .is_none());
    }

    #[test]
    fn existing_schemes_win_and_drive_the_defaults() {
        let mut input = petstore();
        input["components"]["securitySchemes"] =
            json!({"legacy_auth": {"type": "http", "scheme": "basic"}});

        let options = SecuritySchemesOptions::new(scheme_map());
        let document = apply_security(input, &options).unwrap();

        // The configured schemes were not installed over the existing ones.
        assert!(document["components"]["securitySchemes"]
            .get("api_key")
            .is_none());
        assert_eq!(
            document["paths"]["/pets"]["get"]["security"],
            json!([{"legacy_auth": []}])
        );
    }

    #[test]
    fn the_filter_decides_per_operation() {
        let options = SecuritySchemesOptions::new(scheme_map()).with_filter_security(Box::new(
            |path, method, _default| {
                assert_eq!(path, "/pets");
                assert_eq!(method, Method::Get);
                Ok(SecurityDecision::Custom(json!([{"oauth": ["read"]}])))
            },
        ));

        let document = apply_security(petstore(), &options).unwrap();
        assert_eq!(
            document["paths"]["/pets"]["get"]["security"],
            json!([{"oauth": ["read"]}])
        );
    }

    #[test]
    fn the_filter_can_strip_security() {
        let options = SecuritySchemesOptions::new(scheme_map())
            .with_filter_security(Box::new(|_, _, _| Ok(SecurityDecision::None)));

        let document = apply_security(petstore(), &options).unwrap();
        assert!(document["paths"]["/pets"]["get"].get("security").is_none());
    }

    #[test]
    fn filter_errors_are_reported() {
        let options = SecuritySchemesOptions::new(scheme_map())
            .with_filter_security(Box::new(|_, _, _| Err("refused".into())));

        let err = apply_security(petstore(), &options).unwrap_err();
        assert!(matches!(err, Error::Hook(_)));
    }

    #[test]
    fn a_document_without_components_is_rejected() {
        let options = SecuritySchemesOptions::new(scheme_map());
        let err = apply_security(json!({"openapi": "3.0.0", "paths": {}}), &options).unwrap_err();
        assert!(matches!(err, Error::PipelinePrecondition(_)));
    }
}
