//! API gateway integration transformation stage.

// Internal imports (std, crate)
use crate::config::{GatewayIntegrationOptions, RouteIntegrationHook};
use crate::error::{Error, Result};
use crate::openapi::Method;

// External imports (alphabetized)
use serde_json::{json, Map, Value};

/// Install an `x-amazon-apigateway-integration` object on every operation.
///
/// The default integration proxies the route to `proxy_base_url` and maps
/// every path parameter of the operation into the gateway cache key and
/// request parameters. The required `route_integration` hook gets the last
/// word on what is installed. Scheme extensions and binary media types are
/// applied afterwards when configured.
pub fn apply_gateway_integration(
    mut document: Value,
    options: &GatewayIntegrationOptions,
) -> Result<Value> {
    let route_integration = options.route_integration.as_ref().ok_or_else(|| {
        Error::precondition(
            "`transformation.api_gateway_integration.route_integration` is a required hook",
        )
    })?;

    apply_route_integration(&mut document, &options.proxy_base_url, route_integration)?;

    if let Some(extensions) = &options.security_schemes_extensions {
        apply_security_extensions(&mut document, extensions)?;
    }

    if let Some(media_types) = &options.binary_media_types {
        if let Some(root) = document.as_object_mut() {
            root.insert(
                "x-amazon-apigateway-binary-media-types".to_string(),
                json!(media_types),
            );
        }
    }

    Ok(document)
}

fn apply_route_integration(
    document: &mut Value,
    proxy_base_url: &str,
    route_integration: &RouteIntegrationHook,
) -> Result<()> {
    let paths = document
        .get_mut("paths")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| Error::precondition("OpenAPI document does not have a `paths` object."))?;

    let base = proxy_base_url.strip_suffix('/').unwrap_or(proxy_base_url);
    let path_keys: Vec<String> = paths.keys().cloned().collect();
    for path_key in path_keys {
        // Joining with string surgery keeps the scheme intact (http:// would
        // otherwise collapse to http:/).
        let route = path_key.strip_prefix('/').unwrap_or(&path_key);
        let uri = format!("{base}/{route}");

        let Some(path_object) = paths.get_mut(&path_key).and_then(Value::as_object_mut) else {
            continue;
        };
        let method_keys: Vec<(String, Method)> = path_object
            .iter()
            .filter(|(_, value)| value.is_object())
            .filter_map(|(key, _)| Method::parse(key).map(|method| (key.clone(), method)))
            .collect();

        for (key, method) in method_keys {
            let parameters = path_object
                .get(&key)
                .and_then(|operation| operation.get("parameters"))
                .and_then(Value::as_array);
            let path_parameters = collect_path_parameters(parameters, &path_key, method);

            let default_integration = make_integration_object(method, &uri, &path_parameters);
            let integration =
                route_integration(&path_key, method, default_integration).map_err(|e| {
                    log::error!("Could not add the gateway integration to route {path_key}");
                    Error::hook(e)
                })?;

            if let Some(operation) = path_object.get_mut(&key).and_then(Value::as_object_mut) {
                operation.insert("x-amazon-apigateway-integration".to_string(), integration);
            }
        }
    }

    Ok(())
}

/// Names of the operation parameters with `in: path`. Reference parameters
/// cannot be inspected here and are skipped.
fn collect_path_parameters(
    parameters: Option<&Vec<Value>>,
    path: &str,
    method: Method,
) -> Vec<String> {
    let Some(parameters) = parameters else {
        return Vec::new();
    };
    parameters
        .iter()
        .filter_map(|parameter| {
            if parameter.get("in").is_none() {
                log::warn!(
                    "{} {path}: Reference path parameters are not supported for the gateway integration, skipping.",
                    method.as_str().to_uppercase()
                );
                return None;
            }
            match parameter.get("in").and_then(Value::as_str) {
                Some("path") => parameter
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            }
        })
        .collect()
}

fn make_integration_object(method: Method, uri: &str, path_parameters: &[String]) -> Value {
    let cache_key_parameters: Vec<String> = path_parameters
        .iter()
        .map(|name| format!("integration.request.path.{name}"))
        .collect();
    let mut request_parameters = Map::new();
    for name in path_parameters {
        request_parameters.insert(
            format!("integration.request.path.{name}"),
            Value::String(format!("method.request.path.{name}")),
        );
    }

    json!({
        "type": "http_proxy",
        "httpMethod": method.as_str().to_uppercase(),
        "uri": uri,
        "passthroughBehavior": "when_no_match",
        "timeoutInMillis": null,
        "cacheKeyParameters": cache_key_parameters,
        "requestParameters": request_parameters
    })
}

fn apply_security_extensions(
    document: &mut Value,
    extensions: &Map<String, Value>,
) -> Result<()> {
    let schemes = document
        .get_mut("components")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            Error::precondition(
                "OpenAPI document does not have a `components` object. Please add it to your file.",
            )
        })?
        .get_mut("securitySchemes")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            Error::precondition(
                "OpenAPI document does not have `securitySchemes` defined. Cannot apply `security_schemes_extensions`.",
            )
        })?;

    for (name, extension) in extensions {
        if let Some(extension) = extension.as_object() {
            let mut merged = schemes
                .get(name)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            for (key, value) in extension {
                merged.insert(key.clone(), value.clone());
            }
            schemes.insert(name.clone(), Value::Object(merged));
        }
    }

    Ok(())
}
