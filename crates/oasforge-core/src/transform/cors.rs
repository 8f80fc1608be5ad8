//! CORS transformation stage.

// Internal imports (std, crate)
use crate::config::CorsHook;
use crate::error::{Error, Result};
use crate::openapi::method_entries;

// External imports (alphabetized)
use serde_json::{json, Value};

/// Install an `options` operation on every path of the document.
///
/// The default descriptor advertises the usual `Access-Control-*` response
/// headers and reuses the parameters of the first declared method of the
/// path. The hook decides per path what gets installed: `Some(value)`
/// becomes the `options` entry, `None` leaves the path without one.
pub fn apply_cors(mut document: Value, update_route: &CorsHook) -> Result<Value> {
    let paths = document
        .get_mut("paths")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| Error::precondition("OpenAPI document does not have a `paths` object."))?;

    let path_keys: Vec<String> = paths.keys().cloned().collect();
    for path_key in path_keys {
        let Some(path_object) = paths.get(&path_key) else {
            continue;
        };
        let parameters = method_entries(path_object)
            .first()
            .and_then(|(_, operation)| operation.get("parameters"))
            .cloned()
            .unwrap_or_else(|| json!([]));

        let default_options = json!({
            "summary": "CORS",
            "description": "",
            "parameters": parameters,
            "responses": {
                "200": {
                    "description": "ok",
                    "content": {},
                    "headers": {
                        "Access-Control-Allow-Origin": { "schema": { "type": "string" } },
                        "Access-Control-Allow-Methods": { "schema": { "type": "string" } },
                        "Access-Control-Allow-Headers": { "schema": { "type": "string" } },
                        "Access-Control-Expose-Headers": { "schema": { "type": "string" } }
                    }
                }
            }
        });

        let installed = update_route(&path_key, default_options).map_err(|e| {
            log::error!("Could not add CORS to route {path_key}");
            Error::hook(e)
        })?;
        if let Some(options_object) = installed {
            if let Some(path_object) = paths.get_mut(&path_key).and_then(Value::as_object_mut) {
                path_object.insert("options".to_string(), options_object);
            }
        }
    }

    Ok(document)
}
