//! Handler contracts and route registration models.
//!
//! A [`HandlerContract`] is the typed surface of one operation: one argument
//! per parameter location plus an optional body, each compiled into a
//! [`TypeDescriptor`], together with the list of named types the handler
//! imports. A [`RouteSchema`] is the runtime validation model of the same
//! operation: raw parameter schemas and schema reference names per response
//! status.
//!
//! Arguments are merged from the raw operation so reference parameters can
//! be detected and skipped, while their schemas are read from the
//! dereferenced twin so the `noRef` compilation never meets a `$ref`.

// Internal imports (std, crate)
use crate::error::Result;
use crate::openapi::{is_ref, json_schema_ref, ref_string};
use crate::schema::{compile, CompileMode, ReferenceMap, TypeDescriptor};
use crate::support::SupportTypes;

// External imports (alphabetized)
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Where a handler argument is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArgumentKind {
    Body,
    Querystring,
    Params,
    Headers,
}

/// One typed argument of a handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerArgument {
    #[serde(rename = "type")]
    pub kind: ArgumentKind,
    pub name: String,
    /// Compiled shape; `None` when the argument is an imported named type.
    #[serde(rename = "descriptor", skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<TypeDescriptor>,
    pub optional: bool,
}

/// The typed surface of one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerContract {
    pub name: String,
    pub arguments: Vec<HandlerArgument>,
    pub imports: Vec<String>,
}

/// Runtime validation model of one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub querystring: Option<Value>,
    /// Name of the body schema, when the body is a schema reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Response status to schema name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<IndexMap<String, String>>,
}

enum BodyContract {
    Import(String),
    Local {
        descriptor: TypeDescriptor,
        optional: bool,
    },
}

/// Build the handler contract of one operation.
pub fn make_handler_contract(
    operation_id: &str,
    raw_operation: &Value,
    dereferenced_operation: &Value,
    reference_map: &ReferenceMap,
) -> Result<HandlerContract> {
    let handler_name = capitalize(operation_id);
    let empty = Vec::new();
    let raw_parameters = raw_operation
        .get("parameters")
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    let dereferenced_parameters = dereferenced_operation
        .get("parameters")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    let mut imports = Vec::new();
    let body = parse_body(
        operation_id,
        raw_operation,
        dereferenced_operation,
        reference_map,
        &mut imports,
    )?;
    scan_parameter_imports(raw_parameters, reference_map, &mut imports);

    let merged = merge_parameters(operation_id, raw_parameters, dereferenced_parameters);
    let support_types = SupportTypes::default();
    let mut arguments = Vec::new();
    for (location, schema) in &merged {
        let Some(kind) = location_kind(operation_id, location) else {
            continue;
        };
        let name = format!("{handler_name}_{location}");
        let compiled = compile(&name, schema, reference_map, &support_types, CompileMode::NoRef)?;
        arguments.push(HandlerArgument {
            kind,
            name,
            descriptor: Some(compiled.descriptor),
            optional: false,
        });
    }

    match body {
        Some(BodyContract::Import(name)) => arguments.push(HandlerArgument {
            kind: ArgumentKind::Body,
            name,
            descriptor: None,
            optional: false,
        }),
        Some(BodyContract::Local {
            descriptor,
            optional,
        }) => arguments.push(HandlerArgument {
            kind: ArgumentKind::Body,
            name: format!("{handler_name}_body"),
            descriptor: Some(descriptor),
            optional,
        }),
        None => {}
    }

    Ok(HandlerContract {
        name: handler_name,
        arguments,
        imports,
    })
}

/// Build the route registration model of one operation, if it has one.
pub fn route_schema(operation: &Value, reference_map: &ReferenceMap) -> Option<RouteSchema> {
    let params = location_schema(operation, "path");
    let querystring = location_schema(operation, "query");
    let body = json_schema_ref(operation.get("requestBody"))
        .and_then(|reference| reference_map.name_for(reference))
        .map(str::to_string);
    let responses = response_schema_names(operation, reference_map);

    if params.is_none() && querystring.is_none() && body.is_none() && responses.is_none() {
        return None;
    }
    Some(RouteSchema {
        params,
        querystring,
        body,
        responses,
    })
}

/// Merge the operation parameters into one synthetic object schema per
/// location, in first-encounter order. Reference parameters are skipped;
/// schemas come from the dereferenced twin at the same index.
fn merge_parameters(
    operation_id: &str,
    raw_parameters: &[Value],
    dereferenced_parameters: &[Value],
) -> IndexMap<String, Value> {
    let mut merged: IndexMap<String, (Vec<Value>, Map<String, Value>)> = IndexMap::new();

    for (index, parameter) in raw_parameters.iter().enumerate() {
        if let Some(reference) = ref_string(parameter) {
            log::warn!(
                "{operation_id} > Parameter ref {reference} not yet supported in handler definition"
            );
            continue;
        }
        let Some(name) = parameter.get("name").and_then(Value::as_str) else {
            continue;
        };
        let Some(location) = parameter.get("in").and_then(Value::as_str) else {
            continue;
        };
        let required = parameter
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let schema = dereferenced_parameters
            .get(index)
            .and_then(|twin| twin.get("schema"))
            .or_else(|| parameter.get("schema"));

        let entry = merged.entry(location.to_string()).or_default();
        if required {
            entry.0.push(Value::String(name.to_string()));
        }
        if let Some(schema) = schema {
            entry.1.insert(name.to_string(), schema.clone());
        }
    }

    merged
        .into_iter()
        .map(|(location, (required, properties))| {
            let mut schema = Map::new();
            schema.insert("type".to_string(), Value::String("object".to_string()));
            schema.insert("required".to_string(), Value::Array(required));
            schema.insert("properties".to_string(), Value::Object(properties));
            (location, Value::Object(schema))
        })
        .collect()
}

fn location_kind(operation_id: &str, location: &str) -> Option<ArgumentKind> {
    match location.to_lowercase().as_str() {
        "body" => Some(ArgumentKind::Body),
        "query" => Some(ArgumentKind::Querystring),
        "path" => Some(ArgumentKind::Params),
        "header" | "headers" => Some(ArgumentKind::Headers),
        other => {
            log::warn!("{operation_id} > Unknown parameter location: {other}. Skipping.");
            None
        }
    }
}

fn parse_body(
    operation_id: &str,
    raw_operation: &Value,
    dereferenced_operation: &Value,
    reference_map: &ReferenceMap,
    imports: &mut Vec<String>,
) -> Result<Option<BodyContract>> {
    let Some(request_body) = raw_operation.get("requestBody") else {
        return Ok(None);
    };
    if is_ref(request_body) {
        log::warn!(
            "{operation_id} handler body > ref is only supported on 'application/json' type. Typed with any."
        );
        return Ok(None);
    }

    let schema = request_body
        .get("content")
        .and_then(|content| content.get("application/json"))
        .and_then(|media_type| media_type.get("schema"));
    let Some(schema) = schema else {
        log::warn!(
            "{operation_id} handler body > only 'application/json' type is supported. Typed with any."
        );
        return Ok(None);
    };

    if let Some(reference) = ref_string(schema) {
        return Ok(add_import(reference, reference_map, imports).map(BodyContract::Import));
    }

    let optional = request_body.get("required").and_then(Value::as_bool) != Some(true);
    let schema = dereferenced_operation
        .pointer("/requestBody/content/application~1json/schema")
        .unwrap_or(schema);
    let context = format!("{operation_id} body");
    let compiled = compile(
        &context,
        schema,
        reference_map,
        &SupportTypes::default(),
        CompileMode::NoRef,
    )?;
    Ok(Some(BodyContract::Local {
        descriptor: compiled.descriptor,
        optional,
    }))
}

/// Record the named types an operation's parameters point at, directly or
/// through a schema (or array items) reference.
fn scan_parameter_imports(
    raw_parameters: &[Value],
    reference_map: &ReferenceMap,
    imports: &mut Vec<String>,
) {
    for parameter in raw_parameters {
        if let Some(reference) = ref_string(parameter) {
            add_import(reference, reference_map, imports);
            continue;
        }
        let Some(schema) = parameter.get("schema") else {
            continue;
        };
        if let Some(reference) = ref_string(schema) {
            add_import(reference, reference_map, imports);
        } else if schema.get("type").and_then(Value::as_str) == Some("array") {
            if let Some(reference) = schema.get("items").and_then(ref_string) {
                add_import(reference, reference_map, imports);
            }
        }
    }
}

fn add_import(
    reference: &str,
    reference_map: &ReferenceMap,
    imports: &mut Vec<String>,
) -> Option<String> {
    match reference_map.name_for(reference) {
        Some(name) => {
            if !imports.iter().any(|existing| existing == name) {
                imports.push(name.to_string());
            }
            Some(name.to_string())
        }
        None => {
            log::warn!("Reference {reference} does not match a known type, skipping import.");
            None
        }
    }
}

fn location_schema(operation: &Value, location: &str) -> Option<Value> {
    let parameters = operation.get("parameters")?.as_array()?;
    let selected: Vec<&Value> = parameters
        .iter()
        .filter(|parameter| parameter.get("in").and_then(Value::as_str) == Some(location))
        .collect();
    if selected.is_empty() {
        return None;
    }

    let mut properties = Map::new();
    let mut required = Vec::new();
    for parameter in selected {
        let Some(name) = parameter.get("name").and_then(Value::as_str) else {
            continue;
        };
        if parameter
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            required.push(Value::String(name.to_string()));
        }
        if let Some(schema) = parameter.get("schema") {
            properties.insert(name.to_string(), schema.clone());
        }
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String("object".to_string()));
    schema.insert("properties".to_string(), Value::Object(properties));
    schema.insert("required".to_string(), Value::Array(required));
    Some(Value::Object(schema))
}

fn response_schema_names(
    operation: &Value,
    reference_map: &ReferenceMap,
) -> Option<IndexMap<String, String>> {
    let responses = operation.get("responses").and_then(Value::as_object)?;
    let mut names = IndexMap::new();
    for (status, response) in responses {
        let name = json_schema_ref(Some(response)).and_then(|reference| reference_map.name_for(reference));
        if let Some(name) = name {
            names.insert(status.clone(), name.to_string());
        }
    }
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
