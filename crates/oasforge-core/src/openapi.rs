//! Shared OpenAPI document helpers.
//!
//! Everything here works directly over `serde_json::Value` trees: the HTTP
//! method vocabulary, `$ref` predicates and the small accessors used by both
//! the transform pipeline and contract extraction.

// Internal imports (std, crate)
use crate::error::{Error, Result};
use std::fmt;

// External imports (alphabetized)
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP methods an OpenAPI path item can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl Method {
    /// Every method, in OpenAPI path item field order.
    pub const ALL: [Method; 8] = [
        Method::Get,
        Method::Put,
        Method::Post,
        Method::Delete,
        Method::Options,
        Method::Head,
        Method::Patch,
        Method::Trace,
    ];

    /// Order used to pick the representative operation of a path when
    /// grouping routes by tag.
    pub const GROUPING_PRIORITY: [Method; 8] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
        Method::Options,
        Method::Trace,
        Method::Head,
    ];

    /// Parse a path item key, case insensitive.
    pub fn parse(s: &str) -> Option<Method> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(Method::Get),
            "put" => Some(Method::Put),
            "post" => Some(Method::Post),
            "delete" => Some(Method::Delete),
            "options" => Some(Method::Options),
            "head" => Some(Method::Head),
            "patch" => Some(Method::Patch),
            "trace" => Some(Method::Trace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Put => "put",
            Method::Post => "post",
            Method::Delete => "delete",
            Method::Options => "options",
            Method::Head => "head",
            Method::Patch => "patch",
            Method::Trace => "trace",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when `value` is an object carrying a `$ref` key.
pub fn is_ref(value: &Value) -> bool {
    value.get("$ref").is_some()
}

/// The `$ref` string of a reference object, if any.
pub fn ref_string(value: &Value) -> Option<&str> {
    value.get("$ref").and_then(Value::as_str)
}

/// Method entries of a path item, in declaration order.
///
/// Non-method keys (`parameters`, `summary`, extensions) are skipped, as are
/// method keys whose value is not an object.
pub fn method_entries(path_item: &Value) -> Vec<(Method, &Value)> {
    path_item
        .as_object()
        .map(|item| {
            item.iter()
                .filter_map(|(key, value)| {
                    let method = Method::parse(key)?;
                    value.as_object()?;
                    Some((method, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The operation's `operationId`, required for contract and route naming.
pub fn operation_id(operation: &Value) -> Result<&str> {
    operation
        .get("operationId")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::openapi("An operationId is required in the operation object to generate contracts and routes")
        })
}

/// Extract the JSON schema reference of a request body or response object.
///
/// Accepts the object itself being a `$ref`, or a reference at
/// `content."application/json".schema.$ref`. Anything else yields `None`.
pub fn json_schema_ref(value: Option<&Value>) -> Option<&str> {
    let value = value?;
    if let Some(reference) = ref_string(value) {
        return Some(reference);
    }
    value
        .get("content")
        .and_then(|content| content.get("application/json"))
        .and_then(|media_type| media_type.get("schema"))
        .and_then(ref_string)
}
