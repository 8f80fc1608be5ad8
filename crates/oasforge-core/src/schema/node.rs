//! Schema node classification.
//!
//! Every JSON value fed to the compiler is first classified into exactly one
//! of three node shapes: a `$ref` reference, a typed node (`type` keyword) or
//! a combinator node (`oneOf` / `allOf` / `anyOf`). Classification is total:
//! anything else is a `SchemaCompilation` error rather than a silent fallback.
//!
//! Precedence follows the input format: `$ref` wins over everything, a
//! declared `type` wins over combinator keywords, and combinator keywords are
//! checked in the order `oneOf`, `allOf`, `anyOf`.

// Internal imports (std, crate)
use crate::error::{Error, Result};

// External imports (alphabetized)
use serde_json::{Map, Value};

/// Scalar and structured `type` keyword values accepted by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Null,
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl TypeKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "null" => Some(Self::Null),
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }
}

/// Combinator keyword carried by a combinator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinatorKind {
    OneOf,
    AllOf,
    AnyOf,
}

/// A classified view over a borrowed schema value.
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode<'a> {
    /// `{"$ref": "#/components/schemas/..."}`
    Reference(&'a str),
    /// A node with a `type` keyword; combinator keywords on the same node are
    /// ignored, matching the input format's precedence.
    Typed {
        kind: TypeKind,
        schema: &'a Map<String, Value>,
    },
    /// A node carrying `oneOf`, `allOf` or `anyOf` variants.
    Combinator {
        kind: CombinatorKind,
        variants: &'a [Value],
    },
}

impl<'a> SchemaNode<'a> {
    /// Classify `value` into one of the three node shapes.
    ///
    /// `context` labels error messages with the position being compiled (a
    /// reference string or property name).
    pub fn classify(context: &str, value: &'a Value) -> Result<Self> {
        let schema = value.as_object().ok_or_else(|| {
            Error::compile(format!("{context} > schema node must be an object"))
        })?;

        if let Some(reference) = schema.get("$ref") {
            let reference = reference.as_str().ok_or_else(|| {
                Error::compile(format!("{context} > '$ref' must be a string"))
            })?;
            return Ok(Self::Reference(reference));
        }

        if let Some(type_value) = schema.get("type") {
            let type_name = type_value.as_str().ok_or_else(|| {
                Error::compile(format!("{context} > 'type' must be a string"))
            })?;
            let kind = TypeKind::parse(type_name).ok_or_else(|| {
                Error::compile(format!(
                    "{context} > unsupported schema type '{type_name}'"
                ))
            })?;
            return Ok(Self::Typed { kind, schema });
        }

        for (key, kind) in [
            ("oneOf", CombinatorKind::OneOf),
            ("allOf", CombinatorKind::AllOf),
            ("anyOf", CombinatorKind::AnyOf),
        ] {
            if let Some(variants) = schema.get(key) {
                let variants = variants.as_array().ok_or_else(|| {
                    Error::compile(format!("{context} > '{key}' must be an array"))
                })?;
                return Ok(Self::Combinator {
                    kind,
                    variants,
                });
            }
        }

        Err(Error::compile(format!(
            "{context} > schema must declare a type or a combinator (oneOf, allOf, anyOf)"
        )))
    }
}
