//! Type descriptor model produced by the schema compiler.
//!
//! A `TypeDescriptor` is the language-neutral representation of a compiled
//! schema node: primitives, named identifiers, arrays, object interfaces,
//! unions, intersections and string enumerations. Descriptors are immutable
//! once produced; downstream consumers (contract extraction, artifact
//! serialization) only read them.

// External imports (alphabetized)
use serde::{Deserialize, Serialize};

/// Primitive scalar kinds mapped 1:1 from schema `type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Null,
    String,
    Number,
    Integer,
    Boolean,
}

/// One field of an object interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    /// Set when the field name is absent from the schema's `required` list.
    pub optional: bool,
}

/// Compiled representation of a schema node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeDescriptor {
    /// Scalar type: null, string, number, integer, boolean
    Primitive(PrimitiveKind),
    /// Reference to a named type, either a component schema or a support type
    Identifier(String),
    /// Homogeneous array of the element type
    Array(Box<TypeDescriptor>),
    /// Object shape with named, possibly optional fields
    Interface(Vec<Field>),
    /// Choice between variants (`oneOf` / `anyOf`)
    Union(Vec<TypeDescriptor>),
    /// Combination of all variants (`allOf`)
    Intersection(Vec<TypeDescriptor>),
    /// Closed set of string literals (`enum` on a string schema)
    Enumeration(Vec<String>),
}

impl TypeDescriptor {
    /// Shorthand for a named reference.
    pub fn identifier<S: Into<String>>(name: S) -> Self {
        Self::Identifier(name.into())
    }

    /// Shorthand for an array of `element`.
    pub fn array(element: TypeDescriptor) -> Self {
        Self::Array(Box::new(element))
    }
}

/// A type-level dependency recorded during compilation.
///
/// `utilitary` dependencies point at support types (format mappings) rather
/// than component schemas; their `reference` is the registry marker `"#"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub utilitary: bool,
}

impl Dependency {
    /// Dependency on a named component schema.
    pub fn schema<N: Into<String>, R: Into<String>>(name: N, reference: R) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            utilitary: false,
        }
    }

    /// Dependency on a support type keyed by schema format.
    pub fn support<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            reference: "#".to_string(),
            utilitary: true,
        }
    }
}

/// Result of compiling one schema: the descriptor plus every dependency the
/// compilation recorded, deduplicated by name in first-encountered order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledType {
    pub descriptor: TypeDescriptor,
    pub dependencies: Vec<Dependency>,
}
