//! Schema-to-descriptor compilation.
//!
//! `compile` walks one schema value and produces a `CompiledType`: the type
//! descriptor plus every dependency the walk recorded. The walk is pure with
//! respect to its inputs; identical schema, map and registry always produce
//! the same descriptor and the same dependency list.
//!
//! Two modes exist. `WithRef` resolves `$ref` nodes through the reference map
//! into named identifiers, recording a dependency per referenced name.
//! `NoRef` serves inline shapes (parameters, request bodies) that must have
//! been dereferenced beforehand; encountering a `$ref` there is an error.
//!
//! Recursion terminates on cyclic schemas because references compile to bare
//! identifiers instead of being inlined.

// Internal imports (std, crate)
use crate::error::{Error, Result};
use crate::schema::node::{CombinatorKind, SchemaNode, TypeKind};
use crate::schema::registry::ReferenceMap;
use crate::schema::types::{CompiledType, Dependency, Field, PrimitiveKind, TypeDescriptor};
use crate::support::SupportTypes;
use std::collections::HashSet;

// External imports (alphabetized)
use serde_json::{Map, Value};

/// Reference handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    /// Resolve `$ref` nodes through the reference map.
    WithRef,
    /// Reject `$ref` nodes; the schema must be fully dereferenced.
    NoRef,
}

/// Compile one schema value into a descriptor and its dependency list.
///
/// `context` labels warnings and errors with the position being compiled
/// (the item's reference string, or a property name during recursion).
pub fn compile(
    context: &str,
    schema: &Value,
    reference_map: &ReferenceMap,
    support_types: &SupportTypes,
    mode: CompileMode,
) -> Result<CompiledType> {
    let mut dependencies = Vec::new();
    let descriptor = compile_node(
        context,
        schema,
        reference_map,
        support_types,
        mode,
        &mut dependencies,
    )?;
    Ok(CompiledType {
        descriptor,
        dependencies,
    })
}

fn add_dependency(dependencies: &mut Vec<Dependency>, dependency: Dependency) {
    if !dependencies.iter().any(|d| d.name == dependency.name) {
        dependencies.push(dependency);
    }
}

fn compile_node(
    context: &str,
    value: &Value,
    reference_map: &ReferenceMap,
    support_types: &SupportTypes,
    mode: CompileMode,
    dependencies: &mut Vec<Dependency>,
) -> Result<TypeDescriptor> {
    match SchemaNode::classify(context, value)? {
        SchemaNode::Reference(reference) => match mode {
            CompileMode::NoRef => Err(Error::compile(format!(
                "{context} > references are not supported here, use a dereferenced schema"
            ))),
            CompileMode::WithRef => {
                let name = reference_map
                    .name_for(reference)
                    .ok_or_else(|| Error::ReferenceNotFound(reference.to_string()))?
                    .to_string();
                add_dependency(dependencies, Dependency::schema(&name, reference));
                Ok(TypeDescriptor::Identifier(name))
            }
        },
        SchemaNode::Typed { kind, schema } => match kind {
            TypeKind::Null => Ok(TypeDescriptor::Primitive(PrimitiveKind::Null)),
            TypeKind::Number => Ok(TypeDescriptor::Primitive(PrimitiveKind::Number)),
            TypeKind::Integer => Ok(TypeDescriptor::Primitive(PrimitiveKind::Integer)),
            TypeKind::Boolean => Ok(TypeDescriptor::Primitive(PrimitiveKind::Boolean)),
            TypeKind::String => compile_string(context, schema, support_types, dependencies),
            TypeKind::Array => {
                let items = schema.get("items").ok_or_else(|| {
                    Error::compile(format!("{context} > array schema is missing 'items'"))
                })?;
                let element = compile_node(
                    context,
                    items,
                    reference_map,
                    support_types,
                    mode,
                    dependencies,
                )?;
                Ok(TypeDescriptor::array(element))
            }
            TypeKind::Object => compile_object(
                context,
                schema,
                reference_map,
                support_types,
                mode,
                dependencies,
            ),
        },
        SchemaNode::Combinator { kind, variants } => {
            if kind == CombinatorKind::OneOf {
                log::warn!(
                    "'oneOf' normally means that one and only one type matches, \
                     which the compiled union does not enforce."
                );
                log::warn!(
                    "Consider using 'anyOf' and make the types enforce that there \
                     is only one match possible."
                );
            }
            let compiled = variants
                .iter()
                .map(|variant| {
                    compile_node(
                        context,
                        variant,
                        reference_map,
                        support_types,
                        mode,
                        dependencies,
                    )
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(match kind {
                CombinatorKind::AllOf => TypeDescriptor::Intersection(compiled),
                CombinatorKind::OneOf | CombinatorKind::AnyOf => TypeDescriptor::Union(compiled),
            })
        }
    }
}

/// String schemas: `enum` wins over `format`; an unregistered format falls
/// back to a plain string with a warning.
fn compile_string(
    context: &str,
    schema: &Map<String, Value>,
    support_types: &SupportTypes,
    dependencies: &mut Vec<Dependency>,
) -> Result<TypeDescriptor> {
    if let Some(values) = schema.get("enum") {
        let values = values
            .as_array()
            .ok_or_else(|| Error::compile(format!("{context} > 'enum' must be an array")))?;
        let literals = values
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    Error::compile(format!("{context} > enum values must be strings"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(TypeDescriptor::Enumeration(literals));
    }

    match schema.get("format").and_then(Value::as_str) {
        None => Ok(TypeDescriptor::Primitive(PrimitiveKind::String)),
        Some(format) => match support_types.get(format) {
            None => {
                log::warn!("{context} > Format '{format}' is not supported.");
                Ok(TypeDescriptor::Primitive(PrimitiveKind::String))
            }
            Some(support_type) => {
                add_dependency(dependencies, Dependency::support(format));
                Ok(TypeDescriptor::Identifier(support_type.export_name.clone()))
            }
        },
    }
}

fn compile_object(
    context: &str,
    schema: &Map<String, Value>,
    reference_map: &ReferenceMap,
    support_types: &SupportTypes,
    mode: CompileMode,
    dependencies: &mut Vec<Dependency>,
) -> Result<TypeDescriptor> {
    let required: HashSet<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut fields = Vec::new();
    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, property) in properties {
            let ty = compile_node(
                name,
                property,
                reference_map,
                support_types,
                mode,
                dependencies,
            )?;
            fields.push(Field {
                name: name.clone(),
                ty,
                optional: !required.contains(name.as_str()),
            });
        }
    }
    Ok(TypeDescriptor::Interface(fields))
}
