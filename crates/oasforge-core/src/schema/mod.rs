//! Schema compilation: node classification, type descriptors, the reference
//! map and the compiler itself.

pub mod compiler;
pub mod node;
pub mod registry;
pub mod types;

pub use compiler::{compile, CompileMode};
pub use node::{CombinatorKind, SchemaNode, TypeKind};
pub use registry::{component_reference, ReferenceItem, ReferenceMap};
pub use types::{CompiledType, Dependency, Field, PrimitiveKind, TypeDescriptor};
