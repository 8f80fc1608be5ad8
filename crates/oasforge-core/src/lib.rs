//! Oasforge Core Library
//!
//! This library compiles the component schemas of an OpenAPI document into a
//! typed model and applies configurable transformations (CORS, security
//! schemes, API gateway integration) to the document itself.

pub mod config;
pub mod contracts;
pub mod document;
pub mod error;
pub mod generate;
pub mod openapi;
pub mod routes;
pub mod schema;
pub mod support;
pub mod transform;

pub use crate::{
    config::Config,
    document::Document,
    error::{Error, Result},
    generate::{generate, run_codegen_operation},
    schema::{CompileMode, ReferenceMap, TypeDescriptor},
    transform::run_openapi_operation,
};

/// Result type for oasforge operations
pub type OasforgeResult<T> = std::result::Result<T, Error>;
