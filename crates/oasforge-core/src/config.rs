//! Configuration for document loading, transformation and codegen.
//!
//! The scalar part of the configuration can be loaded from a YAML, JSON or
//! TOML file; hooks are closures and are attached programmatically with the
//! `with_*` builder methods after loading. `Config::validate` checks the
//! invariants that cannot be expressed in the type system (semver version,
//! scheme maps, extension keys, proxy URL).
//!
//! # Examples
//!
//! ```no_run
//! use oasforge_core::config::Config;
//!
//! # #[tokio::main]
//! # async fn main() -> oasforge_core::Result<()> {
//! let config = Config::from_file("oasforge.yaml").await?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use crate::error::{Error, HookResult, Result};
use crate::openapi::Method;
use std::fmt;
use std::path::{Path, PathBuf};

// External imports (alphabetized)
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use serde_value::Value as SerdeValue;
use tokio::fs;
use url::Url;

/// Document-level transform hook (`pre_transform`, `post_transform`,
/// `normalize_input`): receives the document value and the full config,
/// returns the replacement document.
pub type TransformHook = Box<dyn Fn(Value, &Config) -> HookResult<Value> + Send + Sync>;

/// CORS hook: receives the path and the default `options` descriptor.
/// `Some(value)` installs the value, `None` leaves the path without an
/// `options` entry.
pub type CorsHook = Box<dyn Fn(&str, Value) -> HookResult<Option<Value>> + Send + Sync>;

/// Security filter hook: receives path, method and the default security
/// list, and decides what the operation's `security` member becomes.
pub type SecurityHook = Box<dyn Fn(&str, Method, &Value) -> HookResult<SecurityDecision> + Send + Sync>;

/// Gateway integration hook: receives path, method and the default
/// integration object; the returned value is installed verbatim.
pub type RouteIntegrationHook = Box<dyn Fn(&str, Method, Value) -> HookResult<Value> + Send + Sync>;

/// Outcome of a `SecurityHook` invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum SecurityDecision {
    /// Write the default security list.
    Default,
    /// Write no `security` member for this operation.
    None,
    /// Write the given list verbatim.
    Custom(Value),
}

/// Top-level configuration.
#[derive(Serialize, Deserialize)]
pub struct Config {
    /// Project name, stamped into `info.title`.
    pub name: String,

    /// Project version, stamped into `info.version`. Must be semver.
    #[serde(default = "default_version")]
    pub version: String,

    /// Free-form mode tag forwarded to user hooks (e.g. "production").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Path of the OpenAPI document to load.
    pub input: PathBuf,

    /// Hook applied to the document right after loading and stamping.
    #[serde(skip)]
    pub normalize_input: Option<TransformHook>,

    /// Operations to run.
    #[serde(default)]
    pub operations: Operations,
}

/// The operations a run executes, in fixed order: codegen, then openapi.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Operations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi: Option<OpenApiOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codegen: Option<CodegenOptions>,
}

/// Options of the document transformation operation.
#[derive(Serialize, Deserialize)]
pub struct OpenApiOptions {
    /// Where the transformed document is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Run every stage but skip persistence.
    #[serde(default)]
    pub dry_run: bool,

    /// Check the transformed document against the OpenAPI structural model.
    #[serde(default = "default_true")]
    pub validate_schema: bool,

    /// Hook applied before the transformation stages.
    #[serde(skip)]
    pub pre_transform: Option<TransformHook>,

    /// Hook applied after the transformation stages.
    #[serde(skip)]
    pub post_transform: Option<TransformHook>,

    /// The transformation stages to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<TransformationOptions>,
}

/// Stage configuration; a stage runs iff its entry is present.
#[derive(Default, Serialize, Deserialize)]
pub struct TransformationOptions {
    /// CORS stage hook. The stage runs iff the hook is attached.
    #[serde(skip)]
    pub cors: Option<CorsHook>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<SecuritySchemesOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_gateway_integration: Option<GatewayIntegrationOptions>,
}

/// Security schemes stage configuration.
#[derive(Serialize, Deserialize)]
pub struct SecuritySchemesOptions {
    /// Scheme name to scheme object, installed under
    /// `components.securitySchemes` when none are defined yet.
    pub scheme: Map<String, Value>,

    /// Per-operation security filter.
    #[serde(skip)]
    pub filter_security: Option<SecurityHook>,
}

/// API gateway integration stage configuration.
#[derive(Serialize, Deserialize)]
pub struct GatewayIntegrationOptions {
    /// Base URL the proxy integration forwards to.
    pub proxy_base_url: String,

    /// Per-operation integration hook. Required; attach it with
    /// [`GatewayIntegrationOptions::with_route_integration`].
    #[serde(skip)]
    pub route_integration: Option<RouteIntegrationHook>,

    /// Extension objects merged onto the named security schemes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_schemes_extensions: Option<Map<String, Value>>,

    /// Value of the document-level binary media types extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_media_types: Option<Vec<String>>,
}

/// Options of the codegen operation.
#[derive(Debug, Serialize, Deserialize)]
pub struct CodegenOptions {
    /// Where generated artifacts are written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Directory of the support type registry backing schema formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_types: Option<PathBuf>,

    /// What to generate. Accepts a plain string (`"typings"`,
    /// `"contracts"`, `"fastify"`) or the pair form
    /// `["fastify", {iots_router, no_schemas}]`.
    #[serde(rename = "type", deserialize_with = "deserialize_codegen_kind")]
    pub kind: CodegenKind,
}

/// What the codegen operation produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenKind {
    /// Compiled type descriptors only.
    Typings,
    /// Types plus handler contracts.
    Contracts,
    /// Types, contracts and route registration models.
    Fastify { iots_router: bool, no_schemas: bool },
}

#[derive(Serialize, Deserialize)]
struct FastifyKindOptions {
    iots_router: bool,
    no_schemas: bool,
}

impl Config {
    /// Create a minimal configuration programmatically.
    pub fn new(name: impl Into<String>, input: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            mode: None,
            input: input.into(),
            normalize_input: None,
            operations: Operations::default(),
        }
    }

    /// Load the scalar configuration from a YAML, JSON or TOML file.
    ///
    /// Operations missing their `output` are dropped with a warning; a
    /// configuration left without any operation is rejected.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let mut config: Config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| Error::config(format!("Invalid TOML in {}: {}", path.display(), e)))?,
            _ => serde_yaml::from_str(&content)?,
        };

        config.drop_incomplete_operations();
        if config.operations.openapi.is_none() && config.operations.codegen.is_none() {
            return Err(Error::config(
                "at least one valid operation is required under `operations`",
            ));
        }
        Ok(config)
    }

    /// Attach the `normalize_input` hook.
    pub fn with_normalize_input(mut self, hook: TransformHook) -> Self {
        self.normalize_input = Some(hook);
        self
    }

    /// Check every invariant the types cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config("`name` must not be empty"));
        }
        if !SEMVER_PATTERN.is_match(&self.version) {
            return Err(Error::config(format!(
                "`version` is not a valid semver version. Got: {}",
                self.version
            )));
        }
        if self.operations.openapi.is_none() && self.operations.codegen.is_none() {
            return Err(Error::config(
                "at least one operation is required under `operations`",
            ));
        }
        if let Some(openapi) = &self.operations.openapi {
            if let Some(transformation) = &openapi.transformation {
                if let Some(security) = &transformation.security_schemes {
                    security.validate()?;
                }
                if let Some(gateway) = &transformation.api_gateway_integration {
                    gateway.validate(transformation.security_schemes.as_ref())?;
                }
            }
        }
        Ok(())
    }

    fn drop_incomplete_operations(&mut self) {
        if let Some(openapi) = &self.operations.openapi {
            if openapi.output.is_none() {
                log::warn!("`operations.openapi.output` is required. Skipping operation.");
                self.operations.openapi = None;
            }
        }
        if let Some(codegen) = &self.operations.codegen {
            if codegen.output.is_none() {
                log::warn!("`operations.codegen.output` is required. Skipping operation.");
                self.operations.codegen = None;
            }
        }
    }
}

impl OpenApiOptions {
    pub fn with_pre_transform(mut self, hook: TransformHook) -> Self {
        self.pre_transform = Some(hook);
        self
    }

    pub fn with_post_transform(mut self, hook: TransformHook) -> Self {
        self.post_transform = Some(hook);
        self
    }
}

impl Default for OpenApiOptions {
    fn default() -> Self {
        Self {
            output: None,
            dry_run: false,
            validate_schema: default_true(),
            pre_transform: None,
            post_transform: None,
            transformation: None,
        }
    }
}

impl TransformationOptions {
    pub fn with_cors(mut self, hook: CorsHook) -> Self {
        self.cors = Some(hook);
        self
    }
}

impl SecuritySchemesOptions {
    pub fn new(scheme: Map<String, Value>) -> Self {
        Self {
            scheme,
            filter_security: None,
        }
    }

    pub fn with_filter_security(mut self, hook: SecurityHook) -> Self {
        self.filter_security = Some(hook);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.scheme.is_empty() {
            return Err(Error::config(
                "`transformation.security_schemes.scheme` requires at least one security scheme",
            ));
        }
        let invalid: Vec<&str> = self
            .scheme
            .iter()
            .filter(|(_, value)| !value.is_object())
            .map(|(name, _)| name.as_str())
            .collect();
        if !invalid.is_empty() {
            return Err(Error::config(format!(
                "`transformation.security_schemes.scheme` entries must be objects. Invalid scheme: `{}`",
                invalid.join("`, `")
            )));
        }
        Ok(())
    }
}

impl GatewayIntegrationOptions {
    pub fn new(proxy_base_url: impl Into<String>) -> Self {
        Self {
            proxy_base_url: proxy_base_url.into(),
            route_integration: None,
            security_schemes_extensions: None,
            binary_media_types: None,
        }
    }

    pub fn with_route_integration(mut self, hook: RouteIntegrationHook) -> Self {
        self.route_integration = Some(hook);
        self
    }

    fn validate(&self, security: Option<&SecuritySchemesOptions>) -> Result<()> {
        Url::parse(&self.proxy_base_url).map_err(|e| {
            Error::config(format!(
                "`transformation.api_gateway_integration.proxy_base_url` must be a valid URL: {e}"
            ))
        })?;
        if self.route_integration.is_none() {
            return Err(Error::config(
                "`transformation.api_gateway_integration.route_integration` is a required hook",
            ));
        }
        if let (Some(extensions), Some(security)) = (&self.security_schemes_extensions, security) {
            let unknown: Vec<&str> = extensions
                .keys()
                .filter(|name| !security.scheme.contains_key(*name))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                let available: Vec<&str> =
                    security.scheme.keys().map(String::as_str).collect();
                return Err(Error::config(format!(
                    "`transformation.api_gateway_integration.security_schemes_extensions` must only \
                     extend configured schemes. Unknown: `{}`. Available schemes: `{}`",
                    unknown.join("`, `"),
                    available.join("`, `")
                )));
            }
        }
        if let Some(types) = &self.binary_media_types {
            if types.iter().any(|media_type| media_type.is_empty()) {
                return Err(Error::config(
                    "`transformation.api_gateway_integration.binary_media_types` entries must be non-empty strings",
                ));
            }
        }
        Ok(())
    }
}

impl CodegenKind {
    /// Whether route registration schemas should be extracted.
    pub fn wants_route_schemas(&self) -> bool {
        matches!(
            self,
            CodegenKind::Fastify {
                no_schemas: false,
                ..
            }
        )
    }

    /// Whether handler contracts should be extracted.
    pub fn wants_contracts(&self) -> bool {
        !matches!(self, CodegenKind::Typings)
    }
}

fn default_version() -> String {
    "0.0.0".to_string()
}

fn default_true() -> bool {
    true
}

static SEMVER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    )
    .unwrap()
});

/// Accept either a plain kind string or the `["fastify", {..}]` pair form.
fn deserialize_codegen_kind<'de, D>(deserializer: D) -> std::result::Result<CodegenKind, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as DeError;

    let value = SerdeValue::deserialize(deserializer)?;
    match value {
        SerdeValue::String(name) => match name.as_str() {
            "typings" => Ok(CodegenKind::Typings),
            "contracts" => Ok(CodegenKind::Contracts),
            "fastify" => Ok(CodegenKind::Fastify {
                iots_router: false,
                no_schemas: false,
            }),
            other => Err(DeError::custom(format!(
                "`codegen.type` must be one of: typings, contracts, fastify. Got `{other}`"
            ))),
        },
        SerdeValue::Seq(mut parts) => {
            let options = parts.pop();
            let name = parts.pop();
            match (name, options, parts.is_empty()) {
                (Some(SerdeValue::String(name)), Some(options), true) if name == "fastify" => {
                    let options: FastifyKindOptions =
                        FastifyKindOptions::deserialize(options).map_err(DeError::custom)?;
                    Ok(CodegenKind::Fastify {
                        iots_router: options.iots_router,
                        no_schemas: options.no_schemas,
                    })
                }
                _ => Err(DeError::custom(
                    "`codegen.type` array form must be `[\"fastify\", {..}]`",
                )),
            }
        }
        _ => Err(DeError::custom(
            "`codegen.type` must be a string or an array",
        )),
    }
}

impl Serialize for CodegenKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeSeq;
        match self {
            CodegenKind::Typings => serializer.serialize_str("typings"),
            CodegenKind::Contracts => serializer.serialize_str("contracts"),
            CodegenKind::Fastify {
                iots_router,
                no_schemas,
            } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("fastify")?;
                seq.serialize_element(&FastifyKindOptions {
                    iots_router: *iots_router,
                    no_schemas: *no_schemas,
                })?;
                seq.end()
            }
        }
    }
}

// Hooks are opaque closures; Debug shows their presence only.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("mode", &self.mode)
            .field("input", &self.input)
            .field("normalize_input", &self.normalize_input.is_some())
            .field("operations", &self.operations)
            .finish()
    }
}

impl fmt::Debug for OpenApiOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenApiOptions")
            .field("output", &self.output)
            .field("dry_run", &self.dry_run)
            .field("validate_schema", &self.validate_schema)
            .field("pre_transform", &self.pre_transform.is_some())
            .field("post_transform", &self.post_transform.is_some())
            .field("transformation", &self.transformation)
            .finish()
    }
}

impl fmt::Debug for TransformationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformationOptions")
            .field("cors", &self.cors.is_some())
            .field("security_schemes", &self.security_schemes)
            .field("api_gateway_integration", &self.api_gateway_integration)
            .finish()
    }
}

impl fmt::Debug for SecuritySchemesOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecuritySchemesOptions")
            .field("scheme", &self.scheme)
            .field("filter_security", &self.filter_security.is_some())
            .finish()
    }
}

impl fmt::Debug for GatewayIntegrationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayIntegrationOptions")
            .field("proxy_base_url", &self.proxy_base_url)
            .field("route_integration", &self.route_integration.is_some())
            .field(
                "security_schemes_extensions",
                &self.security_schemes_extensions,
            )
            .field("binary_media_types", &self.binary_media_types)
            .finish()
    }
}
