//! Router options: endpoint prefix, exposed models, CORS origin, transport, id validation, status policy.

use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    #[default]
    #[serde(rename = "json-api")]
    JsonApi,
    #[serde(rename = "ember-restadapter")]
    EmberRest,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "json-api" => Ok(TransportKind::JsonApi),
            "ember-restadapter" | "ember" => Ok(TransportKind::EmberRest),
            other => Err(ConfigError::Validation(format!("unknown transport '{}'", other))),
        }
    }
}

/// Built-in id validators selectable from config.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdFormat {
    #[default]
    Integer,
    Uuid,
    Any,
}

impl FromStr for IdFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "integer" | "int" => Ok(IdFormat::Integer),
            "uuid" => Ok(IdFormat::Uuid),
            "any" => Ok(IdFormat::Any),
            other => Err(ConfigError::Validation(format!("unknown id format '{}'", other))),
        }
    }
}

fn integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-+]?(0|[1-9][0-9]*)$").expect("static regex"))
}

impl IdFormat {
    pub fn accepts(self, id: &str) -> bool {
        match self {
            IdFormat::Integer => integer_re().is_match(id) && id.parse::<i64>().is_ok(),
            IdFormat::Uuid => uuid::Uuid::parse_str(id).is_ok(),
            IdFormat::Any => !id.is_empty(),
        }
    }
}

/// Whether error responses carry their semantic status or are all sent as 200.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    #[default]
    Semantic,
    Legacy,
}

impl FromStr for StatusPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "semantic" => Ok(StatusPolicy::Semantic),
            "legacy" => Ok(StatusPolicy::Legacy),
            other => Err(ConfigError::Validation(format!("unknown status policy '{}'", other))),
        }
    }
}

fn default_endpoint() -> String {
    "/api".into()
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

/// Serializable router configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Exposed model names. `None` exposes every registered model.
    #[serde(default)]
    pub allowed: Option<Vec<String>>,
    #[serde(default)]
    pub allow_origin: String,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub id_format: IdFormat,
    #[serde(default)]
    pub status_codes: StatusPolicy,
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            endpoint: default_endpoint(),
            allowed: None,
            allow_origin: String::new(),
            transport: TransportKind::default(),
            id_format: IdFormat::default(),
            status_codes: StatusPolicy::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ApiConfig {
    /// Read `API_*` environment variables (after loading `.env` if present). Unset variables keep defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = ApiConfig::default();
        if let Ok(v) = std::env::var("API_ENDPOINT") {
            config.endpoint = v;
        }
        if let Ok(v) = std::env::var("API_ALLOWED") {
            let names: Vec<String> = v
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !names.is_empty() {
                config.allowed = Some(names);
            }
        }
        if let Ok(v) = std::env::var("API_ALLOW_ORIGIN") {
            config.allow_origin = v;
        }
        if let Ok(v) = std::env::var("API_TRANSPORT") {
            config.transport = v.parse()?;
        }
        if let Ok(v) = std::env::var("API_ID_FORMAT") {
            config.id_format = v.parse()?;
        }
        if let Ok(v) = std::env::var("API_STATUS_CODES") {
            config.status_codes = v.parse()?;
        }
        if let Ok(v) = std::env::var("API_BODY_LIMIT") {
            config.body_limit = v
                .parse()
                .map_err(|_| ConfigError::Validation(format!("API_BODY_LIMIT must be a byte count, got '{}'", v)))?;
        }
        Ok(config)
    }
}

pub type IdValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Runtime options: [`ApiConfig`] plus the id predicate used for path identifiers.
#[derive(Clone)]
pub struct ApiOptions {
    pub config: ApiConfig,
    id_validator: IdValidator,
}

impl fmt::Debug for ApiOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiOptions").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Default for ApiOptions {
    fn default() -> Self {
        ApiOptions::new(ApiConfig::default())
    }
}

impl ApiOptions {
    pub fn new(config: ApiConfig) -> Self {
        let format = config.id_format;
        ApiOptions {
            config,
            id_validator: Arc::new(move |id| format.accepts(id)),
        }
    }

    /// Replace the built-in id check with an arbitrary predicate.
    pub fn with_id_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.id_validator = Arc::new(validator);
        self
    }

    pub fn is_valid_id(&self, id: &str) -> bool {
        (self.id_validator)(id)
    }

    /// Endpoint prefix normalized to "" (root) or "/segment" without trailing slash.
    pub fn endpoint(&self) -> &str {
        let trimmed = self.config.endpoint.trim_end_matches('/');
        if trimmed.is_empty() {
            ""
        } else {
            trimmed
        }
    }
}
