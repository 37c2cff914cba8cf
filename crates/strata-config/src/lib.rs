//! TOML configuration for the Strata engine and the tracing setup that goes with it.
//!
//! ```toml
//! [limits]
//! max_redirects = 64
//!
//! [lookup]
//! bindable_accessors = true
//!
//! [logging]
//! level = "debug"
//! ```

#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Once;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strata_core::{EngineLimits, LookupPolicy};
use thiserror::Error;

mod schema;

pub use schema::{json_schema, json_schema_string};

static TRACING_INIT: Once = Once::new();

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Recursion guards. Exceeding one is reported as a cycle rather than overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Hops followed along a `replaced_by` chain.
    #[serde(default = "LimitsConfig::default_max_redirects")]
    #[schemars(range(min = 1))]
    pub max_redirects: u32,

    /// Nesting allowed while substituting type variables.
    #[serde(default = "LimitsConfig::default_max_type_param_depth")]
    #[schemars(range(min = 1))]
    pub max_type_param_depth: u32,

    /// Supertype edges followed by one hierarchy walk.
    #[serde(default = "LimitsConfig::default_max_supertype_depth")]
    #[schemars(range(min = 1))]
    pub max_supertype_depth: u32,
}

impl LimitsConfig {
    fn default_max_redirects() -> u32 {
        EngineLimits::DEFAULT_MAX_REDIRECTS
    }

    fn default_max_type_param_depth() -> u32 {
        EngineLimits::DEFAULT_MAX_TYPE_PARAM_DEPTH
    }

    fn default_max_supertype_depth() -> u32 {
        EngineLimits::DEFAULT_MAX_SUPERTYPE_DEPTH
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_redirects: Self::default_max_redirects(),
            max_type_param_depth: Self::default_max_type_param_depth(),
            max_supertype_depth: Self::default_max_supertype_depth(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct LookupConfig {
    /// Binding-mode lookups prefer a bindable accessor anywhere in the hierarchy over a
    /// nearer plain field.
    #[serde(default = "default_true")]
    pub bindable_accessors: bool,

    /// Interface methods are only considered when the class chain has no applicable
    /// overload.
    #[serde(default = "default_true")]
    pub interfaces_after_body: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            bindable_accessors: true,
            interfaces_after_body: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`trace` .. `error`) or an `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit one JSON object per event.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    /// The configured directives with `RUST_LOG` appended when it is set.
    pub fn directives(&self) -> String {
        let config = Self::normalize_level_directives(&self.level);
        match rust_log() {
            Some(env) => format!("{config},{env}"),
            None => config,
        }
    }

    /// The effective filter: the configured level merged with `RUST_LOG`.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        self.filter_with_env(rust_log())
    }

    /// When the merged directives do not parse, `RUST_LOG` alone is tried, then the
    /// configured level alone, then `info`.
    fn filter_with_env(&self, env_directives: Option<String>) -> tracing_subscriber::EnvFilter {
        let config_directives = Self::normalize_level_directives(&self.level);
        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }
}

fn rust_log() -> Option<String> {
    std::env::var("RUST_LOG")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a source snippet; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Limits in the form `TypeStore::set_limits` takes. Zero values are raised to one.
    pub fn limits(&self) -> EngineLimits {
        EngineLimits {
            max_redirects: self.limits.max_redirects.max(1),
            max_type_param_depth: self.limits.max_type_param_depth.max(1),
            max_supertype_depth: self.limits.max_supertype_depth.max(1),
        }
    }

    pub fn lookup_policy(&self) -> LookupPolicy {
        LookupPolicy {
            bindable_accessors: self.lookup.bindable_accessors,
            interfaces_after_body: self.lookup.interfaces_after_body,
        }
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// Only the first call in a process has any effect.
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;

    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();
        let fmt = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false);
        let result = if config.json {
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt.json());
            tracing::subscriber::set_global_default(subscriber)
        } else {
            let subscriber = tracing_subscriber::registry().with(filter).with(fmt);
            tracing::subscriber::set_global_default(subscriber)
        };
        if result.is_ok() {
            tracing::debug!(target: "strata.config", level = %config.level, "tracing initialized");
        }
    });
}
