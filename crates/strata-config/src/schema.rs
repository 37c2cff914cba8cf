use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::EngineConfig;

/// JSON schema for `strata.toml`, for editor completion and validation.
pub fn json_schema() -> RootSchema {
    schema_for!(EngineConfig)
}

/// [`json_schema`] rendered as pretty-printed JSON.
pub fn json_schema_string() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json_schema())
}
