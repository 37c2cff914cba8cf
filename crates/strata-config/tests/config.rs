use std::io::Write;

use pretty_assertions::assert_eq;
use strata_config::{json_schema_string, ConfigError, EngineConfig, LoggingConfig};
use strata_core::{EngineLimits, LookupPolicy};

#[test]
fn empty_config_uses_defaults() {
    let config = EngineConfig::from_toml_str("").unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.limits(), EngineLimits::default());
    assert_eq!(config.lookup_policy(), LookupPolicy::default());
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn sections_override_individual_keys() {
    let config = EngineConfig::from_toml_str(
        r#"
        [limits]
        max_redirects = 8

        [lookup]
        bindable_accessors = false

        [logging]
        level = "debug"
        json = true
        "#,
    )
    .unwrap();

    assert_eq!(config.limits().max_redirects, 8);
    assert_eq!(
        config.limits().max_type_param_depth,
        EngineLimits::DEFAULT_MAX_TYPE_PARAM_DEPTH
    );
    assert_eq!(
        config.lookup_policy(),
        LookupPolicy {
            bindable_accessors: false,
            interfaces_after_body: true,
        }
    );
    assert!(config.logging.json);
}

#[test]
fn unknown_keys_are_rejected_without_echoing_input() {
    let err = EngineConfig::from_toml_str("[lookup]\nbindable = true\n").unwrap_err();
    let ConfigError::Toml(message) = &err else {
        panic!("expected a toml error, got {err:?}");
    };
    assert!(message.contains("unknown field"), "{message}");
    assert!(!message.contains("[lookup]"), "{message}");
}

#[test]
fn load_reads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[limits]\nmax_supertype_depth = 32").unwrap();
    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.limits().max_supertype_depth, 32);

    let missing = file.path().with_extension("missing");
    assert!(matches!(
        EngineConfig::load(&missing),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn schema_lists_every_section() {
    let schema = json_schema_string().unwrap();
    for key in ["limits", "lookup", "logging", "max_redirects", "bindable_accessors"] {
        assert!(schema.contains(key), "schema is missing {key}");
    }
}
