//! Tests for the configuration module.
//!
//! This module contains tests for configuration loading, validation, and usage.

use crate::config::{ConfigLoader, LogConfig, RouterConfig, RoutingConfig, Validate};
use crate::data_structures::RoutingStrategy;
use crate::error::config::ConfigError;
use crate::tests::TestFixture;

/// Test that default configuration can be created and is valid.
#[test]
fn test_default_config_is_valid() {
    let config = RouterConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.routing.strategy, RoutingStrategy::QuickCache);
    assert_eq!(config.routing.root_capacity, 100);
    assert_eq!(config.routing.literal_marker, '_');
}

/// Test that configuration validation catches invalid values.
#[test]
fn test_config_validation() {
    let mut config = RouterConfig::default();

    config.routing.root_capacity = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValueOutOfRange { .. })
    ));

    config.routing.root_capacity = 16;
    config.routing.max_key_length = 1;
    assert!(config.validate().is_err());

    config.routing.max_key_length = 256;
    config.routing.literal_marker = '.';
    assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

    config.routing.literal_marker = '$';
    config.log.level = "loud".to_string();
    assert!(config.validate().is_err());

    config.log = LogConfig::default();
    assert!(config.validate().is_ok());
}

/// Test that the routing section converts into a table configuration.
#[test]
fn test_table_config_conversion() {
    let routing = RoutingConfig {
        strategy: RoutingStrategy::EarlyExit,
        root_capacity: 8,
        literal_marker: '$',
        ..RoutingConfig::default()
    };
    let table_config = routing.table_config().unwrap();
    assert_eq!(table_config.root_capacity(), 8);
    assert_eq!(table_config.literal_marker(), '$');
    assert_eq!(table_config.strategy(), RoutingStrategy::EarlyExit);

    let invalid = RoutingConfig {
        root_capacity: 0,
        ..RoutingConfig::default()
    };
    assert!(invalid.table_config().is_err());
}

/// Test loading configuration from a file.
#[test]
fn test_load_config_from_file() {
    let fixture = TestFixture::new().unwrap();
    let config_path = fixture
        .create_file(
            "router.toml",
            r#"
            [routing]
            strategy = "exhaustive"
            root_capacity = 16
            literal_marker = "$"

            [log]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

    let loader = ConfigLoader::new(Some(&config_path), "TR_FILE_TEST");
    let config = loader.load().unwrap();

    assert_eq!(config.routing.strategy, RoutingStrategy::Exhaustive);
    assert_eq!(config.routing.root_capacity, 16);
    assert_eq!(config.routing.literal_marker, '$');
    assert_eq!(config.log.level, "debug");
    assert!(config.log.json);

    // Other values should be defaults
    assert_eq!(config.routing.max_key_length, 512);
    assert_eq!(config.log.verbose_level, "debug");
}

/// Test loading configuration from a JSON file.
#[test]
fn test_load_config_from_json() {
    let fixture = TestFixture::new().unwrap();
    let config_path = fixture
        .create_file("router.json", r#"{ "routing": { "strategy": "early_exit" } }"#)
        .unwrap();

    let config = ConfigLoader::new(Some(&config_path), "TR_JSON_TEST")
        .load()
        .unwrap();
    assert_eq!(config.routing.strategy, RoutingStrategy::EarlyExit);
}

/// Test that environment variables override configuration values.
#[test]
fn test_env_override() {
    let mut fixture = TestFixture::new().unwrap();
    fixture.set_env("TR_ENV_TEST__ROUTING__STRATEGY", "early_exit");
    fixture.set_env("TR_ENV_TEST__ROUTING__ROOT_CAPACITY", "32");
    fixture.set_env("TR_ENV_TEST__LOG__LEVEL", "warn");

    let loader = ConfigLoader::new(None::<&str>, "TR_ENV_TEST");
    let config = loader.load().unwrap();

    assert_eq!(config.routing.strategy, RoutingStrategy::EarlyExit);
    assert_eq!(config.routing.root_capacity, 32);
    assert_eq!(config.log.level, "warn");
}

/// Test that an invalid value in the environment is rejected.
#[test]
fn test_env_override_is_validated() {
    let mut fixture = TestFixture::new().unwrap();
    fixture.set_env("TR_ENV_INVALID__ROUTING__ROOT_CAPACITY", "0");

    let result = ConfigLoader::new(None::<&str>, "TR_ENV_INVALID").load();
    assert!(matches!(result, Err(ConfigError::ValueOutOfRange { .. })));
}

/// Test that a missing configuration file is reported.
#[test]
fn test_missing_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.temp_dir.path().join("absent.toml");

    let result = ConfigLoader::new(Some(&path), "TR_MISSING_TEST").load();
    assert!(matches!(result, Err(ConfigError::FileNotFound(p)) if p == path));
}

/// Test that unknown file formats are rejected.
#[test]
fn test_unsupported_extension() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_file("router.ini", "strategy = normal").unwrap();

    let result = ConfigLoader::new(Some(&path), "TR_INI_TEST").load();
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

/// Test that an unknown strategy name fails to load.
#[test]
fn test_unknown_strategy_in_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_file("router.toml", "[routing]\nstrategy = \"fastest\"\n")
        .unwrap();

    let result = ConfigLoader::new(Some(&path), "TR_BAD_STRATEGY_TEST").load();
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

/// Test that the default configuration serializes to TOML and loads back.
#[test]
fn test_generated_config_loads() {
    let fixture = TestFixture::new().unwrap();
    let text = toml::to_string_pretty(&RouterConfig::default()).unwrap();
    let path = fixture.create_file("generated.toml", text).unwrap();

    let config = ConfigLoader::new(Some(&path), "TR_GENERATED_TEST")
        .load()
        .unwrap();
    assert_eq!(config, RouterConfig::default());
}
