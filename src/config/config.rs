use std::path::PathBuf;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::session::SessionConfig;
use super::store::StoreConfig;
use crate::providers::ProviderConfig;

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";
/// Environment variable overriding the config location.
pub const CONFIG_PATH_ENV: &str = "AUTHSESSION_CONFIG";
/// Prefix for environment overrides; `__` separates nested keys
/// (e.g. `AUTHSESSION_LOGGING__LEVEL=debug`).
pub const ENV_PREFIX: &str = "AUTHSESSION_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: where the session lives, who verifies
/// credentials, and how we log.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct ConfigV1 {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Resolve the config path from `AUTHSESSION_CONFIG`, falling back to `./config.yaml`.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Merge the YAML file with `AUTHSESSION_` environment overrides.
pub fn load_config_from(figment: Figment) -> Result<ConfigV1, String> {
    let config = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__").ignore(&["config"]))
        .extract::<Config>()
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    match config {
        Config::ConfigV1(c) => {
            c.session.validate()?;
            Ok(c)
        }
    }
}

/// Load config from the YAML file at [`config_path`].
pub fn load_config() -> Result<ConfigV1, String> {
    load_config_from(Figment::new().merge(Yaml::file(config_path())))
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), String> {
    let schema = schema_for!(Config);
    let rendered = serde_json::to_string_pretty(&schema)
        .map_err(|e| format!("Failed to render schema: {}", e))?;
    println!("{}", rendered);
    Ok(())
}
