//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod logging;
pub mod modules;

use serde::{Deserialize, Serialize};

pub use self::logging::LoggingConfig;
pub use self::modules::ModulesConfig;

use crate::error::BuildError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Module system settings.
    #[serde(default)]
    pub modules: ModulesConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `PACKMILL__`.
    pub fn load(env: &str) -> Result<Self, BuildError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PACKMILL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| BuildError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| BuildError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
