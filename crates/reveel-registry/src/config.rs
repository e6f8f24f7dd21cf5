//! Registry configuration.
//!
//! Sources are layered in order: built-in defaults, an optional TOML file,
//! then environment variables prefixed `REVEEL_` (`REVEEL_PLATFORM_FEE`,
//! `REVEEL_PLATFORM_WALLET`, ...). Later sources win.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use reveel_core::constants::{DEFAULT_PLATFORM_FEE, MAX_PLATFORM_FEE};
use reveel_core::error::ValidationError;
use reveel_core::{Address, ReveelError};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "REVEEL";

/// Configuration for a [`Registry`](crate::Registry) instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Address of the registry itself. Seeds path address derivation.
    #[serde(default)]
    pub registry_address: Address,
    /// Implementation every new path is instantiated from.
    #[serde(default)]
    pub implementation: Address,
    /// Platform fee over `BASE` snapshotted into each new path.
    #[serde(default = "default_platform_fee")]
    pub platform_fee: u64,
    /// Wallet receiving platform fees.
    #[serde(default)]
    pub platform_wallet: Address,
    /// Relay allowed to act for signers. Zero disables relaying.
    #[serde(default)]
    pub trusted_forwarder: Address,
}

fn default_platform_fee() -> u64 {
    DEFAULT_PLATFORM_FEE
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_address: Address::ZERO,
            implementation: Address::ZERO,
            platform_fee: DEFAULT_PLATFORM_FEE,
            platform_wallet: Address::ZERO,
            trusted_forwarder: Address::ZERO,
        }
    }
}

impl RegistryConfig {
    /// Default config file location: `<config dir>/reveel/registry.toml`.
    pub fn default_path(config_dir: Option<PathBuf>) -> PathBuf {
        config_dir
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reveel")
            .join("registry.toml")
    }

    /// Load from `path` (if it exists) and the environment, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ReveelError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        let cfg: Self = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Same checks as registry construction.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.implementation.is_zero() || self.platform_wallet.is_zero() {
            return Err(ValidationError::ZeroAddressProvided);
        }
        if self.platform_fee > MAX_PLATFORM_FEE {
            return Err(ValidationError::PlatformFeeNotAppropriate {
                fee: self.platform_fee,
            });
        }
        Ok(())
    }
}

fn config_error(e: ::config::ConfigError) -> ReveelError {
    ReveelError::Config(e.to_string())
}
