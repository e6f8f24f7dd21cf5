//! # reveel-registry
//! Factory and platform parameters for Reveel revenue paths.
//!
//! - [`config`]: `RegistryConfig` loaded from defaults, a TOML file and `REVEEL_*` env vars
//! - [`platform`]: `PlatformHandle`, the live platform settings shared with every path
//! - [`registry`]: `Registry`: admin operations, pause switch, path creation
//! - [`events`]: `RegistryEvent`

pub mod config;
pub mod events;
pub mod platform;
pub mod registry;

pub use self::config::RegistryConfig;
pub use events::RegistryEvent;
pub use platform::{PlatformHandle, PlatformSettings};
pub use registry::{PathRecord, Registry};
