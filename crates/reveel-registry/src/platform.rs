//! Live platform settings shared by the registry and every path it created.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use reveel_core::{Address, PlatformDirectory};

use crate::config::RegistryConfig;

/// Mutable platform parameters owned by the registry.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformSettings {
    pub implementation: Address,
    pub platform_fee: u64,
    pub platform_wallet: Address,
    pub trusted_forwarder: Address,
    pub paused: bool,
}

impl From<&RegistryConfig> for PlatformSettings {
    fn from(cfg: &RegistryConfig) -> Self {
        Self {
            implementation: cfg.implementation,
            platform_fee: cfg.platform_fee,
            platform_wallet: cfg.platform_wallet,
            trusted_forwarder: cfg.trusted_forwarder,
            paused: false,
        }
    }
}

/// Shared handle to [`PlatformSettings`].
///
/// Paths hold a clone and read the platform wallet and trusted forwarder
/// through [`PlatformDirectory`] each time they need them, so registry
/// updates apply to existing paths immediately.
#[derive(Debug, Clone)]
pub struct PlatformHandle(Arc<RwLock<PlatformSettings>>);

impl PlatformHandle {
    pub fn new(settings: PlatformSettings) -> Self {
        Self(Arc::new(RwLock::new(settings)))
    }

    /// Copy of the current settings.
    pub fn get(&self) -> PlatformSettings {
        *self.0.read()
    }

    pub fn update(&self, f: impl FnOnce(&mut PlatformSettings)) {
        f(&mut *self.0.write());
    }
}

impl PlatformDirectory for PlatformHandle {
    fn platform_wallet(&self) -> Address {
        self.0.read().platform_wallet
    }

    fn trusted_forwarder(&self) -> Address {
        self.0.read().trusted_forwarder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_see_updates() {
        let handle = PlatformHandle::new(PlatformSettings {
            implementation: Address([1; 20]),
            platform_fee: 100_000,
            platform_wallet: Address([2; 20]),
            trusted_forwarder: Address::ZERO,
            paused: false,
        });
        let shared: Arc<dyn PlatformDirectory> = Arc::new(handle.clone());

        handle.update(|s| s.platform_wallet = Address([3; 20]));
        assert_eq!(shared.platform_wallet(), Address([3; 20]));
        assert_eq!(handle.get().platform_wallet, Address([3; 20]));
    }
}
