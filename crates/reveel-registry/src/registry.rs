//! The registry: owner-administered platform parameters and the factory
//! that creates revenue paths.
//!
//! Each created path is an independent [`RevenuePath`] owning its own state.
//! Paths share only the registry's [`PlatformHandle`], through which they
//! read the current platform wallet and trusted forwarder. The platform fee
//! is copied into a path at creation and never changes for it afterwards.

use std::sync::Arc;

use tracing::info;

use reveel_core::constants::MAX_PLATFORM_FEE;
use reveel_core::error::{AccessError, ValidationError};
use reveel_core::{Address, CallContext, PlatformDirectory, ReveelError};
use reveel_path::{PathInit, PathParams, RevenuePath};

use crate::config::RegistryConfig;
use crate::events::RegistryEvent;
use crate::platform::{PlatformHandle, PlatformSettings};

/// Index entry for a created path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRecord {
    pub address: Address,
    pub name: String,
    pub owner: Address,
}

#[derive(Debug)]
pub struct Registry {
    address: Address,
    owner: Address,
    platform: PlatformHandle,
    nonce: u64,
    paths: Vec<PathRecord>,
    events: Vec<RegistryEvent>,
}

impl Registry {
    /// Create a registry owned by `owner`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::ZeroAddressProvided`] if the owner, implementation
    ///   or platform wallet is zero
    /// - [`ValidationError::PlatformFeeNotAppropriate`] if the fee exceeds `BASE`
    pub fn new(owner: Address, config: &RegistryConfig) -> Result<Self, ReveelError> {
        if owner.is_zero() {
            return Err(ValidationError::ZeroAddressProvided.into());
        }
        config.validate()?;

        info!(
            %owner,
            implementation = %config.implementation,
            platform_fee = config.platform_fee,
            "registry created"
        );
        Ok(Self {
            address: config.registry_address,
            owner,
            platform: PlatformHandle::new(PlatformSettings::from(config)),
            nonce: 0,
            paths: Vec::new(),
            events: Vec::new(),
        })
    }

    fn require_owner(&self, ctx: &CallContext) -> Result<(), AccessError> {
        ctx.require_owner(&self.owner, &self.platform.trusted_forwarder())
            .map(|_| ())
    }

    // --- admin ---

    pub fn set_platform_fee(&mut self, ctx: &CallContext, fee: u64) -> Result<(), ReveelError> {
        self.require_owner(ctx)?;
        if fee > MAX_PLATFORM_FEE {
            return Err(ValidationError::PlatformFeeNotAppropriate { fee }.into());
        }
        self.platform.update(|s| s.platform_fee = fee);
        info!(fee, "platform fee updated");
        self.events.push(RegistryEvent::PlatformFeeUpdated { fee });
        Ok(())
    }

    pub fn set_platform_wallet(&mut self, ctx: &CallContext, wallet: Address) -> Result<(), ReveelError> {
        self.require_owner(ctx)?;
        if wallet.is_zero() {
            return Err(ValidationError::ZeroAddressProvided.into());
        }
        self.platform.update(|s| s.platform_wallet = wallet);
        info!(%wallet, "platform wallet updated");
        self.events.push(RegistryEvent::PlatformWalletUpdated { wallet });
        Ok(())
    }

    /// Change the implementation used for paths created from now on.
    pub fn set_implementation(
        &mut self,
        ctx: &CallContext,
        implementation: Address,
    ) -> Result<(), ReveelError> {
        self.require_owner(ctx)?;
        if implementation.is_zero() {
            return Err(ValidationError::ZeroAddressProvided.into());
        }
        self.platform.update(|s| s.implementation = implementation);
        info!(%implementation, "implementation updated");
        self.events
            .push(RegistryEvent::ImplementationUpdated { implementation });
        Ok(())
    }

    /// Set the relay trusted to act for signers. Zero disables relaying.
    pub fn set_trusted_forwarder(
        &mut self,
        ctx: &CallContext,
        forwarder: Address,
    ) -> Result<(), ReveelError> {
        self.require_owner(ctx)?;
        self.platform.update(|s| s.trusted_forwarder = forwarder);
        info!(%forwarder, "trusted forwarder updated");
        self.events
            .push(RegistryEvent::TrustedForwarderUpdated { forwarder });
        Ok(())
    }

    /// Flip the pause switch. Returns the new state.
    ///
    /// Pausing only blocks path creation; existing paths keep working.
    pub fn toggle_pause(&mut self, ctx: &CallContext) -> Result<bool, ReveelError> {
        self.require_owner(ctx)?;
        let mut paused = false;
        self.platform.update(|s| {
            s.paused = !s.paused;
            paused = s.paused;
        });
        info!(paused, "registry pause toggled");
        self.events.push(RegistryEvent::PauseToggled { paused });
        Ok(paused)
    }

    pub fn transfer_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> Result<(), ReveelError> {
        self.require_owner(ctx)?;
        if new_owner.is_zero() {
            return Err(ValidationError::ZeroAddressProvided.into());
        }
        let previous = std::mem::replace(&mut self.owner, new_owner);
        info!(%previous, new = %new_owner, "registry ownership transferred");
        self.events.push(RegistryEvent::OwnershipTransferred {
            previous,
            new: new_owner,
        });
        Ok(())
    }

    /// Always fails: a registry must keep an owner.
    pub fn renounce_ownership(&mut self, ctx: &CallContext) -> Result<(), ReveelError> {
        self.require_owner(ctx)?;
        Err(AccessError::RenounceForbidden.into())
    }

    // --- factory ---

    /// Create a new revenue path owned by the effective caller.
    pub fn create_revenue_path(
        &mut self,
        ctx: &CallContext,
        params: PathParams,
    ) -> Result<RevenuePath, ReveelError> {
        let settings = self.platform.get();
        if settings.paused {
            return Err(AccessError::Paused.into());
        }
        params.validate()?;

        let owner = ctx.effective_caller(&settings.trusted_forwarder);
        let address = self.derive_path_address(&settings.implementation);
        let name = params.name.clone();

        let path = RevenuePath::initialize(
            params,
            PathInit {
                address,
                owner,
                implementation: settings.implementation,
                platform_fee: settings.platform_fee,
                platform: Arc::new(self.platform.clone()),
            },
        )?;
        self.nonce += 1;

        info!(path = %address, %name, %owner, "revenue path created");
        self.paths.push(PathRecord {
            address,
            name: name.clone(),
            owner,
        });
        self.events.push(RegistryEvent::RevenuePathCreated {
            path: address,
            name,
            owner,
            platform_fee: settings.platform_fee,
        });
        Ok(path)
    }

    /// First 20 bytes of `blake3(registry ‖ implementation ‖ nonce)`.
    fn derive_path_address(&self, implementation: &Address) -> Address {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.address.as_bytes());
        hasher.update(implementation.as_bytes());
        hasher.update(&self.nonce.to_le_bytes());
        Address::from_digest(hasher.finalize().as_bytes())
    }

    // --- accessors ---

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn implementation(&self) -> Address {
        self.platform.get().implementation
    }

    pub fn platform_fee(&self) -> u64 {
        self.platform.get().platform_fee
    }

    pub fn platform_wallet(&self) -> Address {
        self.platform.platform_wallet()
    }

    pub fn trusted_forwarder(&self) -> Address {
        self.platform.trusted_forwarder()
    }

    pub fn is_paused(&self) -> bool {
        self.platform.get().paused
    }

    pub fn platform(&self) -> &PlatformHandle {
        &self.platform
    }

    pub fn paths(&self) -> &[PathRecord] {
        &self.paths
    }

    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use reveel_core::constants::BASE;

    const OWNER: Address = Address([0x01; 20]);
    const BOB: Address = Address([0x0B; 20]);
    const ALICE: Address = Address([0x0A; 20]);
    const FORWARDER: Address = Address([0xF0; 20]);

    fn config() -> RegistryConfig {
        RegistryConfig {
            registry_address: Address([0x99; 20]),
            implementation: Address([0x11; 20]),
            platform_wallet: Address([0xFE; 20]),
            ..RegistryConfig::default()
        }
    }

    fn registry() -> Registry {
        Registry::new(OWNER, &config()).unwrap()
    }

    fn owner() -> CallContext {
        CallContext::direct(OWNER)
    }

    fn params(name: &str) -> PathParams {
        PathParams {
            name: name.into(),
            wallet_lists: vec![vec![ALICE, BOB]],
            share_lists: vec![vec![5_000_000, 5_000_000]],
            currencies: vec![],
            limit_sequence: vec![],
            immutable: false,
        }
    }

    #[test]
    fn construction_checks() {
        let r = registry();
        assert_eq!(r.owner(), OWNER);
        assert_eq!(r.platform_fee(), 100_000);
        assert!(!r.is_paused());

        let zero_impl = RegistryConfig {
            implementation: Address::ZERO,
            ..config()
        };
        assert_eq!(
            Registry::new(OWNER, &zero_impl).unwrap_err(),
            ReveelError::Validation(ValidationError::ZeroAddressProvided)
        );
        assert!(Registry::new(Address::ZERO, &config()).is_err());
    }

    #[test]
    fn admin_setters_update_and_emit() {
        let mut r = registry();
        r.set_platform_fee(&owner(), 200_000).unwrap();
        r.set_platform_wallet(&owner(), BOB).unwrap();
        r.set_implementation(&owner(), Address([0x22; 20])).unwrap();
        r.set_trusted_forwarder(&owner(), FORWARDER).unwrap();

        assert_eq!(r.platform_fee(), 200_000);
        assert_eq!(r.platform_wallet(), BOB);
        assert_eq!(r.implementation(), Address([0x22; 20]));
        assert_eq!(r.trusted_forwarder(), FORWARDER);
        assert_eq!(
            r.take_events(),
            vec![
                RegistryEvent::PlatformFeeUpdated { fee: 200_000 },
                RegistryEvent::PlatformWalletUpdated { wallet: BOB },
                RegistryEvent::ImplementationUpdated { implementation: Address([0x22; 20]) },
                RegistryEvent::TrustedForwarderUpdated { forwarder: FORWARDER },
            ]
        );
    }

    #[test]
    fn admin_setters_reject_non_owner() {
        let mut r = registry();
        let bob = CallContext::direct(BOB);
        assert_eq!(
            r.set_platform_wallet(&bob, BOB),
            Err(ReveelError::Access(AccessError::NotOwner { caller: BOB }))
        );
        assert!(r.set_platform_fee(&bob, 1).is_err());
        assert!(r.set_implementation(&bob, BOB).is_err());
        assert!(r.toggle_pause(&bob).is_err());
        assert!(r.take_events().is_empty());
    }

    #[test]
    fn admin_setters_reject_bad_values() {
        let mut r = registry();
        assert_eq!(
            r.set_platform_fee(&owner(), 100_000_000),
            Err(ReveelError::Validation(ValidationError::PlatformFeeNotAppropriate {
                fee: 100_000_000
            }))
        );
        assert!(r.set_platform_wallet(&owner(), Address::ZERO).is_err());
        assert!(r.set_implementation(&owner(), Address::ZERO).is_err());
        assert_eq!(r.platform_fee(), 100_000);
    }

    #[test]
    fn renounce_is_forbidden() {
        let mut r = registry();
        assert_eq!(
            r.renounce_ownership(&owner()),
            Err(ReveelError::Access(AccessError::RenounceForbidden))
        );
        assert_eq!(r.owner(), OWNER);
    }

    #[test]
    fn ownership_transfer() {
        let mut r = registry();
        r.transfer_ownership(&owner(), BOB).unwrap();
        assert_eq!(r.owner(), BOB);
        assert!(r.set_platform_fee(&owner(), 1).is_err());
        r.set_platform_fee(&CallContext::direct(BOB), 1).unwrap();
    }

    #[test]
    fn pause_blocks_creation_only() {
        let mut r = registry();
        let mut path = r.create_revenue_path(&owner(), params("before")).unwrap();

        assert!(r.toggle_pause(&owner()).unwrap());
        assert_eq!(
            r.create_revenue_path(&owner(), params("during")).unwrap_err(),
            ReveelError::Access(AccessError::Paused)
        );
        // Existing paths keep working.
        path.add_tiers(&owner(), vec![vec![BOB]], vec![vec![BASE]]).unwrap();

        assert!(!r.toggle_pause(&owner()).unwrap());
        r.create_revenue_path(&owner(), params("after")).unwrap();
        assert_eq!(r.paths().len(), 2);
    }

    #[test]
    fn creation_snapshots_fee_and_records_path() {
        let mut r = registry();
        let ctx = CallContext::direct(ALICE);
        let path = r.create_revenue_path(&ctx, params("split")).unwrap();

        assert_eq!(path.owner(), ALICE);
        assert_eq!(path.name(), "split");
        assert_eq!(path.platform_fee(), 100_000);
        assert_eq!(path.implementation(), Address([0x11; 20]));

        r.set_platform_fee(&owner(), 500_000).unwrap();
        r.set_platform_wallet(&owner(), BOB).unwrap();
        assert_eq!(path.platform_fee(), 100_000);
        assert_eq!(path.platform_wallet(), BOB);

        assert_eq!(
            r.paths(),
            &[PathRecord { address: path.address(), name: "split".into(), owner: ALICE }]
        );
        assert!(matches!(
            r.take_events().first(),
            Some(RegistryEvent::RevenuePathCreated { platform_fee: 100_000, .. })
        ));
    }

    #[test]
    fn creation_validates_shapes() {
        let mut r = registry();
        let mut bad = params("bad");
        bad.currencies = vec![reveel_core::Currency::Native];
        assert_eq!(
            r.create_revenue_path(&owner(), bad).unwrap_err(),
            ReveelError::Validation(ValidationError::CurrencyLimitMismatch {
                currencies: 1,
                limit_lists: 0
            })
        );
        assert!(r.paths().is_empty());
    }

    #[test]
    fn relayed_creation_owned_by_signer() {
        let mut r = registry();
        r.set_trusted_forwarder(&owner(), FORWARDER).unwrap();
        let path = r
            .create_revenue_path(&CallContext::relayed(FORWARDER, ALICE), params("relayed"))
            .unwrap();
        assert_eq!(path.owner(), ALICE);
    }

    proptest! {
        #[test]
        fn path_addresses_are_distinct(count in 1usize..20) {
            let mut r = registry();
            let mut seen = std::collections::HashSet::new();
            for i in 0..count {
                let p = r.create_revenue_path(&owner(), params(&format!("p{i}"))).unwrap();
                prop_assert!(!p.address().is_zero());
                prop_assert!(seen.insert(p.address()));
            }
        }
    }
}
