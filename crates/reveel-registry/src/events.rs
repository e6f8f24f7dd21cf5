//! Registry events.

use serde::{Deserialize, Serialize};

use reveel_core::Address;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    RevenuePathCreated {
        path: Address,
        name: String,
        owner: Address,
        platform_fee: u64,
    },
    PlatformFeeUpdated { fee: u64 },
    PlatformWalletUpdated { wallet: Address },
    ImplementationUpdated { implementation: Address },
    TrustedForwarderUpdated { forwarder: Address },
    PauseToggled { paused: bool },
    OwnershipTransferred { previous: Address, new: Address },
}
