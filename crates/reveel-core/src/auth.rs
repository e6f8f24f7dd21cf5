//! Caller admission for privileged operations.
//!
//! Every mutating call receives a [`CallContext`] describing who submitted
//! it. Relayed (meta-transaction) calls name the original signer; the signer
//! is only honoured when the relay is the platform's trusted forwarder.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::AccessError;

/// Who is calling, as seen at the boundary of a path or registry.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// The immediate submitter of the call.
    pub sender: Address,
    /// Original signer claimed by a relaying sender, if any.
    pub signer: Option<Address>,
}

impl CallContext {
    /// A call submitted directly by `sender`.
    pub fn direct(sender: Address) -> Self {
        Self { sender, signer: None }
    }

    /// A call submitted by `relayer` on behalf of `signer`.
    pub fn relayed(relayer: Address, signer: Address) -> Self {
        Self {
            sender: relayer,
            signer: Some(signer),
        }
    }

    /// Resolve the account the call acts for.
    ///
    /// # Examples
    ///
    /// ```
    /// use reveel_core::{Address, CallContext};
    /// let forwarder = Address([0xF0; 20]);
    /// let alice = Address([0xA1; 20]);
    /// let ctx = CallContext::relayed(forwarder, alice);
    /// assert_eq!(ctx.effective_caller(&forwarder), alice);
    /// assert_eq!(ctx.effective_caller(&Address::ZERO), forwarder);
    /// ```
    pub fn effective_caller(&self, trusted_forwarder: &Address) -> Address {
        match self.signer {
            Some(signer) if !trusted_forwarder.is_zero() && self.sender == *trusted_forwarder => {
                signer
            }
            _ => self.sender,
        }
    }

    /// Require that the effective caller is `owner`.
    pub fn require_owner(
        &self,
        owner: &Address,
        trusted_forwarder: &Address,
    ) -> Result<Address, AccessError> {
        let caller = self.effective_caller(trusted_forwarder);
        if caller != *owner {
            tracing::warn!(%caller, %owner, "rejected privileged call");
            return Err(AccessError::NotOwner { caller });
        }
        Ok(caller)
    }
}
