use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use bor_keys::Address;

use crate::{
    logs::{Log, StakingLogger},
    StakingError,
};

/// The id of a validator slot token. Ids are minted sequentially starting
/// at 1 and are never reused, not even after a burn.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SlotId(pub u64);

impl SlotId {
    /// The id the first claimed slot receives.
    pub const FIRST: SlotId = SlotId(1);
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The non-fungible validator slot token. Owning a slot is the staking
/// permit: the service checks every stake operation against the current
/// slot owner, so selling the token hands over the validator position.
///
/// The registry itself is owned; only its owner mints and burns. Deployment
/// transfers registry ownership to the staking service, mirroring the fact
/// that slots only come into existence by claiming them.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SlotRegistry {
    owner: Address,
    next_id: u64,
    slots: BTreeMap<SlotId, Address>,
}

impl SlotRegistry {
    pub fn new(owner: Address) -> Self {
        SlotRegistry {
            owner,
            next_id: SlotId::FIRST.0,
            slots: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Hands the registry to a new owner. Only the current owner may do so.
    pub fn transfer_ownership(
        &mut self,
        sender: &Address,
        new_owner: Address,
    ) -> Result<(), StakingError> {
        if *sender != self.owner {
            return Err(StakingError::Unauthorized);
        }
        self.owner = new_owner;
        Ok(())
    }

    /// Number of slots currently in existence.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots ever minted, burned ones included.
    pub fn total_minted(&self) -> u64 {
        self.next_id - SlotId::FIRST.0
    }

    pub fn owner_of(&self, slot: SlotId) -> Option<&Address> {
        self.slots.get(&slot)
    }

    pub fn expect_owner(&self, slot: SlotId) -> Result<Address, StakingError> {
        self.owner_of(slot)
            .copied()
            .ok_or(StakingError::NonExistentSlot { slot })
    }

    /// Transfers a slot to a new owner. The staking permit follows the
    /// token: from here on only `to` may stake towards this slot.
    pub fn transfer(
        &mut self,
        sender: &Address,
        to: Address,
        slot: SlotId,
        logger: &mut StakingLogger,
    ) -> Result<(), StakingError> {
        let owner = self.expect_owner(slot)?;
        if owner != *sender {
            return Err(StakingError::Unauthorized);
        }

        self.slots.insert(slot, to);

        logger.push(Log::SlotTransfer {
            from: owner,
            to,
            slot,
        });

        Ok(())
    }

    /// Mints the next slot to `to`. Authority is checked by the caller (the
    /// staking service verifies it owns the registry before claiming).
    pub(crate) fn mint(&mut self, to: &Address, logger: &mut StakingLogger) -> SlotId {
        let slot = SlotId(self.next_id);
        self.next_id += 1;
        self.slots.insert(slot, *to);

        logger.push(Log::SlotTransfer {
            from: Address::ZERO,
            to: *to,
            slot,
        });

        slot
    }

    pub(crate) fn burn(
        &mut self,
        caller: &Address,
        slot: SlotId,
        logger: &mut StakingLogger,
    ) -> Result<(), StakingError> {
        if *caller != self.owner {
            return Err(StakingError::Unauthorized);
        }

        let owner = self.expect_owner(slot)?;
        self.slots.remove(&slot);

        logger.push(Log::SlotTransfer {
            from: owner,
            to: Address::ZERO,
            slot,
        });

        Ok(())
    }
}
