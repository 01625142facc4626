use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bor_keys::Address;

use crate::{slots::SlotId, staker::Staker, validator::Validator, StakingError};

/// Read operations every staking store has to offer. Values are returned by
/// value; mutations go through the concrete store's `put_*`/`remove_*`.
pub trait StakingStoreReadOps {
    fn get_validator(&self, slot: SlotId) -> Option<Validator>;

    fn get_staker(&self, address: &Address) -> Option<Staker>;
}

pub trait StakingStoreReadOpsExt {
    fn expect_validator(&self, slot: SlotId) -> Result<Validator, StakingError>;

    fn expect_staker(&self, address: &Address) -> Result<Staker, StakingError>;
}

impl<T: StakingStoreReadOps> StakingStoreReadOpsExt for T {
    fn expect_validator(&self, slot: SlotId) -> Result<Validator, StakingError> {
        self.get_validator(slot)
            .ok_or(StakingError::NonExistentSlot { slot })
    }

    fn expect_staker(&self, address: &Address) -> Result<Staker, StakingError> {
        self.get_staker(address)
            .ok_or(StakingError::NonExistentStaker { address: *address })
    }
}

/// The in-memory entity store of the staking service: one record per
/// validator (keyed by slot) and one per staker (keyed by address).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    validators: BTreeMap<SlotId, Validator>,
    stakers: BTreeMap<Address, Staker>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn put_validator(&mut self, slot: SlotId, validator: Validator) {
        self.validators.insert(slot, validator);
    }

    pub fn remove_validator(&mut self, slot: SlotId) {
        self.validators.remove(&slot);
    }

    pub fn put_staker(&mut self, address: &Address, staker: Staker) {
        self.stakers.insert(*address, staker);
    }

    pub fn remove_staker(&mut self, address: &Address) {
        self.stakers.remove(address);
    }

    pub fn iter_validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    pub fn iter_stakers(&self) -> impl Iterator<Item = &Staker> {
        self.stakers.values()
    }

    pub fn num_validators(&self) -> usize {
        self.validators.len()
    }

    pub fn num_stakers(&self) -> usize {
        self.stakers.len()
    }
}

impl StakingStoreReadOps for MemoryStore {
    fn get_validator(&self, slot: SlotId) -> Option<Validator> {
        self.validators.get(&slot).cloned()
    }

    fn get_staker(&self, address: &Address) -> Option<Staker> {
        self.stakers.get(address).cloned()
    }
}
