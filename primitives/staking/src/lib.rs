#[macro_use]
extern crate log;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bor_keys::Address;
use bor_primitives::{coin::Coin, policy::Epoch};
use bor_token::TokenError;

pub use crate::{
    config::ChainConfig,
    logs::{Log, StakingLogger},
    slots::{SlotId, SlotRegistry},
    staker::Staker,
    store::{MemoryStore, StakingStoreReadOps, StakingStoreReadOpsExt},
    validator::Validator,
};

pub mod config;
pub mod logs;
mod rewards;
pub mod slots;
pub mod staker;
pub mod store;
pub mod validator;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StakingError {
    #[error("locked")]
    Locked,
    #[error("not validator")]
    NotValidator,
    #[error("already initialized")]
    AlreadyInitialized,
    #[error("unauthorized")]
    Unauthorized,
    #[error("no free validator slots")]
    NoFreeSlots,
    #[error("nonexistent slot {slot}")]
    NonExistentSlot { slot: SlotId },
    #[error("nonexistent staker {address}")]
    NonExistentStaker { address: Address },
    #[error("signer {signer} already registered")]
    SignerAlreadyRegistered { signer: Address },
    #[error("insufficient stake: needed {needed}, but has {stake}")]
    InsufficientStake { needed: Coin, stake: Coin },
    #[error("validator of slot {slot} is retired")]
    ValidatorRetired { slot: SlotId },
    #[error("already delegating to slot {slot}")]
    AlreadyDelegating { slot: SlotId },
    #[error("withdrawal locked until epoch {withdrawable_at}")]
    WithdrawalLocked { withdrawable_at: Epoch },
    #[error("nothing to withdraw")]
    NothingToWithdraw,
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Tokens that left the locked stake and wait out the withdrawal delay.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PendingWithdrawal {
    pub value: Coin,
    pub withdrawable_at: Epoch,
}

/// The staking service. It tracks the aggregate state of the validator set:
/// the current epoch, the emergency lock, the custody balance and the
/// per-epoch total of consensus-locked tokens. Per-validator and per-staker
/// records live in a [`MemoryStore`]; slot ownership lives in the
/// [`SlotRegistry`] whose registry ownership must be transferred to the
/// service before any slot can be claimed.
///
/// All stake movements are snapshotted per epoch and become effective at
/// `epoch + 1`. Two series exist side by side:
///   - `total_locked` — consensus-effective stake, moved only by explicit
///     lock operations (claim, stake, delegate, unstake, slash),
///   - the per-validator token tally — the validator's own stake plus
///     rewards, which compound automatically on distribution but only count
///     towards `total_locked` once restaked.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StakingService {
    address: Address,
    epoch: Epoch,
    locked: bool,
    // The total amount of tokens in the service's custody: locked stake,
    // compounded rewards and pending withdrawals.
    pub balance: Coin,
    // The validators eligible for checkpoint duty, and their total stake
    // (own locked stake plus delegations).
    pub active_validators: BTreeMap<SlotId, Coin>,
    signer_to_slot: BTreeMap<Address, SlotId>,
    total_locked: BTreeMap<Epoch, Coin>,
}

impl StakingService {
    pub fn new(address: Address) -> Self {
        StakingService {
            address,
            epoch: 0,
            locked: false,
            balance: Coin::ZERO,
            active_validators: BTreeMap::new(),
            signer_to_slot: BTreeMap::new(),
            total_locked: BTreeMap::new(),
        }
    }

    /// The ledger account the service holds custody on.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The current epoch. Advances once per checkpoint.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The consensus-locked token total at `epoch`. Answers from per-epoch
    /// snapshots; epochs without an own snapshot inherit the latest one
    /// before them.
    pub fn total_locked_tokens(&self, epoch: Epoch) -> Coin {
        snapshot_at(&self.total_locked, epoch)
    }

    /// The token tally of the validator in `slot` at `epoch` (own stake
    /// plus compounded rewards). Zero for unknown slots.
    pub fn validator_tokens<T: StakingStoreReadOps>(
        &self,
        store: &T,
        slot: SlotId,
        epoch: Epoch,
    ) -> Coin {
        store
            .get_validator(slot)
            .map(|validator| validator.tokens_at(epoch))
            .unwrap_or(Coin::ZERO)
    }

    /// Looks up the slot whose validator registered `signer`.
    pub fn slot_by_signer(&self, signer: &Address) -> Option<SlotId> {
        self.signer_to_slot.get(signer).copied()
    }

    /// Engages the emergency lock. Every stake-moving user operation fails
    /// with `"locked"` until governance unlocks again; checkpoints keep
    /// running.
    pub fn lock(
        &mut self,
        config: &ChainConfig,
        logger: &mut StakingLogger,
        sender: &Address,
    ) -> Result<(), StakingError> {
        config.require_governance(sender)?;

        self.locked = true;
        logger.push(Log::ServiceLocked);

        Ok(())
    }

    pub fn unlock(
        &mut self,
        config: &ChainConfig,
        logger: &mut StakingLogger,
        sender: &Address,
    ) -> Result<(), StakingError> {
        config.require_governance(sender)?;

        self.locked = false;
        logger.push(Log::ServiceUnlocked);

        Ok(())
    }

    pub(crate) fn assert_unlocked(&self) -> Result<(), StakingError> {
        if self.locked {
            return Err(StakingError::Locked);
        }
        Ok(())
    }

    pub(crate) fn register_signer(&mut self, signer: Address, slot: SlotId) {
        self.signer_to_slot.insert(signer, slot);
    }

    pub(crate) fn unregister_signer(&mut self, signer: &Address) {
        self.signer_to_slot.remove(signer);
    }

    /// Raises the total-locked snapshot at `effective`, carrying the latest
    /// value forward.
    pub(crate) fn add_total_locked(&mut self, effective: Epoch, value: Coin) {
        let total = snapshot_at(&self.total_locked, effective) + value;
        self.total_locked.insert(effective, total);
    }

    pub(crate) fn sub_total_locked(&mut self, effective: Epoch, value: Coin) {
        let total = snapshot_at(&self.total_locked, effective)
            .checked_sub(value)
            .expect("inconsistent contract state");
        self.total_locked.insert(effective, total);
    }
}

/// The value of a per-epoch snapshot series at `epoch`: the entry at the
/// greatest snapshot epoch that is not past the query.
pub(crate) fn snapshot_at(snapshots: &BTreeMap<Epoch, Coin>, epoch: Epoch) -> Coin {
    snapshots
        .range(..=epoch)
        .next_back()
        .map(|(_, value)| *value)
        .unwrap_or(Coin::ZERO)
}
