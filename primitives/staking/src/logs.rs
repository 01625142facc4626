use serde::{Deserialize, Serialize};

use bor_keys::Address;
use bor_primitives::{coin::Coin, policy::Epoch};

use crate::slots::SlotId;

/// A structured staking event. Every state transition of the service pushes
/// exactly the events describing it, so downstream consumers can reconstruct
/// the contract history without replaying state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
// Renaming affects only the variant names and thus their tag, the "type" field.
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum Log {
    /// Slot token movement. Mints come from `Address::ZERO`, burns go to it.
    #[serde(rename_all = "camelCase")]
    SlotTransfer {
        from: Address,
        to: Address,
        slot: SlotId,
    },

    #[serde(rename_all = "camelCase")]
    ClaimSlot {
        slot: SlotId,
        owner: Address,
        signer: Address,
        value: Coin,
    },

    #[serde(rename_all = "camelCase")]
    Stake {
        slot: SlotId,
        value: Coin,
        restaked_rewards: Coin,
    },

    #[serde(rename_all = "camelCase")]
    Unstake {
        slot: SlotId,
        value: Coin,
        withdrawable_at: Epoch,
    },

    #[serde(rename_all = "camelCase")]
    RetireValidator { slot: SlotId, since: Epoch },

    #[serde(rename_all = "camelCase")]
    UpdateSigner {
        slot: SlotId,
        old_signer: Address,
        new_signer: Address,
    },

    #[serde(rename_all = "camelCase")]
    WithdrawStake { slot: SlotId, value: Coin },

    #[serde(rename_all = "camelCase")]
    Delegate {
        staker: Address,
        slot: SlotId,
        value: Coin,
    },

    #[serde(rename_all = "camelCase")]
    Undelegate {
        staker: Address,
        slot: SlotId,
        value: Coin,
        withdrawable_at: Epoch,
    },

    #[serde(rename_all = "camelCase")]
    WithdrawDelegation { staker: Address, value: Coin },

    #[serde(rename_all = "camelCase")]
    Reward { slot: SlotId, value: Coin },

    #[serde(rename_all = "camelCase")]
    EpochFinalized { epoch: Epoch },

    #[serde(rename_all = "camelCase")]
    Slash { slot: SlotId, value: Coin },

    ServiceLocked,

    ServiceUnlocked,

    #[serde(rename_all = "camelCase")]
    CheckpointRewardSet { old_value: Coin, new_value: Coin },

    #[serde(rename_all = "camelCase")]
    WithdrawalDelaySet { old_value: Epoch, new_value: Epoch },

    #[serde(rename_all = "camelCase")]
    MinimumStakeSet { old_value: Coin, new_value: Coin },

    #[serde(rename_all = "camelCase")]
    OwnershipTransferred {
        old_owner: Address,
        new_owner: Address,
    },
}

/// Collects the staking events of a running service. Events are kept in
/// order of occurrence and additionally emitted through the `log` crate.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StakingLogger {
    entries: Vec<Log>,
}

impl StakingLogger {
    pub fn new() -> Self {
        StakingLogger::default()
    }

    pub fn entries(&self) -> &[Log] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns all collected events.
    pub fn drain(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.entries)
    }

    pub(crate) fn push(&mut self, entry: Log) {
        debug!("Staking event: {:?}", entry);
        self.entries.push(entry);
    }
}
