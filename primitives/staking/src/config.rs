use serde::{Deserialize, Serialize};

use bor_keys::Address;
use bor_primitives::{
    coin::Coin,
    policy::{Epoch, Policy},
};

use crate::{
    logs::{Log, StakingLogger},
    StakingError,
};

/// Governance-owned runtime parameters of the staking service. Defaults
/// come from [`Policy`]; governance can move them at runtime through the
/// gated setters. The config is inert until `initialize` names the
/// governance address — before that every gated call fails.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    governance: Option<Address>,
    pub checkpoint_reward: Coin,
    pub min_validator_stake: Coin,
    pub max_validator_slots: u16,
    pub withdrawal_delay: Epoch,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            governance: None,
            checkpoint_reward: Policy::checkpoint_reward(),
            min_validator_stake: Policy::validator_deposit(),
            max_validator_slots: Policy::MAX_VALIDATOR_SLOTS,
            withdrawal_delay: Policy::WITHDRAWAL_DELAY_EPOCHS,
        }
    }
}

impl ChainConfig {
    pub fn new() -> Self {
        ChainConfig::default()
    }

    /// Sets the governance address. May only happen once.
    pub fn initialize(&mut self, governance: Address) -> Result<(), StakingError> {
        if self.governance.is_some() {
            return Err(StakingError::AlreadyInitialized);
        }
        self.governance = Some(governance);
        Ok(())
    }

    pub fn governance(&self) -> Option<&Address> {
        self.governance.as_ref()
    }

    pub fn is_governance(&self, address: &Address) -> bool {
        self.governance.as_ref() == Some(address)
    }

    pub(crate) fn require_governance(&self, sender: &Address) -> Result<(), StakingError> {
        if !self.is_governance(sender) {
            debug!("{} is not the governance address", sender);
            return Err(StakingError::Unauthorized);
        }
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        logger: &mut StakingLogger,
        sender: &Address,
        new_governance: Address,
    ) -> Result<(), StakingError> {
        self.require_governance(sender)?;

        let old_owner = self.governance.replace(new_governance).expect("checked above");

        logger.push(Log::OwnershipTransferred {
            old_owner,
            new_owner: new_governance,
        });

        Ok(())
    }

    pub fn set_checkpoint_reward(
        &mut self,
        logger: &mut StakingLogger,
        sender: &Address,
        value: Coin,
    ) -> Result<(), StakingError> {
        self.require_governance(sender)?;

        logger.push(Log::CheckpointRewardSet {
            old_value: self.checkpoint_reward,
            new_value: value,
        });
        self.checkpoint_reward = value;

        Ok(())
    }

    pub fn set_withdrawal_delay(
        &mut self,
        logger: &mut StakingLogger,
        sender: &Address,
        epochs: Epoch,
    ) -> Result<(), StakingError> {
        self.require_governance(sender)?;

        logger.push(Log::WithdrawalDelaySet {
            old_value: self.withdrawal_delay,
            new_value: epochs,
        });
        self.withdrawal_delay = epochs;

        Ok(())
    }

    pub fn set_min_validator_stake(
        &mut self,
        logger: &mut StakingLogger,
        sender: &Address,
        value: Coin,
    ) -> Result<(), StakingError> {
        self.require_governance(sender)?;

        logger.push(Log::MinimumStakeSet {
            old_value: self.min_validator_stake,
            new_value: value,
        });
        self.min_validator_stake = value;

        Ok(())
    }
}
