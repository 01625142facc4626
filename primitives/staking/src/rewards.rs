use bor_keys::Address;
use bor_primitives::{coin::Coin, policy::Policy};
use bor_token::TokenLedger;

use crate::{
    config::ChainConfig,
    logs::{Log, StakingLogger},
    slots::SlotId,
    store::{MemoryStore, StakingStoreReadOpsExt},
    StakingError, StakingService,
};

impl StakingService {
    /// Runs a checkpoint: every validator active in the current epoch whose
    /// signer is not listed in `absent_signers` compounds the configured
    /// checkpoint reward into its tally, effective at the next epoch. The
    /// reward is consensus issuance, minted to the service's custody. The
    /// epoch then advances by one.
    ///
    /// A validator that claimed its slot during the current epoch is not
    /// active yet; it starts accruing rewards one checkpoint later.
    pub fn distribute_reward_to_all(
        &mut self,
        store: &mut MemoryStore,
        ledger: &mut TokenLedger,
        config: &ChainConfig,
        logger: &mut StakingLogger,
        sender: &Address,
        absent_signers: &[Address],
    ) -> Result<(), StakingError> {
        if !config.is_governance(sender) && *sender != Policy::SYSTEM_ADDRESS {
            return Err(StakingError::Unauthorized);
        }

        let epoch = self.epoch();
        let effective = Policy::first_effective_epoch(epoch);
        let reward = config.checkpoint_reward;

        let eligible: Vec<SlotId> = self.active_validators.keys().copied().collect();

        let mut minted = Coin::ZERO;

        for slot in eligible {
            let mut validator = store.expect_validator(slot)?;

            if !validator.is_active_in(epoch) {
                continue;
            }

            if absent_signers.contains(&validator.signer) {
                debug!("Validator of slot {} missed the checkpoint", slot);
                continue;
            }

            validator.compound_reward(effective, reward);
            store.put_validator(slot, validator);

            minted += reward;
            logger.push(Log::Reward {
                slot,
                value: reward,
            });
        }

        if !minted.is_zero() {
            let service_address = *self.address();
            ledger.mint(&Policy::SYSTEM_ADDRESS, &service_address, minted)?;
            self.balance += minted;
        }

        self.finalize_epoch(logger);

        Ok(())
    }

    /// Rewards a single validator, addressed by its registered signer. Only
    /// the consensus layer itself may do this. The reward compounds into
    /// the tally, effective at the next epoch.
    pub fn distribute_reward(
        &mut self,
        store: &mut MemoryStore,
        ledger: &mut TokenLedger,
        logger: &mut StakingLogger,
        sender: &Address,
        signer: &Address,
        value: Coin,
    ) -> Result<(), StakingError> {
        if *sender != Policy::SYSTEM_ADDRESS {
            return Err(StakingError::Unauthorized);
        }

        let slot = self
            .slot_by_signer(signer)
            .ok_or(StakingError::NotValidator)?;

        let mut validator = store.expect_validator(slot)?;

        if validator.is_retired() {
            return Err(StakingError::ValidatorRetired { slot });
        }

        // All checks passed, not allowed to fail from here on!

        let service_address = *self.address();
        ledger.mint(&Policy::SYSTEM_ADDRESS, &service_address, value)?;

        let effective = Policy::first_effective_epoch(self.epoch());
        validator.compound_reward(effective, value);
        self.balance += value;

        store.put_validator(slot, validator);

        logger.push(Log::Reward { slot, value });

        Ok(())
    }

    /// Burns up to `value` from a validator's tokens, rewards first, locked
    /// stake second. Only the consensus layer itself may slash. Returns the
    /// penalty actually applied, which is capped at the validator's tally.
    pub fn slash(
        &mut self,
        store: &mut MemoryStore,
        ledger: &mut TokenLedger,
        logger: &mut StakingLogger,
        sender: &Address,
        slot: SlotId,
        value: Coin,
    ) -> Result<Coin, StakingError> {
        if *sender != Policy::SYSTEM_ADDRESS {
            return Err(StakingError::Unauthorized);
        }

        let mut validator = store.expect_validator(slot)?;

        if validator.is_retired() {
            return Err(StakingError::ValidatorRetired { slot });
        }

        // All checks passed, not allowed to fail from here on!

        let rewards = validator.unlocked_rewards();
        let penalty = value.min(validator.current_tokens());
        let locked_cut = penalty.saturating_sub(rewards);

        if penalty < value {
            warn!(
                "Slash of {} exceeds the tokens of slot {}, applying {}",
                value, slot, penalty
            );
        }

        let effective = Policy::first_effective_epoch(self.epoch());

        let tokens = validator.current_tokens() - penalty;
        validator.tokens.insert(effective, tokens);
        validator.last_stake_epoch = effective;

        if !locked_cut.is_zero() {
            validator.locked -= locked_cut;
            self.sub_total_locked(effective, locked_cut);
        }

        self.active_validators.insert(slot, validator.total_stake());

        let service_address = *self.address();
        ledger.burn(&service_address, penalty)?;
        self.balance -= penalty;

        store.put_validator(slot, validator);

        logger.push(Log::Slash {
            slot,
            value: penalty,
        });

        Ok(penalty)
    }

    fn finalize_epoch(&mut self, logger: &mut StakingLogger) {
        let finalized = self.epoch;
        self.epoch += 1;
        logger.push(Log::EpochFinalized { epoch: finalized });
    }
}
