use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bor_keys::{Address, SignerPublicKey};
use bor_primitives::{
    coin::Coin,
    policy::{Epoch, Policy},
};
use bor_token::TokenLedger;

use crate::{
    config::ChainConfig,
    logs::{Log, StakingLogger},
    slots::{SlotId, SlotRegistry},
    snapshot_at,
    store::{MemoryStore, StakingStoreReadOpsExt},
    PendingWithdrawal, StakingError, StakingService,
};

/// A validator in the staking service. Actions concerning a validator are:
/// 1. Claim: Claims a free slot, minting the slot token and locking the
///    initial stake.
/// 2. Stake: Adds stake towards an owned slot, optionally locking the
///    rewards accrued so far.
/// 3. Unstake: Removes part of the locked stake (down to the configured
///    minimum), starting the withdrawal delay.
/// 4. Retire: Deactivates the validator; its stake and rewards start the
///    withdrawal delay.
/// 5. Withdraw: Pays out a matured withdrawal. A fully exited validator is
///    dropped and its slot burned once the last delegation has left.
///
/// The actions can be summarized by the following state diagram:
///
/// ```text
///         +--------+   unstake/stake    +--------+          +-----------+
///  claim  |        +------------------->+        |  retire  |           |
/// +------>+ active |                    | active +--------->+  retired  |
///         |        +<-------------------+        |          |           |
///         +--------+                    +--------+          +-----+-----+
///                                                                 |
///                                              withdraw (delayed) |
///                                                                 v
///                                                              dropped
/// ```
///
/// All stake movements become effective at the next epoch; the epoch they
/// were made in keeps its previous snapshot.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    // The slot this validator occupies. The slot token's current owner is
    // the only address allowed to stake, unstake, retire or withdraw.
    pub slot: SlotId,
    // The address the validator signs checkpoints with. Single-validator
    // rewards are addressed to it.
    pub signer: Address,
    // The public key matching the signer address.
    pub signer_key: SignerPublicKey,
    // The first epoch this validator is eligible for checkpoint duty.
    pub activation_epoch: Epoch,
    // The newest epoch with a token-tally snapshot.
    pub last_stake_epoch: Epoch,
    // Per-epoch snapshots of the validator's own tokens: stake plus
    // compounded rewards. Does not include delegations.
    pub tokens: BTreeMap<Epoch, Coin>,
    // The validator's own consensus-locked stake. Rewards only move here
    // once they are restaked.
    pub locked: Coin,
    // The total balance delegated to this validator.
    pub delegated: Coin,
    // The number of stakers delegating to this validator.
    pub num_stakers: u64,
    // Set once the validator retires; names the first epoch it no longer
    // participates in.
    pub retired_since: Option<Epoch>,
    // Stake on its way out, withdrawable once the delay has passed.
    pub withdrawal: Option<PendingWithdrawal>,
}

impl Validator {
    pub fn is_retired(&self) -> bool {
        self.retired_since.is_some()
    }

    /// Whether this validator participates in checkpoint duty at `epoch`.
    pub fn is_active_in(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch
            && self.retired_since.map_or(true, |since| epoch < since)
    }

    /// The validator's token tally at `epoch`, carrying the latest snapshot
    /// forward.
    pub fn tokens_at(&self, epoch: Epoch) -> Coin {
        snapshot_at(&self.tokens, epoch)
    }

    /// The validator's current token tally (at the newest snapshot).
    pub fn current_tokens(&self) -> Coin {
        self.tokens_at(self.last_stake_epoch)
    }

    /// Own locked stake plus delegations: the weight this validator puts
    /// into consensus.
    pub fn total_stake(&self) -> Coin {
        self.locked + self.delegated
    }

    /// Rewards that have compounded into the tally but are not locked yet.
    pub fn unlocked_rewards(&self) -> Coin {
        self.current_tokens()
            .checked_sub(self.locked)
            .expect("inconsistent contract state")
    }

    /// Adds a distributed reward to the tally, effective at `effective`.
    pub(crate) fn compound_reward(&mut self, effective: Epoch, value: Coin) {
        let tokens = self.current_tokens() + value;
        self.tokens.insert(effective, tokens);
        self.last_stake_epoch = effective;
    }

    /// Merges `value` into the pending withdrawal. Adding to an existing
    /// withdrawal restarts the delay for the whole pending amount.
    pub(crate) fn schedule_withdrawal(&mut self, value: Coin, withdrawable_at: Epoch) {
        let pending = self
            .withdrawal
            .map(|withdrawal| withdrawal.value)
            .unwrap_or(Coin::ZERO);

        self.withdrawal = Some(PendingWithdrawal {
            value: pending + value,
            withdrawable_at,
        });
    }
}

impl StakingService {
    /// Claims a free validator slot: takes custody of `value` tokens, mints
    /// the next slot token to the sender and registers the validator. The
    /// new validator participates from the next epoch on.
    #[allow(clippy::too_many_arguments)]
    pub fn claim_validator_slot(
        &mut self,
        store: &mut MemoryStore,
        slots: &mut SlotRegistry,
        ledger: &mut TokenLedger,
        config: &ChainConfig,
        logger: &mut StakingLogger,
        sender: &Address,
        signer: Address,
        signer_key: SignerPublicKey,
        value: Coin,
    ) -> Result<SlotId, StakingError> {
        self.assert_unlocked()?;

        if slots.len() >= config.max_validator_slots as usize {
            return Err(StakingError::NoFreeSlots);
        }

        if value < config.min_validator_stake {
            return Err(StakingError::InsufficientStake {
                needed: config.min_validator_stake,
                stake: value,
            });
        }

        if self.slot_by_signer(&signer).is_some() {
            return Err(StakingError::SignerAlreadyRegistered { signer });
        }

        let service_address = *self.address();

        // The registry must have been handed to the service at deployment.
        if *slots.owner() != service_address {
            return Err(StakingError::Unauthorized);
        }

        // Take custody of the deposit. Fails on missing allowance or funds.
        ledger.transfer_from(&service_address, sender, &service_address, value)?;

        // All checks passed, not allowed to fail from here on!

        let slot = slots.mint(sender, logger);

        let effective = Policy::first_effective_epoch(self.epoch());

        let mut tokens = BTreeMap::new();
        tokens.insert(effective, value);

        let validator = Validator {
            slot,
            signer,
            signer_key,
            activation_epoch: effective,
            last_stake_epoch: effective,
            tokens,
            locked: value,
            delegated: Coin::ZERO,
            num_stakers: 0,
            retired_since: None,
            withdrawal: None,
        };

        self.register_signer(signer, slot);
        self.active_validators.insert(slot, validator.total_stake());
        self.add_total_locked(effective, value);
        self.balance += value;

        store.put_validator(slot, validator);

        logger.push(Log::ClaimSlot {
            slot,
            owner: *sender,
            signer,
            value,
        });

        Ok(slot)
    }

    /// Adds stake towards an owned slot. With `restake_rewards`, the
    /// rewards accrued so far are locked along with `value`.
    #[allow(clippy::too_many_arguments)]
    pub fn stake(
        &mut self,
        store: &mut MemoryStore,
        slots: &SlotRegistry,
        ledger: &mut TokenLedger,
        logger: &mut StakingLogger,
        sender: &Address,
        slot: SlotId,
        value: Coin,
        restake_rewards: bool,
    ) -> Result<(), StakingError> {
        self.assert_unlocked()?;

        // The slot token is the staking permit: only its owner may stake.
        if slots.owner_of(slot) != Some(sender) {
            debug!("{} does not own slot {}", sender, slot);
            return Err(StakingError::NotValidator);
        }

        let mut validator = store.expect_validator(slot)?;

        if validator.is_retired() {
            return Err(StakingError::ValidatorRetired { slot });
        }

        let service_address = *self.address();
        ledger.transfer_from(&service_address, sender, &service_address, value)?;

        // All checks passed, not allowed to fail from here on!

        let rewards = if restake_rewards {
            validator.unlocked_rewards()
        } else {
            Coin::ZERO
        };

        let effective = Policy::first_effective_epoch(self.epoch());

        let tokens = validator.current_tokens() + value;
        validator.tokens.insert(effective, tokens);
        validator.last_stake_epoch = effective;

        let newly_locked = value + rewards;
        validator.locked += newly_locked;

        self.active_validators.insert(slot, validator.total_stake());
        self.add_total_locked(effective, newly_locked);
        self.balance += value;

        store.put_validator(slot, validator);

        logger.push(Log::Stake {
            slot,
            value,
            restaked_rewards: rewards,
        });

        Ok(())
    }

    /// Removes part of the locked stake. The remainder must stay above the
    /// configured minimum; a full exit goes through `retire_validator`. The
    /// unstaked tokens become withdrawable after the withdrawal delay.
    #[allow(clippy::too_many_arguments)]
    pub fn unstake(
        &mut self,
        store: &mut MemoryStore,
        slots: &SlotRegistry,
        config: &ChainConfig,
        logger: &mut StakingLogger,
        sender: &Address,
        slot: SlotId,
        value: Coin,
    ) -> Result<(), StakingError> {
        self.assert_unlocked()?;

        if slots.owner_of(slot) != Some(sender) {
            return Err(StakingError::NotValidator);
        }

        let mut validator = store.expect_validator(slot)?;

        if validator.is_retired() {
            return Err(StakingError::ValidatorRetired { slot });
        }

        let remaining =
            validator
                .locked
                .checked_sub(value)
                .ok_or(StakingError::InsufficientStake {
                    needed: value,
                    stake: validator.locked,
                })?;

        if remaining < config.min_validator_stake {
            return Err(StakingError::InsufficientStake {
                needed: config.min_validator_stake,
                stake: remaining,
            });
        }

        // All checks passed, not allowed to fail from here on!

        let effective = Policy::first_effective_epoch(self.epoch());

        let tokens = validator.current_tokens() - value;
        validator.tokens.insert(effective, tokens);
        validator.last_stake_epoch = effective;

        validator.locked = remaining;

        let withdrawable_at = effective + config.withdrawal_delay;
        validator.schedule_withdrawal(value, withdrawable_at);

        self.active_validators.insert(slot, validator.total_stake());
        self.sub_total_locked(effective, value);

        store.put_validator(slot, validator);

        logger.push(Log::Unstake {
            slot,
            value,
            withdrawable_at,
        });

        Ok(())
    }

    /// Retires a validator: it leaves checkpoint duty at the next epoch and
    /// its stake and accrued rewards start the withdrawal delay. Delegated
    /// balances stay with their stakers and leave through undelegation.
    pub fn retire_validator(
        &mut self,
        store: &mut MemoryStore,
        slots: &SlotRegistry,
        config: &ChainConfig,
        logger: &mut StakingLogger,
        sender: &Address,
        slot: SlotId,
    ) -> Result<(), StakingError> {
        self.assert_unlocked()?;

        if slots.owner_of(slot) != Some(sender) {
            return Err(StakingError::NotValidator);
        }

        let mut validator = store.expect_validator(slot)?;

        if validator.is_retired() {
            return Err(StakingError::ValidatorRetired { slot });
        }

        // All checks passed, not allowed to fail from here on!

        let effective = Policy::first_effective_epoch(self.epoch());

        // Stake, rewards and delegations all stop counting towards
        // consensus; only the validator's own tokens enter its withdrawal.
        let released = validator.current_tokens();
        validator.tokens.insert(effective, Coin::ZERO);
        validator.last_stake_epoch = effective;

        self.sub_total_locked(effective, validator.total_stake());
        validator.locked = Coin::ZERO;

        validator.retired_since = Some(effective);

        let withdrawable_at = effective + config.withdrawal_delay;
        validator.schedule_withdrawal(released, withdrawable_at);

        self.active_validators
            .remove(&slot)
            .expect("inconsistent contract state");

        store.put_validator(slot, validator);

        logger.push(Log::RetireValidator {
            slot,
            since: effective,
        });

        Ok(())
    }

    /// Pays out a matured withdrawal to the slot owner. Once a retired
    /// validator has withdrawn and its last delegation has left, the
    /// validator record is dropped and the slot token burned.
    pub fn withdraw(
        &mut self,
        store: &mut MemoryStore,
        slots: &mut SlotRegistry,
        ledger: &mut TokenLedger,
        logger: &mut StakingLogger,
        sender: &Address,
        slot: SlotId,
    ) -> Result<Coin, StakingError> {
        self.assert_unlocked()?;

        if slots.owner_of(slot) != Some(sender) {
            return Err(StakingError::NotValidator);
        }

        let mut validator = store.expect_validator(slot)?;

        let withdrawal = validator.withdrawal.ok_or(StakingError::NothingToWithdraw)?;

        if self.epoch() < withdrawal.withdrawable_at {
            return Err(StakingError::WithdrawalLocked {
                withdrawable_at: withdrawal.withdrawable_at,
            });
        }

        // All checks passed, not allowed to fail from here on!

        validator.withdrawal = None;

        let service_address = *self.address();
        ledger.transfer(&service_address, sender, withdrawal.value)?;
        self.balance -= withdrawal.value;

        if validator.is_retired() && validator.num_stakers == 0 {
            // Full exit: drop the validator and burn its slot.
            self.unregister_signer(&validator.signer);
            store.remove_validator(slot);
            slots.burn(&service_address, slot, logger)?;
        } else {
            store.put_validator(slot, validator);
        }

        logger.push(Log::WithdrawStake {
            slot,
            value: withdrawal.value,
        });

        Ok(withdrawal.value)
    }

    /// Rotates the signer key of a validator. Allowed even while the
    /// service is locked, so a compromised signer can be replaced during an
    /// incident.
    #[allow(clippy::too_many_arguments)]
    pub fn update_signer(
        &mut self,
        store: &mut MemoryStore,
        slots: &SlotRegistry,
        logger: &mut StakingLogger,
        sender: &Address,
        slot: SlotId,
        new_signer: Address,
        new_signer_key: SignerPublicKey,
    ) -> Result<(), StakingError> {
        if slots.owner_of(slot) != Some(sender) {
            return Err(StakingError::NotValidator);
        }

        let mut validator = store.expect_validator(slot)?;

        if new_signer != validator.signer && self.slot_by_signer(&new_signer).is_some() {
            return Err(StakingError::SignerAlreadyRegistered { signer: new_signer });
        }

        // All checks passed, not allowed to fail from here on!

        let old_signer = validator.signer;
        self.unregister_signer(&old_signer);
        self.register_signer(new_signer, slot);

        validator.signer = new_signer;
        validator.signer_key = new_signer_key;

        store.put_validator(slot, validator);

        logger.push(Log::UpdateSigner {
            slot,
            old_signer,
            new_signer,
        });

        Ok(())
    }
}
