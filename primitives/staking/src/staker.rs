use serde::{Deserialize, Serialize};

use bor_keys::Address;
use bor_primitives::{
    coin::Coin,
    policy::{Epoch, Policy},
};
use bor_token::TokenLedger;

use crate::{
    config::ChainConfig,
    logs::{Log, StakingLogger},
    slots::{SlotId, SlotRegistry},
    store::{MemoryStore, StakingStoreReadOps, StakingStoreReadOpsExt},
    PendingWithdrawal, StakingError, StakingService,
};

/// A staker delegating tokens through a validator's slot. Actions
/// concerning a staker are:
/// 1. Delegate: Adds tokens behind a validator; creates the staker record
///    on first use. A staker delegates to exactly one slot at a time.
/// 2. Undelegate: Removes tokens from the delegation, starting the
///    withdrawal delay.
/// 3. Withdraw: Pays out a matured withdrawal; an emptied staker record is
///    dropped.
///
/// Delegated tokens count towards the validator's consensus weight but not
/// towards its own token tally; rewards stay with the validator.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Staker {
    // The address of the staker. All staker operations are restricted to it.
    pub address: Address,
    // The staker's delegated balance.
    pub balance: Coin,
    // The slot this staker delegates through.
    pub delegation: SlotId,
    // Undelegated tokens on their way out.
    pub withdrawal: Option<PendingWithdrawal>,
}

impl Staker {
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
    /// Delegates `value` tokens behind the validator of `slot`. Anyone with
    /// balance and allowance may delegate; the record is created on first
    /// use. Delegating to a second slot is not possible until the first
    /// delegation has been fully withdrawn.
    pub fn delegate(
        &mut self,
        store: &mut MemoryStore,
        ledger: &mut TokenLedger,
        logger: &mut StakingLogger,
        sender: &Address,
        slot: SlotId,
        value: Coin,
    ) -> Result<(), StakingError> {
        self.assert_unlocked()?;

        let mut validator = store.expect_validator(slot)?;

        if validator.is_retired() {
            return Err(StakingError::ValidatorRetired { slot });
        }

        let existing = store.get_staker(sender);
        if let Some(staker) = &existing {
            if staker.delegation != slot {
                return Err(StakingError::AlreadyDelegating {
                    slot: staker.delegation,
                });
            }
        }

        let service_address = *self.address();
        ledger.transfer_from(&service_address, sender, &service_address, value)?;

        // All checks passed, not allowed to fail from here on!

        let staker = match existing {
            Some(mut staker) => {
                staker.balance += value;
                staker
            }
            None => {
                validator.num_stakers += 1;
                Staker {
                    address: *sender,
                    balance: value,
                    delegation: slot,
                    withdrawal: None,
                }
            }
        };

        validator.delegated += value;

        let effective = Policy::first_effective_epoch(self.epoch());
        self.active_validators.insert(slot, validator.total_stake());
        self.add_total_locked(effective, value);
        self.balance += value;

        store.put_staker(sender, staker);
        store.put_validator(slot, validator);

        logger.push(Log::Delegate {
            staker: *sender,
            slot,
            value,
        });

        Ok(())
    }

    /// Removes `value` tokens from the sender's delegation. The tokens stop
    /// counting towards consensus at the next epoch and become withdrawable
    /// after the withdrawal delay. Undelegating from a retired validator is
    /// always possible.
    pub fn undelegate(
        &mut self,
        store: &mut MemoryStore,
        config: &ChainConfig,
        logger: &mut StakingLogger,
        sender: &Address,
        value: Coin,
    ) -> Result<(), StakingError> {
        self.assert_unlocked()?;

        let mut staker = store.expect_staker(sender)?;

        let remaining =
            staker
                .balance
                .checked_sub(value)
                .ok_or(StakingError::InsufficientStake {
                    needed: value,
                    stake: staker.balance,
                })?;

        // The validator record outlives its last delegation, so it must
        // still exist here.
        let slot = staker.delegation;
        let mut validator = store.expect_validator(slot)?;

        // All checks passed, not allowed to fail from here on!

        let effective = Policy::first_effective_epoch(self.epoch());

        validator.delegated -= value;

        if !validator.is_retired() {
            // A retired validator's delegations already left consensus.
            self.sub_total_locked(effective, value);
            self.active_validators.insert(slot, validator.total_stake());
        }

        staker.balance = remaining;

        let withdrawable_at = effective + config.withdrawal_delay;
        staker.schedule_withdrawal(value, withdrawable_at);

        store.put_staker(sender, staker);
        store.put_validator(slot, validator);

        logger.push(Log::Undelegate {
            staker: *sender,
            slot,
            value,
            withdrawable_at,
        });

        Ok(())
    }

    /// Pays out a staker's matured withdrawal. An emptied record is
    /// dropped, releasing the staker to delegate elsewhere; if this was the
    /// last delegation of a fully withdrawn retired validator, the
    /// validator and its slot are cleaned up as well.
    pub fn withdraw_delegation(
        &mut self,
        store: &mut MemoryStore,
        slots: &mut SlotRegistry,
        ledger: &mut TokenLedger,
        logger: &mut StakingLogger,
        sender: &Address,
    ) -> Result<Coin, StakingError> {
        self.assert_unlocked()?;

        let mut staker = store.expect_staker(sender)?;

        let withdrawal = staker.withdrawal.ok_or(StakingError::NothingToWithdraw)?;

        if self.epoch() < withdrawal.withdrawable_at {
            return Err(StakingError::WithdrawalLocked {
                withdrawable_at: withdrawal.withdrawable_at,
            });
        }

        // All checks passed, not allowed to fail from here on!

        staker.withdrawal = None;

        let service_address = *self.address();
        ledger.transfer(&service_address, sender, withdrawal.value)?;
        self.balance -= withdrawal.value;

        if staker.balance.is_zero() {
            store.remove_staker(sender);

            if let Some(mut validator) = store.get_validator(staker.delegation) {
                validator.num_stakers -= 1;

                if validator.is_retired()
                    && validator.num_stakers == 0
                    && validator.withdrawal.is_none()
                {
                    // The owner already withdrew; finish the exit here.
                    self.unregister_signer(&validator.signer);
                    store.remove_validator(staker.delegation);
                    slots.burn(&service_address, staker.delegation, logger)?;
                } else {
                    store.put_validator(staker.delegation, validator);
                }
            }
        } else {
            store.put_staker(sender, staker);
        }

        logger.push(Log::WithdrawDelegation {
            staker: *sender,
            value: withdrawal.value,
        });

        Ok(withdrawal.value)
    }
}
