use bor_staking::{SlotId, StakingStoreReadOps};
use test_log::test;

use super::*;

#[test]
fn delegation_counts_towards_the_validator_weight() {
    let mut fix = staking_service_fixture();

    let slot = claim_slot(&mut fix, 0, tokens(1)).unwrap();

    let delegator = fix.delegators[0];
    fix.service
        .delegate(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &delegator,
            slot,
            tokens(5),
        )
        .unwrap();

    assert_eq!(fix.service.active_validators[&slot], tokens(6));
    assert_eq!(fix.service.total_locked_tokens(1), tokens(6));

    // The validator's own tally does not absorb delegations.
    assert_eq!(fix.service.validator_tokens(&fix.store, slot, 1), tokens(1));

    let staker = fix.store.get_staker(&delegator).unwrap();
    assert_eq!(staker.balance, tokens(5));
    assert_eq!(staker.delegation, slot);

    let validator = fix.store.get_validator(slot).unwrap();
    assert_eq!(validator.num_stakers, 1);
    assert_eq!(validator.delegated, tokens(5));
    assert_custody_consistent(&fix);
}

#[test]
fn delegating_to_an_unknown_slot_reverts() {
    let mut fix = staking_service_fixture();

    let delegator = fix.delegators[0];
    let result = fix.service.delegate(
        &mut fix.store,
        &mut fix.token,
        &mut fix.logger,
        &delegator,
        SlotId(7),
        tokens(1),
    );

    assert_eq!(result, Err(StakingError::NonExistentSlot { slot: SlotId(7) }));
}

#[test]
fn a_staker_delegates_to_one_slot_at_a_time() {
    let mut fix = staking_service_fixture();

    let first = claim_slot(&mut fix, 0, tokens(1)).unwrap();
    let second = claim_slot(&mut fix, 1, tokens(1)).unwrap();

    let delegator = fix.delegators[0];
    fix.service
        .delegate(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &delegator,
            first,
            tokens(1),
        )
        .unwrap();

    let result = fix.service.delegate(
        &mut fix.store,
        &mut fix.token,
        &mut fix.logger,
        &delegator,
        second,
        tokens(1),
    );

    assert_eq!(result, Err(StakingError::AlreadyDelegating { slot: first }));
}

#[test]
fn undelegation_waits_out_the_withdrawal_delay() {
    let mut fix = staking_service_fixture();
    fix.config.withdrawal_delay = 1;

    let slot = claim_slot(&mut fix, 0, tokens(1)).unwrap();

    let delegator = fix.delegators[0];
    fix.service
        .delegate(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &delegator,
            slot,
            tokens(5),
        )
        .unwrap();

    fix.service
        .undelegate(
            &mut fix.store,
            &fix.config,
            &mut fix.logger,
            &delegator,
            tokens(2),
        )
        .unwrap();

    assert_eq!(fix.service.total_locked_tokens(1), tokens(4));
    assert_eq!(fix.service.active_validators[&slot], tokens(4));

    assert_eq!(
        fix.service.withdraw_delegation(
            &mut fix.store,
            &mut fix.slots,
            &mut fix.token,
            &mut fix.logger,
            &delegator,
        ),
        Err(StakingError::WithdrawalLocked { withdrawable_at: 2 })
    );

    run_checkpoint(&mut fix);
    run_checkpoint(&mut fix);

    let balance_before = fix.token.balance_of(&delegator);
    let withdrawn = fix
        .service
        .withdraw_delegation(
            &mut fix.store,
            &mut fix.slots,
            &mut fix.token,
            &mut fix.logger,
            &delegator,
        )
        .unwrap();

    assert_eq!(withdrawn, tokens(2));
    assert_eq!(fix.token.balance_of(&delegator), balance_before + tokens(2));

    // A partial exit keeps the staker record.
    let staker = fix.store.get_staker(&delegator).unwrap();
    assert_eq!(staker.balance, tokens(3));
    assert_custody_consistent(&fix);
}

#[test]
fn undelegating_more_than_the_balance_reverts() {
    let mut fix = staking_service_fixture();

    let slot = claim_slot(&mut fix, 0, tokens(1)).unwrap();

    let delegator = fix.delegators[0];
    fix.service
        .delegate(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &delegator,
            slot,
            tokens(2),
        )
        .unwrap();

    let result = fix.service.undelegate(
        &mut fix.store,
        &fix.config,
        &mut fix.logger,
        &delegator,
        tokens(3),
    );

    assert_eq!(
        result,
        Err(StakingError::InsufficientStake {
            needed: tokens(3),
            stake: tokens(2),
        })
    );
}

#[test]
fn a_full_exit_frees_the_staker() {
    let mut fix = staking_service_fixture();
    fix.config.withdrawal_delay = 1;

    let first = claim_slot(&mut fix, 0, tokens(1)).unwrap();
    let second = claim_slot(&mut fix, 1, tokens(1)).unwrap();

    let delegator = fix.delegators[0];
    fix.service
        .delegate(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &delegator,
            first,
            tokens(2),
        )
        .unwrap();

    fix.service
        .undelegate(
            &mut fix.store,
            &fix.config,
            &mut fix.logger,
            &delegator,
            tokens(2),
        )
        .unwrap();

    run_checkpoint(&mut fix);
    run_checkpoint(&mut fix);

    fix.service
        .withdraw_delegation(
            &mut fix.store,
            &mut fix.slots,
            &mut fix.token,
            &mut fix.logger,
            &delegator,
        )
        .unwrap();

    // The record is gone and the counter is back down.
    assert!(fix.store.get_staker(&delegator).is_none());
    assert_eq!(fix.store.get_validator(first).unwrap().num_stakers, 0);

    // Free to delegate elsewhere now.
    fix.service
        .delegate(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &delegator,
            second,
            tokens(1),
        )
        .unwrap();
}

#[test]
fn delegations_survive_the_validator_retirement() {
    let mut fix = staking_service_fixture();
    fix.config.withdrawal_delay = 1;

    let slot = claim_slot(&mut fix, 0, tokens(1)).unwrap();

    let delegator = fix.delegators[0];
    fix.service
        .delegate(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &delegator,
            slot,
            tokens(4),
        )
        .unwrap();

    let owner = fix.validators[0];
    fix.service
        .retire_validator(
            &mut fix.store,
            &fix.slots,
            &fix.config,
            &mut fix.logger,
            &owner,
            slot,
        )
        .unwrap();

    // Stake and delegation both left consensus with the retirement.
    assert_eq!(fix.service.total_locked_tokens(1), Coin::ZERO);

    // New delegations are refused, leaving is always possible.
    let late_delegator = fix.delegators[1];
    let late = fix.service.delegate(
        &mut fix.store,
        &mut fix.token,
        &mut fix.logger,
        &late_delegator,
        slot,
        tokens(1),
    );
    assert_eq!(late, Err(StakingError::ValidatorRetired { slot }));

    fix.service
        .undelegate(
            &mut fix.store,
            &fix.config,
            &mut fix.logger,
            &delegator,
            tokens(4),
        )
        .unwrap();

    run_checkpoint(&mut fix);
    run_checkpoint(&mut fix);

    // Owner and delegator both collect their funds; the cleanup happens
    // with whichever withdrawal comes last.
    fix.service
        .withdraw(
            &mut fix.store,
            &mut fix.slots,
            &mut fix.token,
            &mut fix.logger,
            &owner,
            slot,
        )
        .unwrap();
    assert!(fix.store.get_validator(slot).is_some());

    fix.service
        .withdraw_delegation(
            &mut fix.store,
            &mut fix.slots,
            &mut fix.token,
            &mut fix.logger,
            &delegator,
        )
        .unwrap();

    assert!(fix.store.get_validator(slot).is_none());
    assert_eq!(fix.slots.owner_of(slot), None);
    assert_eq!(fix.service.balance, Coin::ZERO);
    assert_custody_consistent(&fix);
}
