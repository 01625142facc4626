use bor_primitives::policy::Policy;
use bor_staking::{Log, StakingStoreReadOps};
use bor_test_utils::random_address;
use test_log::test;

use super::*;

#[test]
fn a_fresh_validator_earns_nothing_at_its_first_checkpoint() {
    let mut fix = staking_service_fixture();

    let slot = claim_slot(&mut fix, 0, tokens(1)).unwrap();

    // Claimed during epoch 0, active from epoch 1: the checkpoint closing
    // epoch 0 pays no reward yet.
    run_checkpoint(&mut fix);

    assert_eq!(fix.service.epoch(), 1);
    let validator = fix.store.get_validator(slot).unwrap();
    assert_eq!(validator.last_stake_epoch, 1);
    assert_eq!(validator.current_tokens(), tokens(1));
}

#[test]
fn rewards_accrue_after_one_full_epoch() {
    let mut fix = staking_service_fixture();

    let governance = fix.governance;
    fix.config
        .set_checkpoint_reward(&mut fix.logger, &governance, tokens(1))
        .unwrap();

    let slot = claim_slot(&mut fix, 0, tokens(1)).unwrap();

    // After staking, rewards only accumulate at the next epoch: skip one
    // epoch, then one more to let a checkpoint reward through.
    run_checkpoint(&mut fix);
    run_checkpoint(&mut fix);

    fix.service
        .distribute_reward(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &Policy::SYSTEM_ADDRESS,
            &signer_account(1),
            tokens(1),
        )
        .unwrap();

    assert_eq!(fix.service.epoch(), 2);

    // Rewards compound into the tally without touching the locked total.
    let validator = fix.store.get_validator(slot).unwrap();
    assert_eq!(validator.last_stake_epoch, 3);
    assert_eq!(
        fix.service
            .validator_tokens(&fix.store, slot, validator.last_stake_epoch),
        tokens(3)
    );
    assert_eq!(fix.service.total_locked_tokens(fix.service.epoch()), tokens(1));
    assert_custody_consistent(&fix);
}

#[test]
fn restaking_locks_the_accrued_rewards() {
    let mut fix = staking_service_fixture();

    let governance = fix.governance;
    fix.config
        .set_checkpoint_reward(&mut fix.logger, &governance, tokens(1))
        .unwrap();

    let slot = claim_slot(&mut fix, 0, tokens(1)).unwrap();

    run_checkpoint(&mut fix);
    run_checkpoint(&mut fix);

    fix.service
        .distribute_reward(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &Policy::SYSTEM_ADDRESS,
            &signer_account(1),
            tokens(1),
        )
        .unwrap();

    // Stake nothing, restake everything accrued so far.
    let owner = fix.validators[0];
    fix.service
        .stake(
            &mut fix.store,
            &fix.slots,
            &mut fix.token,
            &mut fix.logger,
            &owner,
            slot,
            Coin::ZERO,
            true,
        )
        .unwrap();

    let epoch = fix.service.epoch();
    assert_eq!(fix.service.total_locked_tokens(epoch), tokens(1));
    assert_eq!(fix.service.total_locked_tokens(epoch + 1), tokens(3));

    let validator = fix.store.get_validator(slot).unwrap();
    assert_eq!(validator.locked, tokens(3));
    assert_eq!(validator.unlocked_rewards(), Coin::ZERO);
    assert_custody_consistent(&fix);
}

#[test]
fn absent_signers_receive_no_reward() {
    let mut fix = staking_service_fixture();

    let first = claim_slot(&mut fix, 0, tokens(1)).unwrap();
    let second = claim_slot(&mut fix, 1, tokens(1)).unwrap();

    run_checkpoint(&mut fix);
    run_checkpoint_with_absent(&mut fix, &[signer_account(1)]);

    assert_eq!(
        fix.service.validator_tokens(&fix.store, first, 2),
        tokens(1)
    );
    assert_eq!(
        fix.service.validator_tokens(&fix.store, second, 2),
        tokens(2)
    );
}

#[test]
fn checkpoints_are_gated() {
    let mut fix = staking_service_fixture();

    let stranger = random_address();
    let result = fix.service.distribute_reward_to_all(
        &mut fix.store,
        &mut fix.token,
        &fix.config,
        &mut fix.logger,
        &stranger,
        &[],
    );
    assert_eq!(result, Err(StakingError::Unauthorized));

    // The consensus layer may run checkpoints as well as governance.
    fix.service
        .distribute_reward_to_all(
            &mut fix.store,
            &mut fix.token,
            &fix.config,
            &mut fix.logger,
            &Policy::SYSTEM_ADDRESS,
            &[],
        )
        .unwrap();
    assert_eq!(fix.service.epoch(), 1);
}

#[test]
fn single_rewards_are_system_only() {
    let mut fix = staking_service_fixture();

    claim_slot(&mut fix, 0, tokens(1)).unwrap();

    let governance = fix.governance;
    let result = fix.service.distribute_reward(
        &mut fix.store,
        &mut fix.token,
        &mut fix.logger,
        &governance,
        &signer_account(1),
        tokens(1),
    );
    assert_eq!(result, Err(StakingError::Unauthorized));
}

#[test]
fn rewarding_an_unknown_signer_reverts() {
    let mut fix = staking_service_fixture();

    claim_slot(&mut fix, 0, tokens(1)).unwrap();

    let result = fix.service.distribute_reward(
        &mut fix.store,
        &mut fix.token,
        &mut fix.logger,
        &Policy::SYSTEM_ADDRESS,
        &random_address(),
        tokens(1),
    );

    assert_eq!(result, Err(StakingError::NotValidator));
    assert_eq!(result.unwrap_err().to_string(), "not validator");
}

#[test]
fn checkpoint_rewards_are_consensus_issuance() {
    let mut fix = staking_service_fixture();

    claim_slot(&mut fix, 0, tokens(1)).unwrap();
    claim_slot(&mut fix, 1, tokens(1)).unwrap();

    let supply_before = fix.token.total_supply();

    run_checkpoint(&mut fix);
    assert_eq!(fix.token.total_supply(), supply_before);

    run_checkpoint(&mut fix);
    assert_eq!(fix.token.total_supply(), supply_before + tokens(2));
    assert_custody_consistent(&fix);

    assert!(fix
        .logger
        .entries()
        .contains(&Log::EpochFinalized { epoch: 1 }));
}

#[test]
fn the_lock_does_not_stop_checkpoints() {
    let mut fix = staking_service_fixture();

    claim_slot(&mut fix, 0, tokens(1)).unwrap();

    let governance = fix.governance;
    fix.service
        .lock(&fix.config, &mut fix.logger, &governance)
        .unwrap();

    run_checkpoint(&mut fix);
    assert_eq!(fix.service.epoch(), 1);

    // ...but user operations stay frozen until governance unlocks.
    assert_eq!(claim_slot(&mut fix, 1, tokens(1)), Err(StakingError::Locked));

    fix.service
        .unlock(&fix.config, &mut fix.logger, &governance)
        .unwrap();
    claim_slot(&mut fix, 1, tokens(1)).unwrap();
}

#[test]
fn slashing_burns_rewards_before_locked_stake() {
    let mut fix = staking_service_fixture();

    let slot = claim_slot(&mut fix, 0, tokens(2)).unwrap();

    fix.service
        .distribute_reward(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &Policy::SYSTEM_ADDRESS,
            &signer_account(1),
            tokens(1),
        )
        .unwrap();

    let supply_before = fix.token.total_supply();

    let penalty = fix
        .service
        .slash(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &Policy::SYSTEM_ADDRESS,
            slot,
            tokens(1) + units(50_000),
        )
        .unwrap();

    assert_eq!(penalty, tokens(1) + units(50_000));

    // The full reward burned, plus half a token of locked stake.
    let validator = fix.store.get_validator(slot).unwrap();
    assert_eq!(validator.locked, tokens(1) + units(50_000));
    assert_eq!(validator.unlocked_rewards(), Coin::ZERO);
    assert_eq!(
        fix.service.total_locked_tokens(1),
        tokens(1) + units(50_000)
    );
    assert_eq!(fix.token.total_supply(), supply_before - penalty);
    assert_custody_consistent(&fix);
}

#[test]
fn slashing_is_capped_at_the_validator_tokens() {
    let mut fix = staking_service_fixture();

    let slot = claim_slot(&mut fix, 0, tokens(1)).unwrap();

    let penalty = fix
        .service
        .slash(
            &mut fix.store,
            &mut fix.token,
            &mut fix.logger,
            &Policy::SYSTEM_ADDRESS,
            slot,
            tokens(10),
        )
        .unwrap();

    assert_eq!(penalty, tokens(1));
    let validator = fix.store.get_validator(slot).unwrap();
    assert_eq!(validator.locked, Coin::ZERO);
    assert_eq!(fix.service.total_locked_tokens(1), Coin::ZERO);
}

#[test]
fn slashing_is_system_only() {
    let mut fix = staking_service_fixture();

    let slot = claim_slot(&mut fix, 0, tokens(1)).unwrap();

    let governance = fix.governance;
    let result = fix.service.slash(
        &mut fix.store,
        &mut fix.token,
        &mut fix.logger,
        &governance,
        slot,
        tokens(1),
    );

    assert_eq!(result, Err(StakingError::Unauthorized));
}
