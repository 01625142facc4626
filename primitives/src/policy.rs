use bor_keys::Address;

use crate::coin::Coin;

/// A discrete accounting period. Epoch counting starts at 0; a checkpoint
/// finalizes the current epoch and advances to the next one.
pub type Epoch = u32;

/// Global protocol constants for the staking service.
pub struct Policy {}

impl Policy {
    /// The reserved sender used by the consensus layer itself. Calls that
    /// originate from block production (single-validator rewards, slashes)
    /// must carry this address, and it may always mint staking tokens.
    /// Corresponds to '0xffffffffffffffffffffffffffffffffffffFffE'.
    pub const SYSTEM_ADDRESS: Address = Address([
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xfe,
    ]);

    /// The ledger account the staking service holds stake and accrued
    /// rewards on. Corresponds to '0x0000000000000000000000000000000000001001'.
    pub const STAKING_SERVICE_ADDRESS: Address = Address([
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x10, 0x01,
    ]);

    /// The minimum stake necessary to claim a validator slot, in units
    /// (1 token = 100,000 units).
    pub const VALIDATOR_DEPOSIT: u64 = 100_000;

    /// Number of validator slots that can ever be active at the same time.
    pub const MAX_VALIDATOR_SLOTS: u16 = 128;

    /// The reward shared out per checkpoint before governance overrides it,
    /// in units.
    pub const CHECKPOINT_REWARD: u64 = 100_000;

    /// Epochs between unstaking and the stake becoming withdrawable. An
    /// exiting validator may still be owed rewards for the epoch it left,
    /// so its tokens stay locked well past the exit.
    pub const WITHDRAWAL_DELAY_EPOCHS: Epoch = 80;

    /// The default minimum stake, as a `Coin`.
    pub fn validator_deposit() -> Coin {
        Coin::from_u64_unchecked(Policy::VALIDATOR_DEPOSIT)
    }

    /// The default checkpoint reward, as a `Coin`.
    pub fn checkpoint_reward() -> Coin {
        Coin::from_u64_unchecked(Policy::CHECKPOINT_REWARD)
    }

    /// The first epoch in which a stake movement made during `epoch` is
    /// effective. Stake never changes the epoch it was moved in.
    pub fn first_effective_epoch(epoch: Epoch) -> Epoch {
        epoch + 1
    }
}
