pub mod fixtures;
pub mod genesis;

pub use self::{
    fixtures::{
        random_address, random_signer_key, signer_account, signer_key, staking_service_fixture,
        test_account, StakingServiceFixture, FUNDED_BALANCE,
    },
    genesis::{GenesisAccount, GenesisConfig, GenesisValidator},
};
