use serde::Deserialize;

use bor_keys::{Address, SignerPublicKey};
use bor_primitives::{coin::Coin, policy::Policy};
use bor_staking::{
    ChainConfig, MemoryStore, SlotRegistry, StakingError, StakingLogger, StakingService,
};
use bor_token::TokenLedger;

use crate::fixtures::StakingServiceFixture;

/// Description of an initial staking system state. A genesis file names
/// the governance address, funded accounts and the initial validator set,
/// and `build` turns it into a wired system.
///
/// ```toml
/// governance = "0x9cd82948650d902d95d52ea2ec91eae6deb0c9fe"
/// checkpoint_reward = 100000
///
/// [[accounts]]
/// address = "0x8c551fabc6e6e00c609c3f0313257ad7e835643c"
/// balance = 10000000000
///
/// [[validators]]
/// owner = "0x83fa05dbe31f85e719f4c4fd67ebdba2e444d9f8"
/// signer = "0x5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e01"
/// signer_key = "0x0101…"
/// stake = 100000
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct GenesisConfig {
    pub governance: Address,
    pub checkpoint_reward: Option<Coin>,
    pub withdrawal_delay: Option<u32>,
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
    #[serde(default)]
    pub validators: Vec<GenesisValidator>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenesisAccount {
    pub address: Address,
    pub balance: Coin,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenesisValidator {
    pub owner: Address,
    pub signer: Address,
    pub signer_key: SignerPublicKey,
    pub stake: Coin,
}

impl GenesisConfig {
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Builds a wired system from this description. Genesis validators are
    /// claimed at epoch 0, so they are active — and start accruing
    /// rewards — from epoch 1.
    pub fn build(&self) -> Result<StakingServiceFixture, StakingError> {
        let service_address = Policy::STAKING_SERVICE_ADDRESS;

        let mut service = StakingService::new(service_address);
        let mut store = MemoryStore::new();
        let mut logger = StakingLogger::new();
        let mut token = TokenLedger::new(self.governance);

        let mut slots = SlotRegistry::new(self.governance);
        slots.transfer_ownership(&self.governance, service_address)?;

        let mut config = ChainConfig::new();
        config.initialize(self.governance)?;

        if let Some(reward) = self.checkpoint_reward {
            config.set_checkpoint_reward(&mut logger, &self.governance, reward)?;
        }
        if let Some(delay) = self.withdrawal_delay {
            config.set_withdrawal_delay(&mut logger, &self.governance, delay)?;
        }

        for account in &self.accounts {
            token.mint(&self.governance, &account.address, account.balance)?;
            token.increase_allowance(&account.address, &service_address, account.balance)?;
        }

        for validator in &self.validators {
            token.mint(&self.governance, &validator.owner, validator.stake)?;
            token.increase_allowance(&validator.owner, &service_address, validator.stake)?;

            service.claim_validator_slot(
                &mut store,
                &mut slots,
                &mut token,
                &config,
                &mut logger,
                &validator.owner,
                validator.signer,
                validator.signer_key,
                validator.stake,
            )?;
        }

        Ok(StakingServiceFixture {
            service,
            store,
            slots,
            token,
            config,
            logger,
            governance: self.governance,
            validators: self.validators.iter().map(|v| v.owner).collect(),
            delegators: self.accounts.iter().map(|a| a.address).collect(),
        })
    }
}
