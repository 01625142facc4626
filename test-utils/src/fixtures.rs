use rand::Rng;

use bor_keys::{Address, SignerPublicKey};
use bor_primitives::{coin::Coin, policy::Policy};
use bor_staking::{ChainConfig, MemoryStore, SlotRegistry, StakingLogger, StakingService};
use bor_token::TokenLedger;

/// Balance and allowance every pre-funded test account starts with
/// (100,000 tokens).
pub const FUNDED_BALANCE: Coin = Coin::from_u64_unchecked(100_000 * Coin::UNITS_PER_TOKEN);

/// A fully wired staking system, fresh per test: token ledger, slot
/// registry (already handed to the service), initialized config, logger and
/// service, with a set of pre-funded, pre-approved test accounts.
pub struct StakingServiceFixture {
    pub service: StakingService,
    pub store: MemoryStore,
    pub slots: SlotRegistry,
    pub token: TokenLedger,
    pub config: ChainConfig,
    pub logger: StakingLogger,

    pub governance: Address,
    pub validators: Vec<Address>,
    pub delegators: Vec<Address>,
}

/// The i-th deterministic test account. Index 0 is reserved (it would
/// collide with `Address::ZERO`).
pub fn test_account(index: u8) -> Address {
    assert!(index > 0, "account index 0 is reserved");
    let mut bytes = [0u8; Address::SIZE];
    bytes[0] = 0x61;
    bytes[Address::SIZE - 1] = index;
    Address(bytes)
}

/// The i-th deterministic signer address, disjoint from the test accounts.
pub fn signer_account(index: u8) -> Address {
    assert!(index > 0, "signer index 0 is reserved");
    let mut bytes = [0u8; Address::SIZE];
    bytes[0] = 0x5e;
    bytes[Address::SIZE - 1] = index;
    Address(bytes)
}

/// The public key registered alongside `signer_account(index)`.
pub fn signer_key(index: u8) -> SignerPublicKey {
    SignerPublicKey([index; SignerPublicKey::SIZE])
}

/// A throwaway address, for tests that need a wallet nobody funded.
pub fn random_address() -> Address {
    let mut bytes = [0u8; Address::SIZE];
    rand::thread_rng().fill(&mut bytes[..]);
    Address(bytes)
}

pub fn random_signer_key() -> SignerPublicKey {
    let mut bytes = [0u8; SignerPublicKey::SIZE];
    rand::thread_rng().fill(&mut bytes[..]);
    SignerPublicKey(bytes)
}

/// Builds the full deployment graph the way the deployment fixture wires
/// it: the slot registry's ownership is transferred to the service, the
/// config is initialized by governance, and every test signer is minted
/// [`FUNDED_BALANCE`] with a matching allowance towards the service.
pub fn staking_service_fixture() -> StakingServiceFixture {
    let governance = test_account(1);
    let validators: Vec<Address> = (2..=5).map(test_account).collect();
    let delegators: Vec<Address> = (6..=9).map(test_account).collect();
    let deployer = test_account(10);

    let service_address = Policy::STAKING_SERVICE_ADDRESS;
    let service = StakingService::new(service_address);
    let store = MemoryStore::new();
    let logger = StakingLogger::new();

    let mut token = TokenLedger::new(governance);

    let mut slots = SlotRegistry::new(deployer);
    slots
        .transfer_ownership(&deployer, service_address)
        .expect("deployer owns the fresh registry");

    let mut config = ChainConfig::new();
    config.initialize(governance).expect("config is fresh");

    for account in validators.iter().chain(delegators.iter()) {
        token
            .mint(&governance, account, FUNDED_BALANCE)
            .expect("minting test funds");
        token
            .increase_allowance(account, &service_address, FUNDED_BALANCE)
            .expect("fresh allowance");
    }

    StakingServiceFixture {
        service,
        store,
        slots,
        token,
        config,
        logger,
        governance,
        validators,
        delegators,
    }
}
