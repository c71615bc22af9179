//! Test suite for the reflection token factory
//!
//! Tests cover:
//! - ABI encoding and deterministic addressing
//! - Reflection accounting and supply conservation
//! - Token transfers, fees, exclusions and bot protection
//! - Timelocks, token timelocks and vaults
//! - The CREATE2 deployers and the launch factory
//! - AMM pool creation, liquidity and swaps
//! - Atomic reverts and access control

pub mod deployer_tests;
pub mod timelock_tests;

use anyhow::Result;
use ethereum_types::{Address, U256};
use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

use crate::chain::Chain;
use crate::constants::{DEAD_ADDRESS, ONE_DAY, ROUTER_ADDRESS};
use crate::deployers::{TimelockFactory, TokenTimelockFactory, VaultFactory};
use crate::error::{contract_error, ContractError};
use crate::factory::{FactoryConfig, ReflectionTokenFactory, TokenDeployment, TokenLaunchParams};
use crate::token::{ReflectionToken, ReflectionTokenArgs};

pub const GENESIS: u64 = 1_700_000_000;
pub const LIQUIDITY_LOCK: u64 = 15_724_800;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING);
}

pub fn account(n: u64) -> Address {
    Address::from_low_u64_be(0x1000 + n)
}

pub fn owner() -> Address {
    account(1)
}

pub fn alice() -> Address {
    account(2)
}

pub fn bob() -> Address {
    account(3)
}

pub fn carol() -> Address {
    account(4)
}

/// `n * 10^6 * 10^9` base units, the way launch amounts are quoted
pub fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::exp10(15)
}

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

/// A chain at `GENESIS` with funded test accounts
pub fn setup() -> Chain {
    init_tracing();
    let mut chain = Chain::new(GENESIS);
    for who in [owner(), alice(), bob(), carol()] {
        chain.fund(who, ether(1_000));
    }
    chain
}

pub fn token_args(launch_time: u64) -> ReflectionTokenArgs {
    ReflectionTokenArgs {
        name: "Token".to_string(),
        symbol: "TOKEN".to_string(),
        max_tx_amount: tokens(5_000_000),
        num_tokens_sell_to_add_to_liquidity: tokens(500_000),
        tax_fee: 5,
        liquidity_fee: 5,
        launch_time,
    }
}

pub fn deploy_token(chain: &mut Chain, deployer: Address, args: ReflectionTokenArgs) -> Result<Address> {
    chain.deploy(deployer, U256::zero(), move |state, ctx| ReflectionToken::deploy(state, ctx, &args))
}

/// Token deployed by `owner()` with launch one day ahead
pub fn default_token(chain: &mut Chain) -> Address {
    deploy_token(chain, owner(), token_args(GENESIS + ONE_DAY)).unwrap()
}

pub fn token(chain: &Chain, address: Address) -> &ReflectionToken {
    chain.state().get::<ReflectionToken>(address).unwrap()
}

pub fn transfer(chain: &mut Chain, token: Address, from: Address, to: Address, amount: U256) -> Result<()> {
    chain.transact(from, token, U256::zero(), |state, ctx| ReflectionToken::transfer(state, ctx, to, amount))
}

pub fn approve(chain: &mut Chain, token: Address, owner: Address, spender: Address, amount: U256) -> Result<()> {
    chain.transact(owner, token, U256::zero(), |state, ctx| ReflectionToken::approve(state, ctx, spender, amount))
}

/// The `ContractError` a failed call ended with
pub fn error_of<T: std::fmt::Debug>(result: Result<T>) -> ContractError {
    let err = result.expect_err("call should fail");
    contract_error(&err)
        .cloned()
        .unwrap_or_else(|| panic!("not a contract error: {err:#}"))
}

pub struct FactoryFixture {
    pub chain: Chain,
    pub fee_token: Address,
    pub token_timelock_factory: Address,
    pub timelock_factory: Address,
    pub vault_factory: Address,
    pub factory: Address,
}

pub fn fee_amount() -> U256 {
    U256::exp10(19)
}

/// Sub-factories, a fee token and the launch factory, all deployed by
/// `owner()`; `alice()` holds and has approved twice the fee
pub fn factory_fixture() -> FactoryFixture {
    let mut chain = setup();
    let token_timelock_factory = chain
        .deploy(owner(), U256::zero(), TokenTimelockFactory::deploy)
        .unwrap();
    let timelock_factory = chain.deploy(owner(), U256::zero(), TimelockFactory::deploy).unwrap();
    let vault_factory = chain.deploy(owner(), U256::zero(), VaultFactory::deploy).unwrap();
    let fee_token = default_token(&mut chain);

    let config = FactoryConfig {
        token_timelock_factory,
        timelock_factory,
        vault_factory,
        router: ROUTER_ADDRESS,
        burn_address: DEAD_ADDRESS,
        fee_token,
        fee_amount: fee_amount(),
        min_value: ether(10),
    };
    let factory = chain
        .deploy(owner(), U256::zero(), move |state, ctx| ReflectionTokenFactory::deploy(state, ctx, config))
        .unwrap();

    let allowance = fee_amount() * 2;
    transfer(&mut chain, fee_token, owner(), alice(), allowance).unwrap();
    approve(&mut chain, fee_token, alice(), factory, allowance).unwrap();

    FactoryFixture {
        chain,
        fee_token,
        token_timelock_factory,
        timelock_factory,
        vault_factory,
        factory,
    }
}

pub fn launch_params(launch_time: u64) -> TokenLaunchParams {
    TokenLaunchParams {
        token: token_args(launch_time),
        timelock_delay: ONE_DAY,
        liquidity_timelock_delay: LIQUIDITY_LOCK,
        liquidity_amount: tokens(100_000_000),
        burn_amount: U256::zero(),
    }
}

impl FactoryFixture {
    pub fn create_token(&mut self, sender: Address, params: &TokenLaunchParams, value: U256) -> Result<TokenDeployment> {
        self.chain.transact(sender, self.factory, value, |state, ctx| {
            ReflectionTokenFactory::create_token(state, ctx, params)
        })
    }
}
