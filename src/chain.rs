//! In-memory execution environment
//!
//! `State` holds every deployed contract, the native-currency ledger, account
//! nonces, the clock and the event log. `Chain` wraps it and gives each
//! top-level call all-or-nothing semantics: the state is snapshotted before the
//! call and restored if the call fails anywhere, including inside nested calls.

use anyhow::Result;
use ethereum_types::{Address, U256};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::amm_integration::{Pair, PairFactory, Router, Weth};
use crate::constants::{AMM_FACTORY_ADDRESS, ROUTER_ADDRESS, WETH_ADDRESS};
use crate::deploy::create_address;
use crate::deployers::{TimelockFactory, TokenTimelockFactory, VaultFactory};
use crate::error::ContractError;
use crate::events::{Event, LogEntry};
use crate::factory::ReflectionTokenFactory;
use crate::timelock::{Timelock, TokenTimelock};
use crate::token::ReflectionToken;
use crate::vault::Vault;

/// Call frame handed to every contract operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Immediate caller (`msg.sender`)
    pub caller: Address,
    /// The contract being executed (`address(this)`)
    pub myself: Address,
    /// Native currency attached to the call (`msg.value`)
    pub value: U256,
    pub timestamp: u64,
}

impl Context {
    /// Frame for a nested call without value from the current contract
    pub fn call_into(&self, target: Address) -> Context {
        Context {
            caller: self.myself,
            myself: target,
            value: U256::zero(),
            timestamp: self.timestamp,
        }
    }

    /// Frame for the constructor of a contract created by the current one
    pub fn deploy_into(&self, address: Address) -> Context {
        self.call_into(address)
    }
}

/// Every contract kind the environment can host
#[derive(Debug, Clone)]
pub enum Contract {
    ReflectionToken(ReflectionToken),
    TokenTimelock(TokenTimelock),
    Timelock(Timelock),
    Vault(Vault),
    TokenTimelockFactory(TokenTimelockFactory),
    TimelockFactory(TimelockFactory),
    VaultFactory(VaultFactory),
    ReflectionTokenFactory(ReflectionTokenFactory),
    Weth(Weth),
    PairFactory(PairFactory),
    Pair(Pair),
    Router(Router),
}

/// Typed access to one `Contract` variant
pub trait ContractKind: Sized {
    fn from_contract(contract: &Contract) -> Option<&Self>;
    fn from_contract_mut(contract: &mut Contract) -> Option<&mut Self>;
    fn into_contract(self) -> Contract;
}

macro_rules! contract_kind {
    ($variant:ident) => {
        impl ContractKind for $variant {
            fn from_contract(contract: &Contract) -> Option<&Self> {
                match contract {
                    Contract::$variant(c) => Some(c),
                    _ => None,
                }
            }

            fn from_contract_mut(contract: &mut Contract) -> Option<&mut Self> {
                match contract {
                    Contract::$variant(c) => Some(c),
                    _ => None,
                }
            }

            fn into_contract(self) -> Contract {
                Contract::$variant(self)
            }
        }
    };
}

contract_kind!(ReflectionToken);
contract_kind!(TokenTimelock);
contract_kind!(Timelock);
contract_kind!(Vault);
contract_kind!(TokenTimelockFactory);
contract_kind!(TimelockFactory);
contract_kind!(VaultFactory);
contract_kind!(ReflectionTokenFactory);
contract_kind!(Weth);
contract_kind!(PairFactory);
contract_kind!(Pair);
contract_kind!(Router);

#[derive(Debug, Clone, Default)]
pub struct State {
    timestamp: u64,
    contracts: HashMap<Address, Contract>,
    native: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    events: Vec<LogEntry>,
}

impl State {
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn has_code(&self, address: Address) -> bool {
        self.contracts.contains_key(&address)
    }

    pub fn contract(&self, address: Address) -> Option<&Contract> {
        self.contracts.get(&address)
    }

    pub fn get<T: ContractKind>(&self, address: Address) -> Result<&T> {
        self.contracts
            .get(&address)
            .and_then(T::from_contract)
            .ok_or_else(|| ContractError::NoContract(address).into())
    }

    pub fn get_mut<T: ContractKind>(&mut self, address: Address) -> Result<&mut T> {
        self.contracts
            .get_mut(&address)
            .and_then(T::from_contract_mut)
            .ok_or_else(|| ContractError::NoContract(address).into())
    }

    /// Places a freshly constructed contract at `address`
    pub fn install<T: ContractKind>(&mut self, address: Address, contract: T) -> Result<()> {
        if self.contracts.contains_key(&address) {
            return Err(ContractError::AddressOccupied(address).into());
        }
        self.contracts.insert(address, contract.into_contract());
        Ok(())
    }

    pub fn native_balance(&self, account: Address) -> U256 {
        self.native.get(&account).copied().unwrap_or_default()
    }

    pub fn transfer_native(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let from_balance = self.native_balance(from);
        if from_balance < amount {
            return Err(ContractError::InsufficientValue.into());
        }
        self.native.insert(from, from_balance - amount);
        let to_balance = self.native_balance(to);
        self.native.insert(to, to_balance + amount);
        Ok(())
    }

    /// Frame for a nested call carrying `value` from the current contract
    pub fn call_with_value(&mut self, ctx: &Context, target: Address, value: U256) -> Result<Context> {
        self.transfer_native(ctx.myself, target, value)?;
        Ok(Context {
            value,
            ..ctx.call_into(target)
        })
    }

    fn next_nonce(&mut self, account: Address) -> u64 {
        let nonce = self.nonces.entry(account).or_insert(0);
        let current = *nonce;
        *nonce += 1;
        current
    }

    pub fn emit(&mut self, emitter: Address, event: Event) {
        self.events.push(LogEntry { emitter, event });
    }

    pub fn events(&self) -> &[LogEntry] {
        &self.events
    }
}

/// The simulated chain: a `State` plus transactional entry points
#[derive(Debug, Clone)]
pub struct Chain {
    state: State,
}

impl Chain {
    /// Creates a chain whose AMM (wrapped native token, pair factory and
    /// router) is already deployed at its well-known addresses
    pub fn new(genesis_timestamp: u64) -> Self {
        let mut state = State {
            timestamp: genesis_timestamp,
            ..State::default()
        };
        state
            .contracts
            .insert(WETH_ADDRESS, Weth::default().into_contract());
        state
            .contracts
            .insert(AMM_FACTORY_ADDRESS, PairFactory::default().into_contract());
        state.contracts.insert(
            ROUTER_ADDRESS,
            Router::new(AMM_FACTORY_ADDRESS, WETH_ADDRESS).into_contract(),
        );
        Self { state }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn timestamp(&self) -> u64 {
        self.state.timestamp
    }

    pub fn increase_time(&mut self, seconds: u64) {
        self.state.timestamp += seconds;
    }

    /// Credits native currency to an account
    pub fn fund(&mut self, account: Address, amount: U256) {
        let balance = self.state.native_balance(account);
        self.state.native.insert(account, balance + amount);
    }

    pub fn events(&self) -> &[LogEntry] {
        self.state.events()
    }

    pub fn events_from(&self, emitter: Address) -> Vec<&Event> {
        self.state
            .events()
            .iter()
            .filter(|entry| entry.emitter == emitter)
            .map(|entry| &entry.event)
            .collect()
    }

    /// Runs one top-level call from `sender` to `target`, reverting every
    /// state change if it fails
    pub fn transact<T, F>(&mut self, sender: Address, target: Address, value: U256, op: F) -> Result<T>
    where
        F: FnOnce(&mut State, &Context) -> Result<T>,
    {
        let ctx = Context {
            caller: sender,
            myself: target,
            value,
            timestamp: self.state.timestamp,
        };
        self.atomically(|state| {
            state.next_nonce(sender);
            state.transfer_native(sender, target, value)?;
            op(state, &ctx)
        })
    }

    /// Deploys a contract from an externally-owned account at its CREATE address
    pub fn deploy<F>(&mut self, sender: Address, value: U256, construct: F) -> Result<Address>
    where
        F: FnOnce(&mut State, &Context) -> Result<()>,
    {
        let timestamp = self.state.timestamp;
        self.atomically(|state| {
            let address = create_address(sender, state.next_nonce(sender));
            let ctx = Context {
                caller: sender,
                myself: address,
                value,
                timestamp,
            };
            state.transfer_native(sender, address, value)?;
            construct(state, &ctx)?;
            if !state.has_code(address) {
                return Err(ContractError::NoContract(address).into());
            }
            debug!(?sender, ?address, "deployed");
            Ok(address)
        })
    }

    fn atomically<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut State) -> Result<T>,
    {
        let snapshot = self.state.clone();
        match op(&mut self.state) {
            Ok(out) => Ok(out),
            Err(err) => {
                warn!(error = %err, "call reverted");
                self.state = snapshot;
                Err(err)
            }
        }
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new(0)
    }
}
