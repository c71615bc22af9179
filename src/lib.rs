//! Reflection Token Factory System
//!
//! Fee-funded launches of reflection tokens on an in-memory EVM-style chain.
//!
//! This system provides:
//! - A reflection token: transfer fees are redistributed to holders through a
//!   global rate, with transaction caps, fee/reward exclusions and a
//!   launch-window bot filter
//! - Deterministic CREATE2 deployers for token timelocks, admin timelocks and
//!   vaults, with addresses bit-compatible with the EVM
//! - A launch factory that burns a fee, seeds an AMM pool, locks liquidity and
//!   ownership behind timelocks and funds a vault, all in one atomic call
//! - A constant-product AMM (wrapped native token, pair factory, pair, router)
//!
//! Every top-level call runs through [`chain::Chain`], which reverts all state
//! changes, events included, when the call fails.

pub mod abi;
pub mod amm_integration;
pub mod bot_protection;
pub mod chain;
pub mod constants;
pub mod deploy;
pub mod deployers;
pub mod dispatch;
pub mod erc20;
pub mod error;
pub mod events;
pub mod factory;
pub mod indexed_set;
pub mod ownable;
pub mod reflection;
pub mod timelock;
pub mod token;
pub mod vault;
#[cfg(test)]
pub mod tests;

pub use chain::{Chain, Context, State};
pub use deployers::{TimelockFactory, TokenTimelockFactory, VaultFactory};
pub use error::{contract_error, ContractError, InvalidParam};
pub use events::{Event, LogEntry};
pub use factory::{FactoryConfig, ReflectionTokenFactory, TokenDeployment, TokenLaunchParams};
pub use timelock::{QueuedCall, Timelock, TokenTimelock};
pub use token::{ReflectionToken, ReflectionTokenArgs};
pub use vault::Vault;
