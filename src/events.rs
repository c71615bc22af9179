//! Event log entries emitted by the contracts

use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    // fungible tokens
    Transfer { from: Address, to: Address, value: U256 },
    Approval { owner: Address, spender: Address, value: U256 },
    OwnershipTransferred { previous_owner: Address, new_owner: Address },

    // reflection token
    SwapAndLiquify { tokens_swapped: U256, eth_received: U256, tokens_into_liquidity: U256 },
    SwapAndLiquifyEnabledUpdated { enabled: bool },
    BotProtectionEnabled,
    TransfersAllowed { account: Address },

    // factories
    CreateToken { token: Address, owner: Address },
    CreateTimelock { timelock: Address },
    CreateTokenTimelock { token_timelock: Address },
    CreateVault { vault: Address },
    SetFeeToken { fee_token: Address },
    SetFeeAmount { fee_amount: U256 },
    SetMinValue { min_value: U256 },

    // timelocks and vault
    NewAdmin { admin: Address },
    NewPendingAdmin { pending_admin: Address },
    NewDelay { delay: u64 },
    QueueTransaction { tx_hash: H256, target: Address, value: U256, signature: String, data: Vec<u8>, eta: u64 },
    CancelTransaction { tx_hash: H256, target: Address, value: U256, signature: String, data: Vec<u8>, eta: u64 },
    ExecuteTransaction { tx_hash: H256, target: Address, value: U256, signature: String, data: Vec<u8>, eta: u64 },
    TokensReleased { beneficiary: Address, amount: U256 },
    Withdraw { to: Address, amount: U256 },

    // AMM
    PairCreated { token0: Address, token1: Address, pair: Address },
    Mint { sender: Address, amount0: U256, amount1: U256 },
    Swap { sender: Address, amount0_in: U256, amount1_in: U256, amount0_out: U256, amount1_out: U256, to: Address },
    Sync { reserve0: U256, reserve1: U256 },
    Deposit { account: Address, amount: U256 },
    Withdrawal { account: Address, amount: U256 },
}

/// An event together with the contract that emitted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub emitter: Address,
    pub event: Event,
}
