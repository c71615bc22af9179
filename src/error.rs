//! Named contract failures
//!
//! Every operation returns `anyhow::Result`; the failures a caller is expected
//! to react to are `ContractError` values so they can be recovered with
//! `err.downcast_ref::<ContractError>()`.

use ethereum_types::Address;
use thiserror::Error;

/// Which constructor argument was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidParam {
    MaxTxAmount,
    TaxFee,
    LiquidityFee,
    LaunchTime,
    ReleaseTime,
    Delay,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    // constructor validation
    #[error("invalid constructor argument: {0:?}")]
    ConstructorInvalid(InvalidParam),

    // authorization
    #[error("Ownable: caller is not the owner")]
    NotOwner,
    #[error("Ownable: new owner is the zero address")]
    ZeroOwner,
    #[error("Timelock: call must come from admin")]
    NotAdmin,
    #[error("Timelock: call must come from pending admin")]
    NotPendingAdmin,
    #[error("Timelock: call must come from timelock")]
    NotTimelock,

    // state machine
    #[error("Initializable: contract is already initialized")]
    AlreadyInitialized,
    #[error("Timelock: estimated execution block must satisfy delay")]
    InsufficientDelay,
    #[error("Timelock: transaction hasn't been queued")]
    NotQueued,
    #[error("Timelock: transaction is already queued")]
    AlreadyQueued,
    #[error("Timelock: transaction was already executed or cancelled")]
    TransactionFinalized,
    #[error("transaction hasn't surpassed time lock")]
    TooEarly,
    #[error("Timelock: delay must be between the minimum and maximum delay")]
    DelayOutOfRange,
    #[error("Timelock: transaction is stale")]
    StaleTransaction,
    #[error("TokenTimelock: no tokens to release")]
    NothingToRelease,
    #[error("BotProtection: before launch")]
    BeforeLaunch,

    // set membership
    #[error("Account is already included")]
    AlreadyIncluded,
    #[error("Account is already excluded")]
    AlreadyExcluded,
    #[error("Excluded addresses cannot call this function")]
    ExcludedAccount,
    #[error("We can not exclude the router")]
    RouterExclusion,

    // economic guards
    #[error("Amount must be greater than 0")]
    AmountZero,
    #[error("Amount must be less than or equal to 15")]
    FeeTooHigh,
    #[error("Transfer amount exceeds the maxTxAmount")]
    MaxTxExceeded,
    #[error("BotProtection: transfers blocked")]
    TransfersBlocked,
    #[error("ERC20: transfer amount exceeds balance")]
    InsufficientBalance,
    #[error("ERC20: transfer amount exceeds allowance")]
    InsufficientAllowance,
    #[error("ERC20: decreased allowance below zero")]
    AllowanceUnderflow,
    #[error("ERC20: zero address")]
    ZeroAddress,
    #[error("Amount must be less than supply")]
    AmountExceedsSupply,
    #[error("Amount must be less than total reflections")]
    AmountExceedsReflections,
    #[error("insufficient native balance")]
    InsufficientValue,
    #[error("ReflectionTokenFactory: liquidityTimelockDelay must be at least 6 months")]
    LiquidityLockTooShort,
    #[error("ReflectionTokenFactory: liquidityAmount must be positive")]
    LiquidityAmountZero,
    #[error("ReflectionTokenFactory: value must be at least minValue")]
    ValueBelowMinimum,

    // platform
    #[error("contract already deployed at {0:?}")]
    AddressOccupied(Address),
    #[error("no contract of the expected kind at {0:?}")]
    NoContract(Address),
    #[error("call to {0:?} is not supported")]
    UnknownCall(String),
    #[error("arithmetic overflow")]
    Overflow,

    // AMM
    #[error("AMM: identical addresses")]
    IdenticalAddresses,
    #[error("AMM: pair exists")]
    PairExists,
    #[error("AMM: insufficient liquidity minted")]
    InsufficientLiquidityMinted,
    #[error("AMM: insufficient liquidity")]
    InsufficientLiquidity,
    #[error("AMM: insufficient input amount")]
    InsufficientInputAmount,
    #[error("AMM: insufficient output amount")]
    InsufficientOutputAmount,
    #[error("AMM: K")]
    ConstantProduct,
    #[error("AMM: expired")]
    Expired,
}

/// Extracts the contract error from an `anyhow` chain
pub fn contract_error(err: &anyhow::Error) -> Option<&ContractError> {
    err.downcast_ref::<ContractError>()
}
