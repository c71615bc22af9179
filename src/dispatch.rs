//! Calldata entry point
//!
//! Routes `selector ++ abi-encoded arguments` to the operation of the contract
//! at `ctx.myself`. This is how a timelock executes the calls it has queued.

use anyhow::Result;
use ethereum_types::U256;
use tracing::debug;

use crate::abi::{self, Decoder, Param};
use crate::chain::{Contract, Context, State};
use crate::error::ContractError;
use crate::factory::ReflectionTokenFactory;
use crate::timelock::{Timelock, TokenTimelock};
use crate::token::ReflectionToken;
use crate::vault::Vault;

const VAULT_CALLS: &[&str] = &["withdraw(address,uint256)", "transferOwnership(address)"];

const TOKEN_CALLS: &[&str] = &[
    "transfer(address,uint256)",
    "approve(address,uint256)",
    "transferOwnership(address)",
    "renounceOwnership()",
    "excludeFromReward(address)",
    "includeInReward(address)",
    "excludeFromFee(address)",
    "includeInFee(address)",
    "setMaxTxAmount(uint256)",
    "setTaxFeePercent(uint256)",
    "setLiquidityFeePercent(uint256)",
    "setSwapAndLiquifyEnabled(bool)",
    "enableBotProtection()",
    "allowTransfers(address)",
];

const TIMELOCK_CALLS: &[&str] = &["setDelay(uint256)", "setPendingAdmin(address)", "acceptAdmin()"];

const TOKEN_TIMELOCK_CALLS: &[&str] = &["release()"];

const FACTORY_CALLS: &[&str] = &[
    "setFeeToken(address)",
    "setFeeAmount(uint256)",
    "setMinValue(uint256)",
    "transferOwnership(address)",
];

fn resolve(selector: &[u8], known: &[&'static str]) -> Result<&'static str> {
    known
        .iter()
        .copied()
        .find(|signature| abi::selector(signature) == selector)
        .ok_or_else(|| ContractError::UnknownCall(format!("0x{}", hex::encode(selector))).into())
}

fn success() -> Vec<u8> {
    abi::encode(&[Param::Bool(true)])
}

/// Executes `calldata` against the contract at `ctx.myself`
pub fn call(state: &mut State, ctx: &Context, calldata: &[u8]) -> Result<Vec<u8>> {
    if calldata.len() < 4 {
        return Err(ContractError::UnknownCall(format!("0x{}", hex::encode(calldata))).into());
    }
    let (selector, args) = calldata.split_at(4);
    let mut args = Decoder::new(args);

    let output = match state.contract(ctx.myself) {
        Some(Contract::Vault(_)) => match resolve(selector, VAULT_CALLS)? {
            "withdraw(address,uint256)" => {
                let (to, amount) = (args.address()?, args.uint()?);
                Vault::withdraw(state, ctx, to, amount)?;
                Vec::new()
            }
            _ => {
                Vault::transfer_ownership(state, ctx, args.address()?)?;
                Vec::new()
            }
        },
        Some(Contract::ReflectionToken(_)) => call_token(state, ctx, resolve(selector, TOKEN_CALLS)?, &mut args)?,
        Some(Contract::Timelock(_)) => {
            match resolve(selector, TIMELOCK_CALLS)? {
                "setDelay(uint256)" => Timelock::set_delay(state, ctx, args.u64()?)?,
                "setPendingAdmin(address)" => Timelock::set_pending_admin(state, ctx, args.address()?)?,
                _ => Timelock::accept_admin(state, ctx)?,
            }
            Vec::new()
        }
        Some(Contract::TokenTimelock(_)) => {
            resolve(selector, TOKEN_TIMELOCK_CALLS)?;
            let amount = TokenTimelock::release(state, ctx)?;
            abi::encode(&[amount.into()])
        }
        Some(Contract::ReflectionTokenFactory(_)) => {
            match resolve(selector, FACTORY_CALLS)? {
                "setFeeToken(address)" => ReflectionTokenFactory::set_fee_token(state, ctx, args.address()?)?,
                "setFeeAmount(uint256)" => ReflectionTokenFactory::set_fee_amount(state, ctx, args.uint()?)?,
                "setMinValue(uint256)" => ReflectionTokenFactory::set_min_value(state, ctx, args.uint()?)?,
                _ => ReflectionTokenFactory::transfer_ownership(state, ctx, args.address()?)?,
            }
            Vec::new()
        }
        Some(_) => return Err(ContractError::UnknownCall(format!("0x{}", hex::encode(selector))).into()),
        None => return Err(ContractError::NoContract(ctx.myself).into()),
    };

    debug!(target = ?ctx.myself, selector = %hex::encode(selector), "dispatched");
    Ok(output)
}

fn call_token(state: &mut State, ctx: &Context, signature: &str, args: &mut Decoder) -> Result<Vec<u8>> {
    match signature {
        "transfer(address,uint256)" => {
            let (to, amount) = (args.address()?, args.uint()?);
            ReflectionToken::transfer(state, ctx, to, amount)?;
            return Ok(success());
        }
        "approve(address,uint256)" => {
            let (spender, amount) = (args.address()?, args.uint()?);
            ReflectionToken::approve(state, ctx, spender, amount)?;
            return Ok(success());
        }
        "transferOwnership(address)" => ReflectionToken::transfer_ownership(state, ctx, args.address()?)?,
        "renounceOwnership()" => ReflectionToken::renounce_ownership(state, ctx)?,
        "excludeFromReward(address)" => ReflectionToken::exclude_from_reward(state, ctx, args.address()?)?,
        "includeInReward(address)" => ReflectionToken::include_in_reward(state, ctx, args.address()?)?,
        "excludeFromFee(address)" => ReflectionToken::exclude_from_fee(state, ctx, args.address()?)?,
        "includeInFee(address)" => ReflectionToken::include_in_fee(state, ctx, args.address()?)?,
        "setMaxTxAmount(uint256)" => ReflectionToken::set_max_tx_amount(state, ctx, args.uint()?)?,
        "setTaxFeePercent(uint256)" => ReflectionToken::set_tax_fee_percent(state, ctx, percent(args)?)?,
        "setLiquidityFeePercent(uint256)" => {
            ReflectionToken::set_liquidity_fee_percent(state, ctx, percent(args)?)?
        }
        "setSwapAndLiquifyEnabled(bool)" => ReflectionToken::set_swap_and_liquify_enabled(state, ctx, args.bool()?)?,
        "enableBotProtection()" => ReflectionToken::enable_bot_protection(state, ctx)?,
        "allowTransfers(address)" => ReflectionToken::allow_transfers(state, ctx, args.address()?)?,
        other => return Err(ContractError::UnknownCall(other.to_string()).into()),
    }
    Ok(Vec::new())
}

// Oversized percentages are rejected by the fee bound, not the decoder
fn percent(args: &mut Decoder) -> Result<u64> {
    let v = args.uint()?;
    if v > U256::from(u64::MAX) {
        return Err(ContractError::FeeTooHigh.into());
    }
    Ok(v.low_u64())
}
