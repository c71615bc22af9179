//! Reflection Token Factory Contract
//!
//! Launches reflection tokens in one atomic call. For a fee paid in
//! `fee_token` (burned), `create_token`:
//! - deploys the token at a CREATE2 address salted with the caller
//! - pairs `liquidity_amount` tokens with the attached value in the AMM and
//!   locks the pool shares in a token timelock for the caller
//! - burns `burn_amount` tokens and parks the rest of the supply in a vault
//! - puts both the vault and the token under admin timelocks run by the caller
//! - turns on bot protection when the launch time is still ahead

use anyhow::{anyhow, Result};
use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::amm_integration::Router;
use crate::chain::{Context, State};
use crate::constants::{MIN_LIQUIDITY_LOCK, ZERO_ADDRESS};
use crate::deploy::{create2, salt_for};
use crate::deployers::{TimelockFactory, TokenTimelockFactory, VaultFactory};
use crate::erc20;
use crate::error::ContractError;
use crate::events::Event;
use crate::ownable::Ownable;
use crate::token::{ReflectionToken, ReflectionTokenArgs};
use crate::vault::Vault;

/// Factory wiring and fee policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConfig {
    pub token_timelock_factory: Address,
    pub timelock_factory: Address,
    pub vault_factory: Address,
    pub router: Address,
    pub burn_address: Address,
    pub fee_token: Address,
    pub fee_amount: U256,
    pub min_value: U256,
}

impl FactoryConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| anyhow!("Failed to parse factory config: {}", e))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| anyhow!("Failed to serialize factory config: {}", e))
    }
}

/// Token launch parameters provided by users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLaunchParams {
    pub token: ReflectionTokenArgs,
    /// Delay of the admin timelocks put over the token and the vault
    pub timelock_delay: u64,
    /// How long the pool shares stay locked
    pub liquidity_timelock_delay: u64,
    pub liquidity_amount: U256,
    pub burn_amount: U256,
}

/// Everything `create_token` put on chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDeployment {
    pub token: Address,
    pub pair: Address,
    pub liquidity_timelock: Address,
    pub vault: Address,
    pub vault_timelock: Address,
    pub token_timelock: Address,
    pub liquidity: U256,
    pub bot_protection: bool,
}

impl TokenDeployment {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| anyhow!("Failed to serialize token deployment: {}", e))
    }
}

#[derive(Debug, Clone)]
pub struct ReflectionTokenFactory {
    ownable: Ownable,
    config: FactoryConfig,
}

impl ReflectionTokenFactory {
    /// The deployer becomes the owner
    pub fn deploy(state: &mut State, ctx: &Context, config: FactoryConfig) -> Result<()> {
        state.install(
            ctx.myself,
            Self {
                ownable: Ownable::new(ctx.caller),
                config,
            },
        )?;
        state.emit(
            ctx.myself,
            Event::OwnershipTransferred { previous_owner: ZERO_ADDRESS, new_owner: ctx.caller },
        );
        Ok(())
    }

    pub fn owner(&self) -> Address {
        self.ownable.owner()
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn fee_token(&self) -> Address {
        self.config.fee_token
    }

    pub fn fee_amount(&self) -> U256 {
        self.config.fee_amount
    }

    pub fn min_value(&self) -> U256 {
        self.config.min_value
    }

    pub fn burn_address(&self) -> Address {
        self.config.burn_address
    }

    pub fn set_fee_token(state: &mut State, ctx: &Context, fee_token: Address) -> Result<()> {
        let factory = state.get_mut::<Self>(ctx.myself)?;
        factory.ownable.only_owner(ctx.caller)?;
        factory.config.fee_token = fee_token;
        state.emit(ctx.myself, Event::SetFeeToken { fee_token });
        Ok(())
    }

    pub fn set_fee_amount(state: &mut State, ctx: &Context, fee_amount: U256) -> Result<()> {
        let factory = state.get_mut::<Self>(ctx.myself)?;
        factory.ownable.only_owner(ctx.caller)?;
        factory.config.fee_amount = fee_amount;
        state.emit(ctx.myself, Event::SetFeeAmount { fee_amount });
        Ok(())
    }

    pub fn set_min_value(state: &mut State, ctx: &Context, min_value: U256) -> Result<()> {
        let factory = state.get_mut::<Self>(ctx.myself)?;
        factory.ownable.only_owner(ctx.caller)?;
        factory.config.min_value = min_value;
        state.emit(ctx.myself, Event::SetMinValue { min_value });
        Ok(())
    }

    pub fn transfer_ownership(state: &mut State, ctx: &Context, new_owner: Address) -> Result<()> {
        let event = state
            .get_mut::<Self>(ctx.myself)?
            .ownable
            .transfer_ownership(ctx.caller, new_owner)?;
        state.emit(ctx.myself, event);
        Ok(())
    }

    /// Launches a token; the attached value becomes the pool's native side
    pub fn create_token(state: &mut State, ctx: &Context, params: &TokenLaunchParams) -> Result<TokenDeployment> {
        let config = state.get::<Self>(ctx.myself)?.config.clone();
        info!(creator = ?ctx.caller, name = %params.token.name, "creating reflection token");

        Self::collect_fee(state, ctx, &config)?;
        Self::validate_launch_params(ctx, &config, params)?;

        let token = create2(state, ctx, salt_for(ctx.caller), &params.token, |state, ctx| {
            ReflectionToken::deploy(state, ctx, &params.token)
        })?;
        let token_ctx = ctx.call_into(token);
        let pair = state.get::<ReflectionToken>(token)?.pair();
        let release_time = ctx
            .timestamp
            .checked_add(params.liquidity_timelock_delay)
            .ok_or(ContractError::Overflow)?;

        let liquidity_timelock = TokenTimelockFactory::create_token_timelock(
            state,
            &ctx.call_into(config.token_timelock_factory),
            pair,
            ctx.caller,
            release_time,
        )?;
        let vault = VaultFactory::create_vault(state, &ctx.call_into(config.vault_factory), token)?;
        ReflectionToken::initialize(state, &token_ctx, liquidity_timelock, vault)?;

        let liquidity = Self::seed_liquidity(state, ctx, &config, token, params, liquidity_timelock)?;

        if !params.burn_amount.is_zero() {
            ReflectionToken::transfer(state, &token_ctx, config.burn_address, params.burn_amount)?;
        }
        let remaining = erc20::balance_of(state, token, ctx.myself)?;
        if !remaining.is_zero() {
            ReflectionToken::transfer(state, &token_ctx, vault, remaining)?;
        }

        let vault_timelock = TimelockFactory::create_timelock(
            state,
            &ctx.call_into(config.timelock_factory),
            vault,
            ctx.caller,
            params.timelock_delay,
        )?;
        Vault::transfer_ownership(state, &ctx.call_into(vault), vault_timelock)?;

        let bot_protection = params.token.launch_time > ctx.timestamp;
        if bot_protection {
            ReflectionToken::enable_bot_protection(state, &token_ctx)?;
        }

        let token_timelock = TimelockFactory::create_timelock(
            state,
            &ctx.call_into(config.timelock_factory),
            token,
            ctx.caller,
            params.timelock_delay,
        )?;
        ReflectionToken::transfer_ownership(state, &token_ctx, token_timelock)?;

        state.emit(ctx.myself, Event::CreateToken { token, owner: ctx.caller });
        info!(?token, ?pair, ?vault, %liquidity, bot_protection, "reflection token launched");

        Ok(TokenDeployment {
            token,
            pair,
            liquidity_timelock,
            vault,
            vault_timelock,
            token_timelock,
            liquidity,
            bot_protection,
        })
    }

    /// Burns the creation fee out of the caller's `fee_token` balance
    fn collect_fee(state: &mut State, ctx: &Context, config: &FactoryConfig) -> Result<()> {
        erc20::transfer_from(
            state,
            ctx,
            config.fee_token,
            ctx.caller,
            config.burn_address,
            config.fee_amount,
        )
    }

    fn validate_launch_params(ctx: &Context, config: &FactoryConfig, params: &TokenLaunchParams) -> Result<()> {
        if params.liquidity_timelock_delay < MIN_LIQUIDITY_LOCK {
            return Err(ContractError::LiquidityLockTooShort.into());
        }
        if params.liquidity_amount.is_zero() {
            return Err(ContractError::LiquidityAmountZero.into());
        }
        if ctx.value < config.min_value {
            return Err(ContractError::ValueBelowMinimum.into());
        }
        Ok(())
    }

    /// Pairs `liquidity_amount` tokens with the attached value; pool shares
    /// go to `liquidity_timelock`
    fn seed_liquidity(
        state: &mut State,
        ctx: &Context,
        config: &FactoryConfig,
        token: Address,
        params: &TokenLaunchParams,
        liquidity_timelock: Address,
    ) -> Result<U256> {
        erc20::approve(state, ctx, token, config.router, params.liquidity_amount)?;
        let call = state.call_with_value(ctx, config.router, ctx.value)?;
        let (_, _, liquidity) = Router::add_liquidity_eth(
            state,
            &call,
            token,
            params.liquidity_amount,
            params.liquidity_amount,
            ctx.value,
            liquidity_timelock,
            ctx.timestamp,
        )?;
        Ok(liquidity)
    }
}
