//! Reflection Token
//!
//! A fungible token whose transfer fee is split in two:
//! - the tax share is reflected to every holder included in rewards
//! - the liquidity share accrues on the token contract and is periodically
//!   sold and paired into the AMM pool (swap-and-liquify)
//!
//! Transfers are additionally capped by `max_tx_amount` and filtered by the
//! launch-window bot protection.

use anyhow::Result;
use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::abi::Param;
use crate::amm_integration::{PairFactory, Router};
use crate::bot_protection::BotProtection;
use crate::chain::{Context, State};
use crate::constants::{DECIMALS, MAX_FEE_PERCENT, ROUTER_ADDRESS, TOTAL_SUPPLY, ZERO_ADDRESS};
use crate::deploy::Blueprint;
use crate::erc20::ensure_not_zero;
use crate::error::{ContractError, InvalidParam};
use crate::events::Event;
use crate::indexed_set::IndexedSet;
use crate::ownable::Ownable;
use crate::reflection::{FeeSplit, ReflectionLedger};

/// Constructor arguments of a reflection token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionTokenArgs {
    pub name: String,
    pub symbol: String,
    pub max_tx_amount: U256,
    pub num_tokens_sell_to_add_to_liquidity: U256,
    pub tax_fee: u64,
    pub liquidity_fee: u64,
    pub launch_time: u64,
}

impl Blueprint for ReflectionTokenArgs {
    const BYTECODE: &'static [u8] = b"ReflectionToken";

    fn constructor_args(&self) -> Vec<Param> {
        vec![
            Param::String(self.name.clone()),
            Param::String(self.symbol.clone()),
            self.max_tx_amount.into(),
            self.num_tokens_sell_to_add_to_liquidity.into(),
            self.tax_fee.into(),
            self.liquidity_fee.into(),
            self.launch_time.into(),
        ]
    }
}

fn check_fee_percent(percent: u64) -> Result<()> {
    if percent > MAX_FEE_PERCENT {
        return Err(ContractError::FeeTooHigh.into());
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ReflectionToken {
    name: String,
    symbol: String,
    ownable: Ownable,
    initialized: bool,
    ledger: ReflectionLedger,
    allowances: HashMap<(Address, Address), U256>,
    excluded_from_fee: IndexedSet<Address>,
    tax_fee: u64,
    liquidity_fee: u64,
    max_tx_amount: U256,
    num_tokens_sell_to_add_to_liquidity: U256,
    swap_and_liquify_enabled: bool,
    in_swap_and_liquify: bool,
    router: Address,
    pair: Address,
    liquidity_timelock: Address,
    vault: Address,
    bot_protection: BotProtection,
}

impl ReflectionToken {
    /// Constructor: validates the arguments, creates the token/WETH pair and
    /// mints the whole supply to the deployer.
    pub fn deploy(state: &mut State, ctx: &Context, args: &ReflectionTokenArgs) -> Result<()> {
        if args.max_tx_amount.is_zero() {
            return Err(ContractError::ConstructorInvalid(InvalidParam::MaxTxAmount).into());
        }
        if args.tax_fee > MAX_FEE_PERCENT {
            return Err(ContractError::ConstructorInvalid(InvalidParam::TaxFee).into());
        }
        if args.liquidity_fee > MAX_FEE_PERCENT {
            return Err(ContractError::ConstructorInvalid(InvalidParam::LiquidityFee).into());
        }
        let bot_protection = BotProtection::new(args.launch_time, ctx.timestamp)?;

        let router = state.get::<Router>(ROUTER_ADDRESS)?;
        let (amm_factory, weth) = (router.factory(), router.weth());
        let pair = PairFactory::create_pair(state, &ctx.call_into(amm_factory), ctx.myself, weth)?;

        let deployer = ctx.caller;
        let mut excluded_from_fee = IndexedSet::new();
        excluded_from_fee.insert(deployer);
        excluded_from_fee.insert(ctx.myself);

        let token = Self {
            name: args.name.clone(),
            symbol: args.symbol.clone(),
            ownable: Ownable::new(deployer),
            initialized: false,
            ledger: ReflectionLedger::new(U256::from(TOTAL_SUPPLY), deployer),
            allowances: HashMap::new(),
            excluded_from_fee,
            tax_fee: args.tax_fee,
            liquidity_fee: args.liquidity_fee,
            max_tx_amount: args.max_tx_amount,
            num_tokens_sell_to_add_to_liquidity: args.num_tokens_sell_to_add_to_liquidity,
            swap_and_liquify_enabled: true,
            in_swap_and_liquify: false,
            router: ROUTER_ADDRESS,
            pair,
            liquidity_timelock: ZERO_ADDRESS,
            vault: ZERO_ADDRESS,
            bot_protection,
        };
        state.install(ctx.myself, token)?;

        state.emit(
            ctx.myself,
            Event::OwnershipTransferred { previous_owner: ZERO_ADDRESS, new_owner: deployer },
        );
        state.emit(
            ctx.myself,
            Event::Transfer { from: ZERO_ADDRESS, to: deployer, value: U256::from(TOTAL_SUPPLY) },
        );
        info!(token = ?ctx.myself, name = %args.name, symbol = %args.symbol, ?pair, "reflection token deployed");
        Ok(())
    }

    // ---- views ----

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    pub fn total_supply(&self) -> U256 {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.ledger.balance_of(account)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or_default()
    }

    pub fn owner(&self) -> Address {
        self.ownable.owner()
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn tax_fee(&self) -> u64 {
        self.tax_fee
    }

    pub fn liquidity_fee(&self) -> u64 {
        self.liquidity_fee
    }

    pub fn max_tx_amount(&self) -> U256 {
        self.max_tx_amount
    }

    pub fn num_tokens_sell_to_add_to_liquidity(&self) -> U256 {
        self.num_tokens_sell_to_add_to_liquidity
    }

    pub fn swap_and_liquify_enabled(&self) -> bool {
        self.swap_and_liquify_enabled
    }

    pub fn router(&self) -> Address {
        self.router
    }

    pub fn pair(&self) -> Address {
        self.pair
    }

    pub fn liquidity_timelock(&self) -> Address {
        self.liquidity_timelock
    }

    pub fn vault(&self) -> Address {
        self.vault
    }

    pub fn total_fees(&self) -> U256 {
        self.ledger.total_fees()
    }

    pub fn reflection_from_token(&self, amount: U256, deduct_transfer_fee: bool) -> Result<U256> {
        self.ledger
            .reflection_from_token(amount, deduct_transfer_fee, self.tax_fee, self.liquidity_fee)
    }

    pub fn token_from_reflection(&self, r_amount: U256) -> Result<U256> {
        self.ledger.token_from_reflection(r_amount)
    }

    pub fn ledger(&self) -> &ReflectionLedger {
        &self.ledger
    }

    pub fn is_excluded_from_reward(&self, account: Address) -> bool {
        self.ledger.is_excluded(account)
    }

    pub fn excluded_length(&self) -> usize {
        self.ledger.excluded().len()
    }

    pub fn excluded(&self, index: usize) -> Option<Address> {
        self.ledger.excluded().get(index)
    }

    pub fn is_excluded_from_fee(&self, account: Address) -> bool {
        self.excluded_from_fee.contains(&account)
    }

    pub fn excluded_from_fee_length(&self) -> usize {
        self.excluded_from_fee.len()
    }

    pub fn excluded_from_fee(&self, index: usize) -> Option<Address> {
        self.excluded_from_fee.get(index)
    }

    pub fn bot_protection_enabled(&self) -> bool {
        self.bot_protection.enabled()
    }

    pub fn launch_time(&self) -> u64 {
        self.bot_protection.launch_time()
    }

    pub fn transfers_blocked(&self, account: Address) -> bool {
        self.bot_protection.is_blocked(account)
    }

    pub fn blocked_length(&self) -> usize {
        self.bot_protection.blocked().len()
    }

    pub fn blocked(&self, index: usize) -> Option<Address> {
        self.bot_protection.blocked().get(index)
    }

    pub fn blocked_index(&self, account: Address) -> Option<usize> {
        self.bot_protection.blocked().index_of(&account)
    }

    // ---- ERC-20 ----

    pub fn transfer(state: &mut State, ctx: &Context, to: Address, amount: U256) -> Result<()> {
        Self::move_tokens(state, ctx, ctx.caller, to, amount)
    }

    /// Moves tokens first, then spends the allowance, so an insufficient
    /// balance is reported before an insufficient allowance
    pub fn transfer_from(state: &mut State, ctx: &Context, from: Address, to: Address, amount: U256) -> Result<()> {
        Self::move_tokens(state, ctx, from, to, amount)?;
        let allowance = state.get::<Self>(ctx.myself)?.allowance(from, ctx.caller);
        if allowance < amount {
            return Err(ContractError::InsufficientAllowance.into());
        }
        Self::set_allowance(state, ctx.myself, from, ctx.caller, allowance - amount)
    }

    pub fn approve(state: &mut State, ctx: &Context, spender: Address, amount: U256) -> Result<()> {
        Self::set_allowance(state, ctx.myself, ctx.caller, spender, amount)
    }

    pub fn increase_allowance(state: &mut State, ctx: &Context, spender: Address, added: U256) -> Result<()> {
        let current = state.get::<Self>(ctx.myself)?.allowance(ctx.caller, spender);
        let updated = current.checked_add(added).ok_or(ContractError::Overflow)?;
        Self::set_allowance(state, ctx.myself, ctx.caller, spender, updated)
    }

    pub fn decrease_allowance(state: &mut State, ctx: &Context, spender: Address, subtracted: U256) -> Result<()> {
        let current = state.get::<Self>(ctx.myself)?.allowance(ctx.caller, spender);
        if current < subtracted {
            return Err(ContractError::AllowanceUnderflow.into());
        }
        Self::set_allowance(state, ctx.myself, ctx.caller, spender, current - subtracted)
    }

    fn set_allowance(state: &mut State, token: Address, owner: Address, spender: Address, amount: U256) -> Result<()> {
        ensure_not_zero(owner)?;
        ensure_not_zero(spender)?;
        state
            .get_mut::<Self>(token)?
            .allowances
            .insert((owner, spender), amount);
        state.emit(token, Event::Approval { owner, spender, value: amount });
        Ok(())
    }

    /// Core transfer path shared by `transfer` and `transfer_from`
    fn move_tokens(state: &mut State, ctx: &Context, from: Address, to: Address, amount: U256) -> Result<()> {
        ensure_not_zero(from)?;
        ensure_not_zero(to)?;
        if amount.is_zero() {
            return Err(ContractError::AmountZero.into());
        }

        let token = state.get::<Self>(ctx.myself)?;
        token.bot_protection.ensure_not_blocked(from)?;

        let take_fee = !(token.is_excluded_from_fee(from) || token.is_excluded_from_fee(to));
        if take_fee && amount > token.max_tx_amount {
            return Err(ContractError::MaxTxExceeded.into());
        }

        let contract_balance = token.balance_of(ctx.myself).min(token.max_tx_amount);
        let threshold = token.num_tokens_sell_to_add_to_liquidity;
        let should_liquify = contract_balance >= threshold
            && !threshold.is_zero()
            && !token.in_swap_and_liquify
            && from != token.pair
            && token.swap_and_liquify_enabled
            && token.initialized;
        if should_liquify {
            Self::swap_and_liquify(state, ctx, threshold)?;
        }

        let token = state.get_mut::<Self>(ctx.myself)?;
        let split = if take_fee {
            FeeSplit::new(amount, token.tax_fee, token.liquidity_fee)?
        } else {
            FeeSplit::fee_free(amount)
        };
        let applied = token.ledger.transfer(from, to, ctx.myself, split)?;

        if to != token.pair && to != ctx.myself && token.bot_protection.record_recipient(to, ctx.timestamp) {
            debug!(token = ?ctx.myself, account = ?to, "recipient blocked until launch");
        }

        state.emit(ctx.myself, Event::Transfer { from, to, value: applied.transfer });
        Ok(())
    }

    /// Sells half of `amount` for native currency and pairs the other half
    /// with the proceeds; pool shares go to the liquidity timelock
    fn swap_and_liquify(state: &mut State, ctx: &Context, amount: U256) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.in_swap_and_liquify = true;
        let (router, liquidity_timelock) = (token.router, token.liquidity_timelock);

        let half = amount / 2;
        let other_half = amount - half;
        let initial_native = state.native_balance(ctx.myself);

        Self::set_allowance(state, ctx.myself, ctx.myself, router, half)?;
        Router::swap_exact_tokens_for_eth_supporting_fee_on_transfer_tokens(
            state,
            &ctx.call_into(router),
            half,
            U256::zero(),
            ctx.myself,
            ctx.myself,
            ctx.timestamp,
        )?;
        let received = state.native_balance(ctx.myself) - initial_native;

        Self::set_allowance(state, ctx.myself, ctx.myself, router, other_half)?;
        let call = state.call_with_value(ctx, router, received)?;
        Router::add_liquidity_eth(
            state,
            &call,
            ctx.myself,
            other_half,
            U256::zero(),
            U256::zero(),
            liquidity_timelock,
            ctx.timestamp,
        )?;

        state.get_mut::<Self>(ctx.myself)?.in_swap_and_liquify = false;
        state.emit(
            ctx.myself,
            Event::SwapAndLiquify {
                tokens_swapped: half,
                eth_received: received,
                tokens_into_liquidity: other_half,
            },
        );
        info!(token = ?ctx.myself, %half, %received, "swap and liquify");
        Ok(())
    }

    // ---- owner operations ----

    /// One-shot wiring of the liquidity timelock and the vault. The vault is
    /// excluded from fee and the pair from reward.
    pub fn initialize(state: &mut State, ctx: &Context, liquidity_timelock: Address, vault: Address) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.ownable.only_owner(ctx.caller)?;
        if token.initialized {
            return Err(ContractError::AlreadyInitialized.into());
        }
        token.initialized = true;
        token.liquidity_timelock = liquidity_timelock;
        token.vault = vault;
        token.excluded_from_fee.insert(vault);
        let pair = token.pair;
        if !token.ledger.is_excluded(pair) {
            token.ledger.exclude(pair)?;
        }
        debug!(token = ?ctx.myself, ?liquidity_timelock, ?vault, "initialized");
        Ok(())
    }

    pub fn exclude_from_reward(state: &mut State, ctx: &Context, account: Address) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.ownable.only_owner(ctx.caller)?;
        if account == token.router {
            return Err(ContractError::RouterExclusion.into());
        }
        token.ledger.exclude(account)
    }

    pub fn include_in_reward(state: &mut State, ctx: &Context, account: Address) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.ownable.only_owner(ctx.caller)?;
        token.ledger.include(account)
    }

    pub fn exclude_from_fee(state: &mut State, ctx: &Context, account: Address) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.ownable.only_owner(ctx.caller)?;
        if !token.excluded_from_fee.insert(account) {
            return Err(ContractError::AlreadyExcluded.into());
        }
        Ok(())
    }

    pub fn include_in_fee(state: &mut State, ctx: &Context, account: Address) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.ownable.only_owner(ctx.caller)?;
        if !token.excluded_from_fee.remove(&account) {
            return Err(ContractError::AlreadyIncluded.into());
        }
        Ok(())
    }

    pub fn set_max_tx_amount(state: &mut State, ctx: &Context, amount: U256) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.ownable.only_owner(ctx.caller)?;
        if amount.is_zero() {
            return Err(ContractError::AmountZero.into());
        }
        token.max_tx_amount = amount;
        Ok(())
    }

    pub fn set_tax_fee_percent(state: &mut State, ctx: &Context, percent: u64) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.ownable.only_owner(ctx.caller)?;
        check_fee_percent(percent)?;
        token.tax_fee = percent;
        Ok(())
    }

    pub fn set_liquidity_fee_percent(state: &mut State, ctx: &Context, percent: u64) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.ownable.only_owner(ctx.caller)?;
        check_fee_percent(percent)?;
        token.liquidity_fee = percent;
        Ok(())
    }

    pub fn set_swap_and_liquify_enabled(state: &mut State, ctx: &Context, enabled: bool) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.ownable.only_owner(ctx.caller)?;
        token.swap_and_liquify_enabled = enabled;
        state.emit(ctx.myself, Event::SwapAndLiquifyEnabledUpdated { enabled });
        Ok(())
    }

    /// Turns the launch-window filter on. Calling it again has no effect.
    pub fn enable_bot_protection(state: &mut State, ctx: &Context) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.ownable.only_owner(ctx.caller)?;
        if token.bot_protection.enable() {
            state.emit(ctx.myself, Event::BotProtectionEnabled);
            info!(token = ?ctx.myself, "bot protection enabled");
        }
        Ok(())
    }

    pub fn allow_transfers(state: &mut State, ctx: &Context, account: Address) -> Result<()> {
        let token = state.get_mut::<Self>(ctx.myself)?;
        token.ownable.only_owner(ctx.caller)?;
        if token.bot_protection.allow(account, ctx.timestamp)? {
            state.emit(ctx.myself, Event::TransfersAllowed { account });
        }
        Ok(())
    }

    /// The caller gives up `amount` tokens to every holder included in rewards
    pub fn deliver(state: &mut State, ctx: &Context, amount: U256) -> Result<()> {
        state.get_mut::<Self>(ctx.myself)?.ledger.deliver(ctx.caller, amount)
    }

    pub fn transfer_ownership(state: &mut State, ctx: &Context, new_owner: Address) -> Result<()> {
        let event = state
            .get_mut::<Self>(ctx.myself)?
            .ownable
            .transfer_ownership(ctx.caller, new_owner)?;
        state.emit(ctx.myself, event);
        Ok(())
    }

    pub fn renounce_ownership(state: &mut State, ctx: &Context) -> Result<()> {
        let event = state
            .get_mut::<Self>(ctx.myself)?
            .ownable
            .renounce_ownership(ctx.caller)?;
        state.emit(ctx.myself, event);
        Ok(())
    }
}
