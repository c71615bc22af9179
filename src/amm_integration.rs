//! AMM Integration
//!
//! A constant-product AMM living at well-known addresses on the chain:
//! - `Weth`: the wrapped native currency
//! - `PairFactory`: creates one `Pair` per token pair at a CREATE2 address
//! - `Pair`: the pool itself; its pool shares are a plain ERC-20
//! - `Router`: the entry point tokens use to add liquidity and sell
//!
//! Fee is 0.3% on swaps. The first liquidity provider receives
//! `sqrt(amount0 * amount1) - MINIMUM_LIQUIDITY` shares; the minimum is locked
//! at the zero address forever.

use anyhow::Result;
use ethereum_types::{Address, H256, U256};
use std::collections::HashMap;
use tracing::debug;

use crate::abi::{keccak256, Param};
use crate::chain::{Context, State};
use crate::constants::{BPS, MINIMUM_LIQUIDITY, SWAP_FEE_BPS, ZERO_ADDRESS};
use crate::deploy::{create2, Blueprint};
use crate::erc20::{self, ledger_approve, ledger_transfer, ledger_transfer_from, Erc20Ledger, LedgerBacked};
use crate::error::ContractError;
use crate::events::Event;

fn mul(a: U256, b: U256) -> Result<U256> {
    a.checked_mul(b).ok_or_else(|| ContractError::Overflow.into())
}

fn ensure_deadline(ctx: &Context, deadline: u64) -> Result<()> {
    if deadline < ctx.timestamp {
        return Err(ContractError::Expired.into());
    }
    Ok(())
}

/// Orders two token addresses the way pairs store them
pub fn sort_tokens(token_a: Address, token_b: Address) -> Result<(Address, Address)> {
    if token_a == token_b {
        return Err(ContractError::IdenticalAddresses.into());
    }
    let (token0, token1) = if token_a < token_b { (token_a, token_b) } else { (token_b, token_a) };
    if token0 == ZERO_ADDRESS {
        return Err(ContractError::ZeroAddress.into());
    }
    Ok((token0, token1))
}

// ---- wrapped native currency ----

#[derive(Debug, Clone, Default)]
pub struct Weth {
    ledger: Erc20Ledger,
}

impl LedgerBacked for Weth {
    fn ledger(&self) -> &Erc20Ledger {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut Erc20Ledger {
        &mut self.ledger
    }
}

impl Weth {
    /// Wraps the native value attached to the call
    pub fn deposit(state: &mut State, ctx: &Context) -> Result<()> {
        state.get_mut::<Self>(ctx.myself)?.ledger.mint(ctx.caller, ctx.value)?;
        state.emit(ctx.myself, Event::Deposit { account: ctx.caller, amount: ctx.value });
        Ok(())
    }

    pub fn withdraw(state: &mut State, ctx: &Context, amount: U256) -> Result<()> {
        state.get_mut::<Self>(ctx.myself)?.ledger.burn(ctx.caller, amount)?;
        state.transfer_native(ctx.myself, ctx.caller, amount)?;
        state.emit(ctx.myself, Event::Withdrawal { account: ctx.caller, amount });
        Ok(())
    }

    pub fn transfer(state: &mut State, ctx: &Context, to: Address, amount: U256) -> Result<()> {
        ledger_transfer::<Self>(state, ctx, to, amount)
    }

    pub fn transfer_from(state: &mut State, ctx: &Context, from: Address, to: Address, amount: U256) -> Result<()> {
        ledger_transfer_from::<Self>(state, ctx, from, to, amount)
    }

    pub fn approve(state: &mut State, ctx: &Context, spender: Address, amount: U256) -> Result<()> {
        ledger_approve::<Self>(state, ctx, spender, amount)
    }
}

// ---- pair factory ----

/// Pairs carry no constructor arguments; the tokens are set right after creation
pub struct PairBlueprint;

impl Blueprint for PairBlueprint {
    const BYTECODE: &'static [u8] = b"ConstantProductPair";

    fn constructor_args(&self) -> Vec<Param> {
        Vec::new()
    }
}

/// `keccak256(abi.encodePacked(token0, token1))`
pub fn pair_salt(token0: Address, token1: Address) -> H256 {
    let mut packed = token0.as_bytes().to_vec();
    packed.extend_from_slice(token1.as_bytes());
    keccak256(&packed)
}

#[derive(Debug, Clone, Default)]
pub struct PairFactory {
    pairs: HashMap<(Address, Address), Address>,
    all_pairs: Vec<Address>,
}

impl PairFactory {
    pub fn get_pair(&self, token_a: Address, token_b: Address) -> Option<Address> {
        self.pairs.get(&(token_a, token_b)).copied()
    }

    #[cfg(test)]
    pub fn all_pairs_length(&self) -> usize {
        self.all_pairs.len()
    }

    pub fn create_pair(state: &mut State, ctx: &Context, token_a: Address, token_b: Address) -> Result<Address> {
        let (token0, token1) = sort_tokens(token_a, token_b)?;
        if state.get::<Self>(ctx.myself)?.get_pair(token0, token1).is_some() {
            return Err(ContractError::PairExists.into());
        }

        let pair = create2(state, ctx, pair_salt(token0, token1), &PairBlueprint, |state, ctx| {
            state.install(ctx.myself, Pair::new(ctx.caller, token0, token1))
        })?;

        let factory = state.get_mut::<Self>(ctx.myself)?;
        factory.pairs.insert((token0, token1), pair);
        factory.pairs.insert((token1, token0), pair);
        factory.all_pairs.push(pair);
        state.emit(ctx.myself, Event::PairCreated { token0, token1, pair });
        debug!(?token0, ?token1, ?pair, "pair created");
        Ok(pair)
    }
}

// ---- pair ----

#[derive(Debug, Clone)]
pub struct Pair {
    factory: Address,
    token0: Address,
    token1: Address,
    reserve0: U256,
    reserve1: U256,
    ledger: Erc20Ledger,
}

impl LedgerBacked for Pair {
    fn ledger(&self) -> &Erc20Ledger {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut Erc20Ledger {
        &mut self.ledger
    }
}

impl Pair {
    pub fn new(factory: Address, token0: Address, token1: Address) -> Self {
        Self {
            factory,
            token0,
            token1,
            reserve0: U256::zero(),
            reserve1: U256::zero(),
            ledger: Erc20Ledger::default(),
        }
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn token0(&self) -> Address {
        self.token0
    }

    pub fn token1(&self) -> Address {
        self.token1
    }

    pub fn get_reserves(&self) -> (U256, U256) {
        (self.reserve0, self.reserve1)
    }

    /// Reserves ordered as (`token`, other)
    pub fn reserves_for(&self, token: Address) -> (U256, U256) {
        if token == self.token0 {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        }
    }

    pub fn transfer(state: &mut State, ctx: &Context, to: Address, amount: U256) -> Result<()> {
        ledger_transfer::<Self>(state, ctx, to, amount)
    }

    pub fn transfer_from(state: &mut State, ctx: &Context, from: Address, to: Address, amount: U256) -> Result<()> {
        ledger_transfer_from::<Self>(state, ctx, from, to, amount)
    }

    pub fn approve(state: &mut State, ctx: &Context, spender: Address, amount: U256) -> Result<()> {
        ledger_approve::<Self>(state, ctx, spender, amount)
    }

    fn balances(state: &State, pair: Address) -> Result<(U256, U256)> {
        let p = state.get::<Self>(pair)?;
        let (token0, token1) = (p.token0, p.token1);
        Ok((
            erc20::balance_of(state, token0, pair)?,
            erc20::balance_of(state, token1, pair)?,
        ))
    }

    fn update(state: &mut State, pair: Address, balance0: U256, balance1: U256) -> Result<()> {
        let p = state.get_mut::<Self>(pair)?;
        p.reserve0 = balance0;
        p.reserve1 = balance1;
        state.emit(pair, Event::Sync { reserve0: balance0, reserve1: balance1 });
        Ok(())
    }

    fn mint_shares(state: &mut State, pair: Address, to: Address, amount: U256) -> Result<()> {
        state.get_mut::<Self>(pair)?.ledger.mint(to, amount)?;
        state.emit(pair, Event::Transfer { from: ZERO_ADDRESS, to, value: amount });
        Ok(())
    }

    /// Issues pool shares to `to` for the tokens sent in since the last sync
    pub fn mint(state: &mut State, ctx: &Context, to: Address) -> Result<U256> {
        let p = state.get::<Self>(ctx.myself)?;
        let (reserve0, reserve1, supply) = (p.reserve0, p.reserve1, p.ledger.total_supply());
        let (balance0, balance1) = Self::balances(state, ctx.myself)?;
        let amount0 = balance0
            .checked_sub(reserve0)
            .ok_or(ContractError::InsufficientLiquidityMinted)?;
        let amount1 = balance1
            .checked_sub(reserve1)
            .ok_or(ContractError::InsufficientLiquidityMinted)?;

        let minimum = U256::from(MINIMUM_LIQUIDITY);
        let liquidity = if supply.is_zero() {
            let root = mul(amount0, amount1)?.integer_sqrt();
            if root <= minimum {
                return Err(ContractError::InsufficientLiquidityMinted.into());
            }
            Self::mint_shares(state, ctx.myself, ZERO_ADDRESS, minimum)?;
            root - minimum
        } else {
            (mul(amount0, supply)? / reserve0).min(mul(amount1, supply)? / reserve1)
        };
        if liquidity.is_zero() {
            return Err(ContractError::InsufficientLiquidityMinted.into());
        }

        Self::mint_shares(state, ctx.myself, to, liquidity)?;
        Self::update(state, ctx.myself, balance0, balance1)?;
        state.emit(ctx.myself, Event::Mint { sender: ctx.caller, amount0, amount1 });
        Ok(liquidity)
    }

    /// Sends out the requested amounts, then checks that the tokens sent in
    /// keep the fee-adjusted product at least at its previous value
    pub fn swap(state: &mut State, ctx: &Context, amount0_out: U256, amount1_out: U256, to: Address) -> Result<()> {
        if amount0_out.is_zero() && amount1_out.is_zero() {
            return Err(ContractError::InsufficientOutputAmount.into());
        }
        let p = state.get::<Self>(ctx.myself)?;
        let (token0, token1, reserve0, reserve1) = (p.token0, p.token1, p.reserve0, p.reserve1);
        if amount0_out >= reserve0 || amount1_out >= reserve1 {
            return Err(ContractError::InsufficientLiquidity.into());
        }

        if !amount0_out.is_zero() {
            erc20::transfer(state, ctx, token0, to, amount0_out)?;
        }
        if !amount1_out.is_zero() {
            erc20::transfer(state, ctx, token1, to, amount1_out)?;
        }

        let (balance0, balance1) = Self::balances(state, ctx.myself)?;
        let amount0_in = balance0.saturating_sub(reserve0 - amount0_out);
        let amount1_in = balance1.saturating_sub(reserve1 - amount1_out);
        if amount0_in.is_zero() && amount1_in.is_zero() {
            return Err(ContractError::InsufficientInputAmount.into());
        }

        let (bps, fee) = (U256::from(BPS), U256::from(SWAP_FEE_BPS));
        let adjusted0 = mul(balance0, bps)? - mul(amount0_in, fee)?;
        let adjusted1 = mul(balance1, bps)? - mul(amount1_in, fee)?;
        if mul(adjusted0, adjusted1)? < mul(mul(reserve0, reserve1)?, bps * bps)? {
            return Err(ContractError::ConstantProduct.into());
        }

        Self::update(state, ctx.myself, balance0, balance1)?;
        state.emit(
            ctx.myself,
            Event::Swap {
                sender: ctx.caller,
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
                to,
            },
        );
        Ok(())
    }

    /// Forces reserves to match balances
    pub fn sync(state: &mut State, ctx: &Context) -> Result<()> {
        let (balance0, balance1) = Self::balances(state, ctx.myself)?;
        Self::update(state, ctx.myself, balance0, balance1)
    }
}

// ---- router ----

#[derive(Debug, Clone)]
pub struct Router {
    factory: Address,
    weth: Address,
}

impl Router {
    pub fn new(factory: Address, weth: Address) -> Self {
        Self { factory, weth }
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn weth(&self) -> Address {
        self.weth
    }

    /// Equivalent amount of the other asset at the current reserve ratio
    pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> Result<U256> {
        if amount_a.is_zero() {
            return Err(ContractError::InsufficientInputAmount.into());
        }
        if reserve_a.is_zero() || reserve_b.is_zero() {
            return Err(ContractError::InsufficientLiquidity.into());
        }
        Ok(mul(amount_a, reserve_b)? / reserve_a)
    }

    /// Output of a swap of `amount_in` after the pool fee
    pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Result<U256> {
        if amount_in.is_zero() {
            return Err(ContractError::InsufficientInputAmount.into());
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(ContractError::InsufficientLiquidity.into());
        }
        let amount_in_with_fee = mul(amount_in, U256::from(BPS - SWAP_FEE_BPS))?;
        let numerator = mul(amount_in_with_fee, reserve_out)?;
        let denominator = mul(reserve_in, U256::from(BPS))? + amount_in_with_fee;
        Ok(numerator / denominator)
    }

    fn endpoints(state: &State, router: Address) -> Result<(Address, Address)> {
        let r = state.get::<Self>(router)?;
        Ok((r.factory, r.weth))
    }

    /// Pairs `amount_token_desired` of `token` (pulled from the caller) with
    /// the attached native value; shares go to `to`. Unused value is refunded.
    #[allow(clippy::too_many_arguments)]
    pub fn add_liquidity_eth(
        state: &mut State,
        ctx: &Context,
        token: Address,
        amount_token_desired: U256,
        amount_token_min: U256,
        amount_eth_min: U256,
        to: Address,
        deadline: u64,
    ) -> Result<(U256, U256, U256)> {
        ensure_deadline(ctx, deadline)?;
        let (factory, weth) = Self::endpoints(state, ctx.myself)?;

        let pair = match state.get::<PairFactory>(factory)?.get_pair(token, weth) {
            Some(pair) => pair,
            None => PairFactory::create_pair(state, &ctx.call_into(factory), token, weth)?,
        };
        let (reserve_token, reserve_eth) = state.get::<Pair>(pair)?.reserves_for(token);

        let (amount_token, amount_eth) = if reserve_token.is_zero() && reserve_eth.is_zero() {
            (amount_token_desired, ctx.value)
        } else {
            let eth_optimal = Self::quote(amount_token_desired, reserve_token, reserve_eth)?;
            if eth_optimal <= ctx.value {
                if eth_optimal < amount_eth_min {
                    return Err(ContractError::InsufficientOutputAmount.into());
                }
                (amount_token_desired, eth_optimal)
            } else {
                let token_optimal = Self::quote(ctx.value, reserve_eth, reserve_token)?;
                if token_optimal < amount_token_min {
                    return Err(ContractError::InsufficientOutputAmount.into());
                }
                (token_optimal, ctx.value)
            }
        };

        erc20::transfer_from(state, ctx, token, ctx.caller, pair, amount_token)?;
        let deposit = state.call_with_value(ctx, weth, amount_eth)?;
        Weth::deposit(state, &deposit)?;
        erc20::transfer(state, ctx, weth, pair, amount_eth)?;
        let liquidity = Pair::mint(state, &ctx.call_into(pair), to)?;

        if ctx.value > amount_eth {
            state.transfer_native(ctx.myself, ctx.caller, ctx.value - amount_eth)?;
        }
        debug!(?token, ?pair, %amount_token, %amount_eth, %liquidity, "liquidity added");
        Ok((amount_token, amount_eth, liquidity))
    }

    /// Sells `amount_in` of `token` for native currency paid to `to`. The
    /// output is computed from what actually reached the pair, so tokens that
    /// take a fee on transfer are supported.
    pub fn swap_exact_tokens_for_eth_supporting_fee_on_transfer_tokens(
        state: &mut State,
        ctx: &Context,
        amount_in: U256,
        amount_out_min: U256,
        token: Address,
        to: Address,
        deadline: u64,
    ) -> Result<()> {
        ensure_deadline(ctx, deadline)?;
        let (factory, weth) = Self::endpoints(state, ctx.myself)?;
        let pair = state
            .get::<PairFactory>(factory)?
            .get_pair(token, weth)
            .ok_or(ContractError::InsufficientLiquidity)?;

        erc20::transfer_from(state, ctx, token, ctx.caller, pair, amount_in)?;

        let p = state.get::<Pair>(pair)?;
        let token_is_0 = p.token0() == token;
        let (reserve_in, reserve_out) = p.reserves_for(token);
        let received = erc20::balance_of(state, token, pair)?
            .checked_sub(reserve_in)
            .ok_or(ContractError::InsufficientInputAmount)?;
        let amount_out = Self::get_amount_out(received, reserve_in, reserve_out)?;
        let (amount0_out, amount1_out) = if token_is_0 {
            (U256::zero(), amount_out)
        } else {
            (amount_out, U256::zero())
        };
        Pair::swap(state, &ctx.call_into(pair), amount0_out, amount1_out, ctx.myself)?;

        let amount_out = erc20::balance_of(state, weth, ctx.myself)?;
        if amount_out < amount_out_min {
            return Err(ContractError::InsufficientOutputAmount.into());
        }
        Weth::withdraw(state, &ctx.call_into(weth), amount_out)?;
        state.transfer_native(ctx.myself, to, amount_out)?;
        debug!(?token, %amount_in, %amount_out, "sold for native");
        Ok(())
    }
}
