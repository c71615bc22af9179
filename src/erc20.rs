//! Fungible-token calls across contract kinds
//!
//! Contracts that move someone else's tokens (vault, token timelock, router,
//! pair, factory) go through these functions, which dispatch on the kind of
//! contract deployed at the token address. `Erc20Ledger` is the plain balance
//! book behind the wrapped native token and the pair's pool shares.

use anyhow::Result;
use ethereum_types::{Address, U256};
use std::collections::HashMap;

use crate::amm_integration::{Pair, Weth};
use crate::chain::{Contract, ContractKind, Context, State};
use crate::constants::ZERO_ADDRESS;
use crate::error::ContractError;
use crate::events::Event;
use crate::token::ReflectionToken;

pub fn balance_of(state: &State, token: Address, account: Address) -> Result<U256> {
    match state.contract(token) {
        Some(Contract::ReflectionToken(t)) => Ok(t.balance_of(account)),
        Some(Contract::Weth(t)) => Ok(t.ledger().balance_of(account)),
        Some(Contract::Pair(t)) => Ok(t.ledger().balance_of(account)),
        _ => Err(ContractError::NoContract(token).into()),
    }
}

pub fn total_supply(state: &State, token: Address) -> Result<U256> {
    match state.contract(token) {
        Some(Contract::ReflectionToken(t)) => Ok(t.total_supply()),
        Some(Contract::Weth(t)) => Ok(t.ledger().total_supply()),
        Some(Contract::Pair(t)) => Ok(t.ledger().total_supply()),
        _ => Err(ContractError::NoContract(token).into()),
    }
}

/// `token.transfer(to, amount)` sent by `ctx.myself`
pub fn transfer(state: &mut State, ctx: &Context, token: Address, to: Address, amount: U256) -> Result<()> {
    let call = ctx.call_into(token);
    match state.contract(token) {
        Some(Contract::ReflectionToken(_)) => ReflectionToken::transfer(state, &call, to, amount),
        Some(Contract::Weth(_)) => Weth::transfer(state, &call, to, amount),
        Some(Contract::Pair(_)) => Pair::transfer(state, &call, to, amount),
        _ => Err(ContractError::NoContract(token).into()),
    }
}

/// `token.transferFrom(from, to, amount)` sent by `ctx.myself`
pub fn transfer_from(
    state: &mut State,
    ctx: &Context,
    token: Address,
    from: Address,
    to: Address,
    amount: U256,
) -> Result<()> {
    let call = ctx.call_into(token);
    match state.contract(token) {
        Some(Contract::ReflectionToken(_)) => ReflectionToken::transfer_from(state, &call, from, to, amount),
        Some(Contract::Weth(_)) => Weth::transfer_from(state, &call, from, to, amount),
        Some(Contract::Pair(_)) => Pair::transfer_from(state, &call, from, to, amount),
        _ => Err(ContractError::NoContract(token).into()),
    }
}

/// `token.approve(spender, amount)` sent by `ctx.myself`
pub fn approve(state: &mut State, ctx: &Context, token: Address, spender: Address, amount: U256) -> Result<()> {
    let call = ctx.call_into(token);
    match state.contract(token) {
        Some(Contract::ReflectionToken(_)) => ReflectionToken::approve(state, &call, spender, amount),
        Some(Contract::Weth(_)) => Weth::approve(state, &call, spender, amount),
        Some(Contract::Pair(_)) => Pair::approve(state, &call, spender, amount),
        _ => Err(ContractError::NoContract(token).into()),
    }
}

/// Balances, allowances and supply of a plain fungible token
#[derive(Debug, Clone, Default)]
pub struct Erc20Ledger {
    total_supply: U256,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl Erc20Ledger {
    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or_default()
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((owner, spender), amount);
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(ContractError::InsufficientBalance.into());
        }
        self.balances.insert(from, from_balance - amount);
        let to_balance = self.balance_of(to);
        self.balances.insert(to, to_balance + amount);
        Ok(())
    }

    /// Lowers the allowance of `spender` over `owner`'s tokens
    pub fn spend_allowance(&mut self, owner: Address, spender: Address, amount: U256) -> Result<()> {
        let allowance = self.allowance(owner, spender);
        if allowance < amount {
            return Err(ContractError::InsufficientAllowance.into());
        }
        if allowance != U256::MAX {
            self.allowances.insert((owner, spender), allowance - amount);
        }
        Ok(())
    }

    pub fn mint(&mut self, to: Address, amount: U256) -> Result<()> {
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(ContractError::Overflow)?;
        let balance = self.balance_of(to);
        self.balances.insert(to, balance + amount);
        Ok(())
    }

    pub fn burn(&mut self, from: Address, amount: U256) -> Result<()> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(ContractError::InsufficientBalance.into());
        }
        self.balances.insert(from, balance - amount);
        self.total_supply -= amount;
        Ok(())
    }
}

/// A contract whose token surface is a plain `Erc20Ledger`
pub trait LedgerBacked: ContractKind {
    fn ledger(&self) -> &Erc20Ledger;
    fn ledger_mut(&mut self) -> &mut Erc20Ledger;
}

/// `transfer` for a ledger-backed contract at `ctx.myself`
pub(crate) fn ledger_transfer<T: LedgerBacked>(state: &mut State, ctx: &Context, to: Address, amount: U256) -> Result<()> {
    ensure_not_zero(to)?;
    state.get_mut::<T>(ctx.myself)?.ledger_mut().transfer(ctx.caller, to, amount)?;
    state.emit(ctx.myself, Event::Transfer { from: ctx.caller, to, value: amount });
    Ok(())
}

pub(crate) fn ledger_transfer_from<T: LedgerBacked>(
    state: &mut State,
    ctx: &Context,
    from: Address,
    to: Address,
    amount: U256,
) -> Result<()> {
    ensure_not_zero(to)?;
    let ledger = state.get_mut::<T>(ctx.myself)?.ledger_mut();
    ledger.spend_allowance(from, ctx.caller, amount)?;
    ledger.transfer(from, to, amount)?;
    state.emit(ctx.myself, Event::Transfer { from, to, value: amount });
    Ok(())
}

pub(crate) fn ledger_approve<T: LedgerBacked>(state: &mut State, ctx: &Context, spender: Address, amount: U256) -> Result<()> {
    ensure_not_zero(spender)?;
    state.get_mut::<T>(ctx.myself)?.ledger_mut().approve(ctx.caller, spender, amount);
    state.emit(ctx.myself, Event::Approval { owner: ctx.caller, spender, value: amount });
    Ok(())
}

pub(crate) fn ensure_not_zero(account: Address) -> Result<()> {
    if account == ZERO_ADDRESS {
        return Err(ContractError::ZeroAddress.into());
    }
    Ok(())
}
