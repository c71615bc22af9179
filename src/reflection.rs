//! Reflection Accounting
//!
//! Holder balances are stored in one of two representations:
//! - `Reflected(r)`: the default. The token balance is `r / rate`, so when the
//!   rate falls every reflected holder's balance grows proportionally.
//! - `True(t)`: for accounts excluded from rewards. The balance is `t` and is
//!   untouched by fee redistribution.
//!
//! The ledger keeps two aggregates that every mutation updates in lockstep
//! with the individual holdings:
//! - `r_included`: the sum of all reflected holdings
//! - `t_excluded`: the sum of all true holdings
//!
//! and defines `rate = r_included / (t_total - t_excluded)`. Reflected balances
//! therefore always add up to `t_total - t_excluded` (up to per-holder floor
//! rounding), and `t_total` is conserved by construction. A transfer fee is
//! redistributed simply by not crediting it to anyone: the debit removes its
//! reflected share from `r_included` (or adds its true amount to the included
//! side when the sender is excluded) and the rate moves accordingly.

use anyhow::Result;
use ethereum_types::{Address, U256};
use std::collections::HashMap;

use crate::error::ContractError;
use crate::indexed_set::IndexedSet;

/// Per-account balance representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holding {
    Reflected(U256),
    True(U256),
}

impl Default for Holding {
    fn default() -> Self {
        Holding::Reflected(U256::zero())
    }
}

/// How a transferred amount is divided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    /// Amount leaving the sender
    pub amount: U256,
    /// Redistributed to reflected holders
    pub fee: U256,
    /// Credited to the liquidity sink
    pub liquidity: U256,
    /// Amount reaching the recipient
    pub transfer: U256,
}

impl FeeSplit {
    /// Percentages are whole percent, rounded down
    pub fn new(amount: U256, tax_percent: u64, liquidity_percent: u64) -> Result<Self> {
        let fee = percent_of(amount, tax_percent)?;
        let liquidity = percent_of(amount, liquidity_percent)?;
        let transfer = amount
            .checked_sub(fee)
            .and_then(|rest| rest.checked_sub(liquidity))
            .ok_or(ContractError::FeeTooHigh)?;
        Ok(Self {
            amount,
            fee,
            liquidity,
            transfer,
        })
    }

    pub fn fee_free(amount: U256) -> Self {
        Self {
            amount,
            fee: U256::zero(),
            liquidity: U256::zero(),
            transfer: amount,
        }
    }
}

fn mul(a: U256, b: U256) -> Result<U256> {
    a.checked_mul(b).ok_or_else(|| ContractError::Overflow.into())
}

// floor(amount * percent / 100) without forming the full product
fn percent_of(amount: U256, percent: u64) -> Result<U256> {
    let (hundred, percent) = (U256::from(100), U256::from(percent));
    let whole = mul(amount / hundred, percent)?;
    let part = mul(amount % hundred, percent)? / hundred;
    add(whole, part)
}

fn add(a: U256, b: U256) -> Result<U256> {
    a.checked_add(b).ok_or_else(|| ContractError::Overflow.into())
}

#[derive(Debug, Clone)]
pub struct ReflectionLedger {
    t_total: U256,
    base_rate: U256,
    r_included: U256,
    t_excluded: U256,
    t_fee_total: U256,
    holdings: HashMap<Address, Holding>,
    excluded: IndexedSet<Address>,
}

impl ReflectionLedger {
    /// Mints the whole supply to `holder`
    pub fn new(t_total: U256, holder: Address) -> Self {
        // largest multiple of t_total that fits, so the initial rate is exact
        let r_total = U256::MAX - (U256::MAX % t_total);
        let mut holdings = HashMap::new();
        holdings.insert(holder, Holding::Reflected(r_total));
        Self {
            t_total,
            base_rate: r_total / t_total,
            r_included: r_total,
            t_excluded: U256::zero(),
            t_fee_total: U256::zero(),
            holdings,
            excluded: IndexedSet::new(),
        }
    }

    pub fn total_supply(&self) -> U256 {
        self.t_total
    }

    pub fn total_fees(&self) -> U256 {
        self.t_fee_total
    }

    /// Current reflected units per token
    pub fn rate(&self) -> U256 {
        let t_included = self.t_total - self.t_excluded;
        if t_included.is_zero() || self.r_included < t_included {
            return self.base_rate;
        }
        self.r_included / t_included
    }

    pub fn holding(&self, account: Address) -> Holding {
        self.holdings.get(&account).copied().unwrap_or_default()
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        match self.holding(account) {
            Holding::True(t) => t,
            Holding::Reflected(r) => r / self.rate(),
        }
    }

    pub fn is_excluded(&self, account: Address) -> bool {
        self.excluded.contains(&account)
    }

    pub fn excluded(&self) -> &IndexedSet<Address> {
        &self.excluded
    }

    /// Moves `split.amount` out of `from`, `split.transfer` into `to` and
    /// `split.liquidity` into `sink`; `split.fee` is redistributed.
    ///
    /// If no reflected holder would remain to receive the fee, it is credited
    /// to `sink` together with the liquidity share. Returns the split applied.
    pub fn transfer(&mut self, from: Address, to: Address, sink: Address, split: FeeSplit) -> Result<FeeSplit> {
        if split.amount > self.balance_of(from) {
            return Err(ContractError::InsufficientBalance.into());
        }
        let rate = self.rate();
        let mut split = split;

        if !split.fee.is_zero() && self.reflected_after(from, to, sink, &split, rate)?.is_zero() {
            split.liquidity += split.fee;
            split.fee = U256::zero();
        }

        self.debit(from, split.amount, rate)?;
        self.credit(to, split.transfer, rate)?;
        self.credit(sink, split.liquidity, rate)?;
        self.t_fee_total += split.fee;
        Ok(split)
    }

    // r_included once the transfer is applied, before any fee reflection
    fn reflected_after(&self, from: Address, to: Address, sink: Address, split: &FeeSplit, rate: U256) -> Result<U256> {
        let mut r = self.r_included;
        if let Holding::Reflected(_) = self.holding(from) {
            r = r.saturating_sub(mul(split.amount, rate)?);
        }
        if let Holding::Reflected(_) = self.holding(to) {
            r = add(r, mul(split.transfer, rate)?)?;
        }
        if let Holding::Reflected(_) = self.holding(sink) {
            r = add(r, mul(split.liquidity, rate)?)?;
        }
        Ok(r)
    }

    fn debit(&mut self, account: Address, amount: U256, rate: U256) -> Result<()> {
        let updated = match self.holding(account) {
            Holding::Reflected(r) => {
                if amount > r / rate {
                    return Err(ContractError::InsufficientBalance.into());
                }
                let r_amount = mul(amount, rate)?;
                self.r_included -= r_amount;
                Holding::Reflected(r - r_amount)
            }
            Holding::True(t) => {
                if amount > t {
                    return Err(ContractError::InsufficientBalance.into());
                }
                self.t_excluded -= amount;
                Holding::True(t - amount)
            }
        };
        self.holdings.insert(account, updated);
        Ok(())
    }

    fn credit(&mut self, account: Address, amount: U256, rate: U256) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let updated = match self.holding(account) {
            Holding::Reflected(r) => {
                let r_amount = mul(amount, rate)?;
                self.r_included = add(self.r_included, r_amount)?;
                Holding::Reflected(add(r, r_amount)?)
            }
            Holding::True(t) => {
                self.t_excluded = add(self.t_excluded, amount)?;
                Holding::True(add(t, amount)?)
            }
        };
        self.holdings.insert(account, updated);
        Ok(())
    }

    /// Gives up `amount` of `account`'s tokens to all reflected holders
    pub fn deliver(&mut self, account: Address, amount: U256) -> Result<()> {
        if self.is_excluded(account) {
            return Err(ContractError::ExcludedAccount.into());
        }
        let rate = self.rate();
        self.debit(account, amount, rate)?;
        self.t_fee_total += amount;
        Ok(())
    }

    /// Switches `account` to a true balance worth exactly its current balance
    pub fn exclude(&mut self, account: Address) -> Result<()> {
        if self.is_excluded(account) {
            return Err(ContractError::AlreadyExcluded.into());
        }
        let rate = self.rate();
        let Holding::Reflected(r) = self.holding(account) else {
            return Err(ContractError::AlreadyExcluded.into());
        };
        let t = r / rate;
        self.r_included -= r;
        self.t_excluded += t;
        self.holdings.insert(account, Holding::True(t));
        self.excluded.insert(account);
        Ok(())
    }

    /// Switches `account` back to a reflected balance at the current rate
    pub fn include(&mut self, account: Address) -> Result<()> {
        if !self.is_excluded(account) {
            return Err(ContractError::AlreadyIncluded.into());
        }
        let rate = self.rate();
        let Holding::True(t) = self.holding(account) else {
            return Err(ContractError::AlreadyIncluded.into());
        };
        let r = mul(t, rate)?;
        self.t_excluded -= t;
        self.r_included += r;
        self.holdings.insert(account, Holding::Reflected(r));
        self.excluded.remove(&account);
        Ok(())
    }

    /// Reflected units corresponding to `amount` tokens at the current rate,
    /// optionally after the transfer fees are taken
    pub fn reflection_from_token(
        &self,
        amount: U256,
        deduct_transfer_fee: bool,
        tax_percent: u64,
        liquidity_percent: u64,
    ) -> Result<U256> {
        if amount > self.t_total {
            return Err(ContractError::AmountExceedsSupply.into());
        }
        let tokens = if deduct_transfer_fee {
            FeeSplit::new(amount, tax_percent, liquidity_percent)?.transfer
        } else {
            amount
        };
        mul(tokens, self.rate())
    }

    pub fn token_from_reflection(&self, r_amount: U256) -> Result<U256> {
        if r_amount > self.r_included {
            return Err(ContractError::AmountExceedsReflections.into());
        }
        Ok(r_amount / self.rate())
    }

    /// Sum of every holder's balance as reported by `balance_of`
    #[cfg(test)]
    pub fn sum_of_balances(&self) -> U256 {
        self.holdings
            .keys()
            .fold(U256::zero(), |acc, account| acc + self.balance_of(*account))
    }
}
