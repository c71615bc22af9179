//! Timelocks
//!
//! - `Timelock`: an admin queues calls with an `eta` at least `delay` in the
//!   future; each queued call can run once between `eta` and
//!   `eta + GRACE_PERIOD`, or be cancelled. Executed and cancelled calls are
//!   terminal.
//! - `TokenTimelock`: holds one token for one beneficiary until `release_time`.

use anyhow::Result;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::abi::{self, keccak256, Param};
use crate::chain::{Context, State};
use crate::constants::{GRACE_PERIOD, MAXIMUM_DELAY, MINIMUM_DELAY, ZERO_ADDRESS};
use crate::deploy::Blueprint;
use crate::dispatch;
use crate::erc20;
use crate::error::{ContractError, InvalidParam};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockArgs {
    pub admin: Address,
    pub delay: u64,
}

impl Blueprint for TimelockArgs {
    const BYTECODE: &'static [u8] = b"Timelock";

    fn constructor_args(&self) -> Vec<Param> {
        vec![self.admin.into(), self.delay.into()]
    }
}

/// A call as it is queued, cancelled and executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedCall {
    pub target: Address,
    pub value: U256,
    /// Function signature such as `withdraw(address,uint256)`; empty when
    /// `data` already starts with a selector
    pub signature: String,
    pub data: Vec<u8>,
    pub eta: u64,
}

impl QueuedCall {
    /// `keccak256(abi.encode(target, value, signature, data, eta))`
    pub fn hash(&self) -> H256 {
        keccak256(&abi::encode(&[
            self.target.into(),
            self.value.into(),
            Param::String(self.signature.clone()),
            Param::Bytes(self.data.clone()),
            self.eta.into(),
        ]))
    }

    pub fn calldata(&self) -> Vec<u8> {
        if self.signature.is_empty() {
            return self.data.clone();
        }
        let mut calldata = abi::selector(&self.signature).to_vec();
        calldata.extend_from_slice(&self.data);
        calldata
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Queued,
    Executed,
    Cancelled,
}

fn check_delay(delay: u64) -> bool {
    (MINIMUM_DELAY..=MAXIMUM_DELAY).contains(&delay)
}

#[derive(Debug, Clone)]
pub struct Timelock {
    admin: Address,
    pending_admin: Address,
    delay: u64,
    transactions: HashMap<H256, TxStatus>,
}

impl Timelock {
    pub fn deploy(state: &mut State, ctx: &Context, args: &TimelockArgs) -> Result<()> {
        if !check_delay(args.delay) {
            return Err(ContractError::ConstructorInvalid(InvalidParam::Delay).into());
        }
        state.install(
            ctx.myself,
            Self {
                admin: args.admin,
                pending_admin: ZERO_ADDRESS,
                delay: args.delay,
                transactions: HashMap::new(),
            },
        )
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn pending_admin(&self) -> Address {
        self.pending_admin
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn status(&self, tx_hash: H256) -> Option<TxStatus> {
        self.transactions.get(&tx_hash).copied()
    }

    pub fn queued_transactions(&self, tx_hash: H256) -> bool {
        self.status(tx_hash) == Some(TxStatus::Queued)
    }

    fn only_admin(&self, caller: Address) -> Result<()> {
        if caller != self.admin {
            return Err(ContractError::NotAdmin.into());
        }
        Ok(())
    }

    fn only_self(ctx: &Context) -> Result<()> {
        if ctx.caller != ctx.myself {
            return Err(ContractError::NotTimelock.into());
        }
        Ok(())
    }

    pub fn queue_transaction(state: &mut State, ctx: &Context, call: &QueuedCall) -> Result<H256> {
        let timelock = state.get_mut::<Self>(ctx.myself)?;
        timelock.only_admin(ctx.caller)?;
        if call.eta < ctx.timestamp.saturating_add(timelock.delay) {
            return Err(ContractError::InsufficientDelay.into());
        }

        let tx_hash = call.hash();
        match timelock.status(tx_hash) {
            Some(TxStatus::Queued) => return Err(ContractError::AlreadyQueued.into()),
            Some(_) => return Err(ContractError::TransactionFinalized.into()),
            None => {}
        }
        timelock.transactions.insert(tx_hash, TxStatus::Queued);

        state.emit(ctx.myself, Self::event(call, tx_hash, EventKind::Queue));
        info!(timelock = ?ctx.myself, ?tx_hash, target = ?call.target, signature = %call.signature, eta = call.eta, "queued");
        Ok(tx_hash)
    }

    pub fn cancel_transaction(state: &mut State, ctx: &Context, call: &QueuedCall) -> Result<()> {
        let timelock = state.get_mut::<Self>(ctx.myself)?;
        timelock.only_admin(ctx.caller)?;
        let tx_hash = call.hash();
        if !timelock.queued_transactions(tx_hash) {
            return Err(ContractError::NotQueued.into());
        }
        timelock.transactions.insert(tx_hash, TxStatus::Cancelled);
        state.emit(ctx.myself, Self::event(call, tx_hash, EventKind::Cancel));
        Ok(())
    }

    /// Runs a queued call against its target and returns the call output
    pub fn execute_transaction(state: &mut State, ctx: &Context, call: &QueuedCall) -> Result<Vec<u8>> {
        let timelock = state.get_mut::<Self>(ctx.myself)?;
        timelock.only_admin(ctx.caller)?;
        let tx_hash = call.hash();
        if !timelock.queued_transactions(tx_hash) {
            return Err(ContractError::NotQueued.into());
        }
        if ctx.timestamp < call.eta {
            return Err(ContractError::TooEarly.into());
        }
        if ctx.timestamp > call.eta.saturating_add(GRACE_PERIOD) {
            return Err(ContractError::StaleTransaction.into());
        }
        timelock.transactions.insert(tx_hash, TxStatus::Executed);

        let frame = state.call_with_value(ctx, call.target, call.value)?;
        let output = dispatch::call(state, &frame, &call.calldata())?;

        state.emit(ctx.myself, Self::event(call, tx_hash, EventKind::Execute));
        info!(timelock = ?ctx.myself, ?tx_hash, calldata = %hex::encode(call.calldata()), "executed");
        Ok(output)
    }

    /// Only through a queued call to the timelock itself
    pub fn set_delay(state: &mut State, ctx: &Context, delay: u64) -> Result<()> {
        Self::only_self(ctx)?;
        if !check_delay(delay) {
            return Err(ContractError::DelayOutOfRange.into());
        }
        state.get_mut::<Self>(ctx.myself)?.delay = delay;
        state.emit(ctx.myself, Event::NewDelay { delay });
        Ok(())
    }

    /// Only through a queued call to the timelock itself
    pub fn set_pending_admin(state: &mut State, ctx: &Context, pending_admin: Address) -> Result<()> {
        Self::only_self(ctx)?;
        state.get_mut::<Self>(ctx.myself)?.pending_admin = pending_admin;
        state.emit(ctx.myself, Event::NewPendingAdmin { pending_admin });
        Ok(())
    }

    pub fn accept_admin(state: &mut State, ctx: &Context) -> Result<()> {
        let timelock = state.get_mut::<Self>(ctx.myself)?;
        if ctx.caller != timelock.pending_admin {
            return Err(ContractError::NotPendingAdmin.into());
        }
        timelock.admin = ctx.caller;
        timelock.pending_admin = ZERO_ADDRESS;
        state.emit(ctx.myself, Event::NewAdmin { admin: ctx.caller });
        Ok(())
    }

    fn event(call: &QueuedCall, tx_hash: H256, kind: EventKind) -> Event {
        let (target, value, signature, data, eta) =
            (call.target, call.value, call.signature.clone(), call.data.clone(), call.eta);
        match kind {
            EventKind::Queue => Event::QueueTransaction { tx_hash, target, value, signature, data, eta },
            EventKind::Cancel => Event::CancelTransaction { tx_hash, target, value, signature, data, eta },
            EventKind::Execute => Event::ExecuteTransaction { tx_hash, target, value, signature, data, eta },
        }
    }
}

enum EventKind {
    Queue,
    Cancel,
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTimelockArgs {
    pub token: Address,
    pub beneficiary: Address,
    pub release_time: u64,
}

impl Blueprint for TokenTimelockArgs {
    const BYTECODE: &'static [u8] = b"TokenTimelock";

    fn constructor_args(&self) -> Vec<Param> {
        vec![self.token.into(), self.beneficiary.into(), self.release_time.into()]
    }
}

#[derive(Debug, Clone)]
pub struct TokenTimelock {
    token: Address,
    beneficiary: Address,
    release_time: u64,
}

impl TokenTimelock {
    pub fn deploy(state: &mut State, ctx: &Context, args: &TokenTimelockArgs) -> Result<()> {
        if args.release_time <= ctx.timestamp {
            return Err(ContractError::ConstructorInvalid(InvalidParam::ReleaseTime).into());
        }
        state.install(
            ctx.myself,
            Self {
                token: args.token,
                beneficiary: args.beneficiary,
                release_time: args.release_time,
            },
        )
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn beneficiary(&self) -> Address {
        self.beneficiary
    }

    pub fn release_time(&self) -> u64 {
        self.release_time
    }

    /// Sends the whole held balance to the beneficiary. Anyone may call it
    /// once the release time is reached; an empty lock fails.
    pub fn release(state: &mut State, ctx: &Context) -> Result<U256> {
        let lock = state.get::<Self>(ctx.myself)?;
        let (token, beneficiary) = (lock.token, lock.beneficiary);
        if ctx.timestamp < lock.release_time {
            return Err(ContractError::TooEarly.into());
        }
        let amount = erc20::balance_of(state, token, ctx.myself)?;
        if amount.is_zero() {
            return Err(ContractError::NothingToRelease.into());
        }
        erc20::transfer(state, ctx, token, beneficiary, amount)?;
        state.emit(ctx.myself, Event::TokensReleased { beneficiary, amount });
        info!(lock = ?ctx.myself, ?beneficiary, %amount, "tokens released");
        Ok(amount)
    }
}
