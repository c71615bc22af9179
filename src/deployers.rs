//! Deterministic deployers
//!
//! Each factory deploys one contract kind with CREATE2, salting with the
//! hash of the address the new contract is about (the locked token, the
//! governed contract, the vaulted token). Repeating a creation with the same
//! key and arguments lands on an occupied address and fails.

use anyhow::Result;
use ethereum_types::Address;
use tracing::debug;

use crate::chain::{Context, State};
use crate::deploy::{create2, salt_for};
use crate::events::Event;
use crate::timelock::{Timelock, TimelockArgs, TokenTimelock, TokenTimelockArgs};
use crate::vault::{Vault, VaultArgs};

#[derive(Debug, Clone, Default)]
pub struct TokenTimelockFactory;

impl TokenTimelockFactory {
    pub fn deploy(state: &mut State, ctx: &Context) -> Result<()> {
        state.install(ctx.myself, Self)
    }

    pub fn create_token_timelock(
        state: &mut State,
        ctx: &Context,
        token: Address,
        beneficiary: Address,
        release_time: u64,
    ) -> Result<Address> {
        let args = TokenTimelockArgs { token, beneficiary, release_time };
        let token_timelock = create2(state, ctx, salt_for(token), &args, |state, ctx| {
            TokenTimelock::deploy(state, ctx, &args)
        })?;
        state.emit(ctx.myself, Event::CreateTokenTimelock { token_timelock });
        debug!(?token, ?beneficiary, release_time, ?token_timelock, "token timelock created");
        Ok(token_timelock)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimelockFactory;

impl TimelockFactory {
    pub fn deploy(state: &mut State, ctx: &Context) -> Result<()> {
        state.install(ctx.myself, Self)
    }

    /// Deploys a timelock meant to govern `target`
    pub fn create_timelock(
        state: &mut State,
        ctx: &Context,
        target: Address,
        admin: Address,
        delay: u64,
    ) -> Result<Address> {
        let args = TimelockArgs { admin, delay };
        let timelock = create2(state, ctx, salt_for(target), &args, |state, ctx| {
            Timelock::deploy(state, ctx, &args)
        })?;
        state.emit(ctx.myself, Event::CreateTimelock { timelock });
        debug!(?target, ?admin, delay, ?timelock, "timelock created");
        Ok(timelock)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VaultFactory;

impl VaultFactory {
    pub fn deploy(state: &mut State, ctx: &Context) -> Result<()> {
        state.install(ctx.myself, Self)
    }

    /// Deploys a vault for `token` and hands its ownership to the caller
    pub fn create_vault(state: &mut State, ctx: &Context, token: Address) -> Result<Address> {
        let args = VaultArgs { token };
        let vault = create2(state, ctx, salt_for(token), &args, |state, ctx| {
            Vault::deploy(state, ctx, &args)
        })?;
        Vault::transfer_ownership(state, &ctx.call_into(vault), ctx.caller)?;
        state.emit(ctx.myself, Event::CreateVault { vault });
        debug!(?token, ?vault, owner = ?ctx.caller, "vault created");
        Ok(vault)
    }
}
