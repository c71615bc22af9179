//! Owned holder of a single token's reserve

use anyhow::Result;
use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::abi::Param;
use crate::chain::{Context, State};
use crate::constants::ZERO_ADDRESS;
use crate::deploy::Blueprint;
use crate::erc20;
use crate::events::Event;
use crate::ownable::Ownable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultArgs {
    pub token: Address,
}

impl Blueprint for VaultArgs {
    const BYTECODE: &'static [u8] = b"Vault";

    fn constructor_args(&self) -> Vec<Param> {
        vec![self.token.into()]
    }
}

#[derive(Debug, Clone)]
pub struct Vault {
    token: Address,
    ownable: Ownable,
}

impl Vault {
    /// The deployer becomes the owner
    pub fn deploy(state: &mut State, ctx: &Context, args: &VaultArgs) -> Result<()> {
        state.install(
            ctx.myself,
            Self {
                token: args.token,
                ownable: Ownable::new(ctx.caller),
            },
        )?;
        state.emit(
            ctx.myself,
            Event::OwnershipTransferred { previous_owner: ZERO_ADDRESS, new_owner: ctx.caller },
        );
        Ok(())
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn owner(&self) -> Address {
        self.ownable.owner()
    }

    pub fn balance(state: &State, vault: Address) -> Result<U256> {
        let token = state.get::<Self>(vault)?.token;
        erc20::balance_of(state, token, vault)
    }

    pub fn withdraw(state: &mut State, ctx: &Context, to: Address, amount: U256) -> Result<()> {
        let vault = state.get::<Self>(ctx.myself)?;
        vault.ownable.only_owner(ctx.caller)?;
        let token = vault.token;
        erc20::transfer(state, ctx, token, to, amount)?;
        state.emit(ctx.myself, Event::Withdraw { to, amount });
        info!(vault = ?ctx.myself, ?to, %amount, "withdraw");
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
}
