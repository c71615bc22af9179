//! Single-principal access control shared by the owned contracts

use anyhow::Result;
use ethereum_types::Address;

use crate::constants::ZERO_ADDRESS;
use crate::error::ContractError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownable {
    owner: Address,
}

impl Ownable {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn only_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(ContractError::NotOwner.into());
        }
        Ok(())
    }

    /// Hands ownership to `new_owner`; returns the event to emit
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<Event> {
        self.only_owner(caller)?;
        if new_owner == ZERO_ADDRESS {
            return Err(ContractError::ZeroOwner.into());
        }
        Ok(self.set_owner(new_owner))
    }

    pub fn renounce_ownership(&mut self, caller: Address) -> Result<Event> {
        self.only_owner(caller)?;
        Ok(self.set_owner(ZERO_ADDRESS))
    }

    fn set_owner(&mut self, new_owner: Address) -> Event {
        let previous_owner = self.owner;
        self.owner = new_owner;
        Event::OwnershipTransferred {
            previous_owner,
            new_owner,
        }
    }
}
