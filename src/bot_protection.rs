//! Launch-window filter
//!
//! While enabled and before `launch_time`, every fresh recipient of tokens is
//! recorded as blocked and may not send tokens until the owner allows it,
//! which is only possible once the launch time has passed.

use anyhow::Result;
use ethereum_types::Address;

use crate::constants::LAUNCH_WINDOW;
use crate::error::{ContractError, InvalidParam};
use crate::indexed_set::IndexedSet;

#[derive(Debug, Clone)]
pub struct BotProtection {
    enabled: bool,
    launch_time: u64,
    blocked: IndexedSet<Address>,
}

impl BotProtection {
    /// `launch_time` may be at most one week after `now`
    pub fn new(launch_time: u64, now: u64) -> Result<Self> {
        if launch_time > now.saturating_add(LAUNCH_WINDOW) {
            return Err(ContractError::ConstructorInvalid(InvalidParam::LaunchTime).into());
        }
        Ok(Self {
            enabled: false,
            launch_time,
            blocked: IndexedSet::new(),
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn launch_time(&self) -> u64 {
        self.launch_time
    }

    /// One-way latch; returns true on the false -> true transition
    pub fn enable(&mut self) -> bool {
        let changed = !self.enabled;
        self.enabled = true;
        changed
    }

    pub fn is_blocked(&self, account: Address) -> bool {
        self.blocked.contains(&account)
    }

    pub fn ensure_not_blocked(&self, sender: Address) -> Result<()> {
        if self.is_blocked(sender) {
            return Err(ContractError::TransfersBlocked.into());
        }
        Ok(())
    }

    /// Blocks `recipient` if the filter is active at `now`
    pub fn record_recipient(&mut self, recipient: Address, now: u64) -> bool {
        if !self.enabled || now >= self.launch_time {
            return false;
        }
        self.blocked.insert(recipient)
    }

    /// Lifts the block on `account`; only after launch
    pub fn allow(&mut self, account: Address, now: u64) -> Result<bool> {
        if now < self.launch_time {
            return Err(ContractError::BeforeLaunch.into());
        }
        Ok(self.blocked.remove(&account))
    }

    pub fn blocked(&self) -> &IndexedSet<Address> {
        &self.blocked
    }
}
