//! Timelock, token timelock and vault tests

use super::*;
use crate::abi::{encode, Param};
use crate::chain::{Context, State};
use crate::constants::{GRACE_PERIOD, MAXIMUM_DELAY, ZERO_ADDRESS};
use crate::error::InvalidParam;
use crate::events::Event;
use crate::timelock::{QueuedCall, Timelock, TimelockArgs, TokenTimelock, TokenTimelockArgs, TxStatus};
use crate::vault::{Vault, VaultArgs};

fn deploy_timelock(chain: &mut Chain, admin: Address, delay: u64) -> Result<Address> {
    let args = TimelockArgs { admin, delay };
    chain.deploy(owner(), U256::zero(), move |state, ctx| Timelock::deploy(state, ctx, &args))
}

fn timelock(chain: &Chain, address: Address) -> &Timelock {
    chain.state().get::<Timelock>(address).unwrap()
}

fn as_admin<T, F>(chain: &mut Chain, sender: Address, timelock: Address, op: F) -> Result<T>
where
    F: FnOnce(&mut State, &Context) -> Result<T>,
{
    chain.transact(sender, timelock, U256::zero(), op)
}

fn queue(chain: &mut Chain, timelock: Address, call: &QueuedCall) -> Result<ethereum_types::H256> {
    as_admin(chain, alice(), timelock, |s, c| Timelock::queue_transaction(s, c, call))
}

fn execute(chain: &mut Chain, timelock: Address, call: &QueuedCall) -> Result<Vec<u8>> {
    as_admin(chain, alice(), timelock, |s, c| Timelock::execute_transaction(s, c, call))
}

fn cancel(chain: &mut Chain, timelock: Address, call: &QueuedCall) -> Result<()> {
    as_admin(chain, alice(), timelock, |s, c| Timelock::cancel_transaction(s, c, call))
}

/// A call of the timelock on itself, queued one delay ahead
fn self_call(chain: &Chain, timelock: Address, signature: &str, args: &[Param]) -> QueuedCall {
    QueuedCall {
        target: timelock,
        value: U256::zero(),
        signature: signature.to_string(),
        data: encode(args),
        eta: chain.timestamp() + ONE_DAY,
    }
}

/// Token owned by `owner()` with a vault owned by a timelock run by `alice()`
struct VaultFixture {
    chain: Chain,
    token: Address,
    vault: Address,
    timelock: Address,
}

fn vault_fixture() -> VaultFixture {
    let mut chain = setup();
    let token = default_token(&mut chain);
    let timelock = deploy_timelock(&mut chain, alice(), ONE_DAY).unwrap();
    let vault = chain
        .deploy(owner(), U256::zero(), move |state, ctx| Vault::deploy(state, ctx, &VaultArgs { token }))
        .unwrap();
    chain
        .transact(owner(), vault, U256::zero(), |s, c| Vault::transfer_ownership(s, c, timelock))
        .unwrap();
    transfer(&mut chain, token, owner(), vault, tokens(1_000_000)).unwrap();
    VaultFixture { chain, token, vault, timelock }
}

#[cfg(test)]
mod timelock_queue_tests {
    use super::*;

    #[test]
    fn test_constructor_delay_bounds() {
        let mut chain = setup();
        let result = deploy_timelock(&mut chain, alice(), ONE_DAY - 1);
        assert_eq!(error_of(result), ContractError::ConstructorInvalid(InvalidParam::Delay));
        let result = deploy_timelock(&mut chain, alice(), MAXIMUM_DELAY + 1);
        assert_eq!(error_of(result), ContractError::ConstructorInvalid(InvalidParam::Delay));

        let address = deploy_timelock(&mut chain, alice(), MAXIMUM_DELAY).unwrap();
        let t = timelock(&chain, address);
        assert_eq!(t.admin(), alice());
        assert_eq!(t.pending_admin(), ZERO_ADDRESS);
        assert_eq!(t.delay(), MAXIMUM_DELAY);
    }

    #[test]
    fn test_queue_requires_admin_and_delay() {
        let mut chain = setup();
        let address = deploy_timelock(&mut chain, alice(), ONE_DAY).unwrap();
        let mut call = self_call(&chain, address, "setDelay(uint256)", &[Param::Uint(U256::from(2 * ONE_DAY))]);

        let result = as_admin(&mut chain, bob(), address, |s, c| Timelock::queue_transaction(s, c, &call));
        assert_eq!(error_of(result), ContractError::NotAdmin);

        call.eta -= 1;
        assert_eq!(error_of(queue(&mut chain, address, &call)), ContractError::InsufficientDelay);

        call.eta += 1;
        let tx_hash = queue(&mut chain, address, &call).unwrap();
        assert_eq!(tx_hash, call.hash());
        assert!(timelock(&chain, address).queued_transactions(tx_hash));
        assert!(matches!(
            chain.events_from(address).pop(),
            Some(Event::QueueTransaction { eta, .. }) if *eta == call.eta
        ));
    }

    #[test]
    fn test_queue_twice_fails() {
        let mut chain = setup();
        let address = deploy_timelock(&mut chain, alice(), ONE_DAY).unwrap();
        let call = self_call(&chain, address, "setDelay(uint256)", &[Param::Uint(U256::from(2 * ONE_DAY))]);
        queue(&mut chain, address, &call).unwrap();
        assert_eq!(error_of(queue(&mut chain, address, &call)), ContractError::AlreadyQueued);
    }

    #[test]
    fn test_cancel() {
        let mut chain = setup();
        let address = deploy_timelock(&mut chain, alice(), ONE_DAY).unwrap();
        let call = self_call(&chain, address, "setDelay(uint256)", &[Param::Uint(U256::from(2 * ONE_DAY))]);

        assert_eq!(error_of(cancel(&mut chain, address, &call)), ContractError::NotQueued);
        let tx_hash = queue(&mut chain, address, &call).unwrap();
        cancel(&mut chain, address, &call).unwrap();
        assert_eq!(timelock(&chain, address).status(tx_hash), Some(TxStatus::Cancelled));
        assert_eq!(error_of(queue(&mut chain, address, &call)), ContractError::TransactionFinalized);

        chain.increase_time(ONE_DAY);
        assert_eq!(error_of(execute(&mut chain, address, &call)), ContractError::NotQueued);
    }
}

#[cfg(test)]
mod timelock_execute_tests {
    use super::*;

    #[test]
    fn test_execute_window() {
        let mut chain = setup();
        let address = deploy_timelock(&mut chain, alice(), ONE_DAY).unwrap();
        let call = self_call(&chain, address, "setDelay(uint256)", &[Param::Uint(U256::from(2 * ONE_DAY))]);
        let tx_hash = queue(&mut chain, address, &call).unwrap();

        chain.increase_time(ONE_DAY - 1);
        assert_eq!(error_of(execute(&mut chain, address, &call)), ContractError::TooEarly);

        chain.increase_time(1);
        execute(&mut chain, address, &call).unwrap();
        let t = timelock(&chain, address);
        assert_eq!(t.delay(), 2 * ONE_DAY);
        assert_eq!(t.status(tx_hash), Some(TxStatus::Executed));

        let events = chain.events_from(address);
        assert_eq!(events[events.len() - 2], &Event::NewDelay { delay: 2 * ONE_DAY });
        assert!(matches!(events[events.len() - 1], Event::ExecuteTransaction { .. }));

        assert_eq!(error_of(execute(&mut chain, address, &call)), ContractError::NotQueued);
    }

    #[test]
    fn test_stale_transaction() {
        let mut chain = setup();
        let address = deploy_timelock(&mut chain, alice(), ONE_DAY).unwrap();
        let call = self_call(&chain, address, "setDelay(uint256)", &[Param::Uint(U256::from(2 * ONE_DAY))]);
        queue(&mut chain, address, &call).unwrap();

        chain.increase_time(ONE_DAY + GRACE_PERIOD + 1);
        assert_eq!(error_of(execute(&mut chain, address, &call)), ContractError::StaleTransaction);
    }

    #[test]
    fn test_failed_target_reverts_execution() {
        let mut chain = setup();
        let address = deploy_timelock(&mut chain, alice(), ONE_DAY).unwrap();
        let call = self_call(&chain, address, "setDelay(uint256)", &[Param::Uint(U256::from(MAXIMUM_DELAY + 1))]);
        let tx_hash = queue(&mut chain, address, &call).unwrap();

        chain.increase_time(ONE_DAY);
        assert_eq!(error_of(execute(&mut chain, address, &call)), ContractError::DelayOutOfRange);
        // still queued, so it can be cancelled
        assert!(timelock(&chain, address).queued_transactions(tx_hash));
        cancel(&mut chain, address, &call).unwrap();
    }

    #[test]
    fn test_set_delay_only_from_timelock() {
        let mut chain = setup();
        let address = deploy_timelock(&mut chain, alice(), ONE_DAY).unwrap();
        let result = as_admin(&mut chain, alice(), address, |s, c| Timelock::set_delay(s, c, 2 * ONE_DAY));
        assert_eq!(error_of(result), ContractError::NotTimelock);
        let result = as_admin(&mut chain, alice(), address, |s, c| Timelock::set_pending_admin(s, c, bob()));
        assert_eq!(error_of(result), ContractError::NotTimelock);
    }

    #[test]
    fn test_admin_handover() {
        let mut chain = setup();
        let address = deploy_timelock(&mut chain, alice(), ONE_DAY).unwrap();
        let call = self_call(&chain, address, "setPendingAdmin(address)", &[Param::Address(bob())]);
        queue(&mut chain, address, &call).unwrap();
        chain.increase_time(ONE_DAY);
        execute(&mut chain, address, &call).unwrap();
        assert_eq!(timelock(&chain, address).pending_admin(), bob());

        let result = as_admin(&mut chain, carol(), address, Timelock::accept_admin);
        assert_eq!(error_of(result), ContractError::NotPendingAdmin);

        as_admin(&mut chain, bob(), address, Timelock::accept_admin).unwrap();
        let t = timelock(&chain, address);
        assert_eq!(t.admin(), bob());
        assert_eq!(t.pending_admin(), ZERO_ADDRESS);
        assert_eq!(chain.events_from(address).pop(), Some(&Event::NewAdmin { admin: bob() }));
    }

    #[test]
    fn test_raw_calldata_with_empty_signature() {
        let mut chain = setup();
        let address = deploy_timelock(&mut chain, alice(), ONE_DAY).unwrap();
        let mut call = self_call(&chain, address, "setDelay(uint256)", &[Param::Uint(U256::from(3 * ONE_DAY))]);
        call.data = call.calldata();
        call.signature = String::new();

        queue(&mut chain, address, &call).unwrap();
        chain.increase_time(ONE_DAY);
        execute(&mut chain, address, &call).unwrap();
        assert_eq!(timelock(&chain, address).delay(), 3 * ONE_DAY);
    }
}

#[cfg(test)]
mod vault_tests {
    use super::*;

    fn withdraw_call(fixture: &VaultFixture, to: Address, amount: U256) -> QueuedCall {
        QueuedCall {
            target: fixture.vault,
            value: U256::zero(),
            signature: "withdraw(address,uint256)".to_string(),
            data: encode(&[Param::Address(to), Param::Uint(amount)]),
            eta: fixture.chain.timestamp() + ONE_DAY,
        }
    }

    #[test]
    fn test_vault_state() {
        let fixture = vault_fixture();
        let vault = fixture.chain.state().get::<Vault>(fixture.vault).unwrap();
        assert_eq!(vault.token(), fixture.token);
        assert_eq!(vault.owner(), fixture.timelock);
        assert_eq!(Vault::balance(fixture.chain.state(), fixture.vault).unwrap(), tokens(1_000_000));
    }

    #[test]
    fn test_withdraw_is_owner_only() {
        let mut fixture = vault_fixture();
        let vault = fixture.vault;
        let result = fixture
            .chain
            .transact(alice(), vault, U256::zero(), |s, c| Vault::withdraw(s, c, alice(), tokens(1)));
        assert_eq!(error_of(result), ContractError::NotOwner);
    }

    #[test]
    fn test_withdraw_through_timelock() {
        let mut fixture = vault_fixture();
        let call = withdraw_call(&fixture, bob(), tokens(1_000));
        let timelock = fixture.timelock;

        queue(&mut fixture.chain, timelock, &call).unwrap();
        fixture.chain.increase_time(ONE_DAY);
        execute(&mut fixture.chain, timelock, &call).unwrap();

        // a vault outside the fee exclusions pays the transfer fee
        let received = token(&fixture.chain, fixture.token).balance_of(bob());
        assert!(received >= tokens(900));
        assert_eq!(
            fixture.chain.events_from(fixture.vault).pop(),
            Some(&Event::Withdraw { to: bob(), amount: tokens(1_000) })
        );
    }

    #[test]
    fn test_vault_ownership_through_timelock() {
        let mut fixture = vault_fixture();
        let call = QueuedCall {
            target: fixture.vault,
            value: U256::zero(),
            signature: "transferOwnership(address)".to_string(),
            data: encode(&[Param::Address(carol())]),
            eta: fixture.chain.timestamp() + ONE_DAY,
        };
        let timelock = fixture.timelock;
        queue(&mut fixture.chain, timelock, &call).unwrap();
        fixture.chain.increase_time(ONE_DAY);
        execute(&mut fixture.chain, timelock, &call).unwrap();

        let vault = fixture.chain.state().get::<Vault>(fixture.vault).unwrap();
        assert_eq!(vault.owner(), carol());
    }

    #[test]
    fn test_unknown_call_fails() {
        let mut fixture = vault_fixture();
        let call = QueuedCall {
            target: fixture.vault,
            value: U256::zero(),
            signature: "drain()".to_string(),
            data: Vec::new(),
            eta: fixture.chain.timestamp() + ONE_DAY,
        };
        let timelock = fixture.timelock;
        queue(&mut fixture.chain, timelock, &call).unwrap();
        fixture.chain.increase_time(ONE_DAY);
        let result = execute(&mut fixture.chain, timelock, &call);
        assert!(matches!(error_of(result), ContractError::UnknownCall(_)));
    }
}

#[cfg(test)]
mod token_timelock_tests {
    use super::*;

    fn deploy_lock(chain: &mut Chain, token: Address, release_time: u64) -> Result<Address> {
        let args = TokenTimelockArgs { token, beneficiary: alice(), release_time };
        chain.deploy(owner(), U256::zero(), move |state, ctx| TokenTimelock::deploy(state, ctx, &args))
    }

    fn release(chain: &mut Chain, lock: Address) -> Result<U256> {
        chain.transact(carol(), lock, U256::zero(), TokenTimelock::release)
    }

    #[test]
    fn test_release_time_must_be_in_future() {
        let mut chain = setup();
        let token = default_token(&mut chain);
        let result = deploy_lock(&mut chain, token, GENESIS);
        assert_eq!(error_of(result), ContractError::ConstructorInvalid(InvalidParam::ReleaseTime));
    }

    #[test]
    fn test_release_after_time() {
        let mut chain = setup();
        let token_address = default_token(&mut chain);
        let lock = deploy_lock(&mut chain, token_address, GENESIS + ONE_DAY).unwrap();
        transfer(&mut chain, token_address, owner(), lock, tokens(500)).unwrap();

        let t = chain.state().get::<TokenTimelock>(lock).unwrap();
        assert_eq!(t.token(), token_address);
        assert_eq!(t.beneficiary(), alice());
        assert_eq!(t.release_time(), GENESIS + ONE_DAY);

        assert_eq!(error_of(release(&mut chain, lock)), ContractError::TooEarly);
        chain.increase_time(ONE_DAY);

        // anyone may trigger the release; tokens go to the beneficiary
        let released = release(&mut chain, lock).unwrap();
        assert_eq!(released, tokens(500));
        assert!(token(&chain, token_address).balance_of(alice()) >= tokens(450));
        assert_eq!(
            chain.events_from(lock).pop(),
            Some(&Event::TokensReleased { beneficiary: alice(), amount: tokens(500) })
        );

        assert_eq!(error_of(release(&mut chain, lock)), ContractError::NothingToRelease);
    }

    #[test]
    fn test_release_through_dispatch() {
        let mut chain = setup();
        let token_address = default_token(&mut chain);
        let lock = deploy_lock(&mut chain, token_address, GENESIS + ONE_DAY).unwrap();
        transfer(&mut chain, token_address, owner(), lock, tokens(500)).unwrap();
        chain.increase_time(ONE_DAY);

        let output = chain
            .transact(carol(), lock, U256::zero(), |state, ctx| {
                crate::dispatch::call(state, ctx, &crate::abi::selector("release()"))
            })
            .unwrap();
        assert_eq!(output, encode(&[Param::Uint(tokens(500))]));
    }
}
