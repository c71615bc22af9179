//! CREATE2 deployer tests

use super::*;
use crate::deploy::predict_address;
use crate::error::InvalidParam;
use crate::events::Event;
use crate::timelock::{Timelock, TimelockArgs, TokenTimelock, TokenTimelockArgs};
use crate::vault::{Vault, VaultArgs};

fn some_token() -> Address {
    account(70)
}

#[cfg(test)]
mod token_timelock_factory_tests {
    use super::*;

    fn create(chain: &mut Chain, factory: Address, token: Address, release_time: u64) -> Result<Address> {
        chain.transact(alice(), factory, U256::zero(), |state, ctx| {
            TokenTimelockFactory::create_token_timelock(state, ctx, token, bob(), release_time)
        })
    }

    #[test]
    fn test_lands_on_predicted_address() {
        let mut chain = setup();
        let factory = chain.deploy(owner(), U256::zero(), TokenTimelockFactory::deploy).unwrap();
        let release_time = GENESIS + LIQUIDITY_LOCK;

        let lock = create(&mut chain, factory, some_token(), release_time).unwrap();
        let args = TokenTimelockArgs { token: some_token(), beneficiary: bob(), release_time };
        assert_eq!(lock, predict_address(factory, some_token(), &args));

        let deployed = chain.state().get::<TokenTimelock>(lock).unwrap();
        assert_eq!(deployed.token(), some_token());
        assert_eq!(deployed.beneficiary(), bob());
        assert_eq!(deployed.release_time(), release_time);
        assert_eq!(
            chain.events_from(factory).pop(),
            Some(&Event::CreateTokenTimelock { token_timelock: lock })
        );
    }

    #[test]
    fn test_same_arguments_collide() {
        let mut chain = setup();
        let factory = chain.deploy(owner(), U256::zero(), TokenTimelockFactory::deploy).unwrap();
        let lock = create(&mut chain, factory, some_token(), GENESIS + ONE_DAY).unwrap();

        let result = create(&mut chain, factory, some_token(), GENESIS + ONE_DAY);
        assert_eq!(error_of(result), ContractError::AddressOccupied(lock));

        let other = create(&mut chain, factory, some_token(), GENESIS + ONE_DAY + 1).unwrap();
        assert_ne!(other, lock);
    }

    #[test]
    fn test_past_release_time_rejected() {
        let mut chain = setup();
        let factory = chain.deploy(owner(), U256::zero(), TokenTimelockFactory::deploy).unwrap();
        let result = create(&mut chain, factory, some_token(), GENESIS);
        assert_eq!(error_of(result), ContractError::ConstructorInvalid(InvalidParam::ReleaseTime));
        assert!(chain.events_from(factory).is_empty());
    }
}

#[cfg(test)]
mod timelock_factory_tests {
    use super::*;

    fn create(chain: &mut Chain, factory: Address, target: Address, delay: u64) -> Result<Address> {
        chain.transact(bob(), factory, U256::zero(), |state, ctx| {
            TimelockFactory::create_timelock(state, ctx, target, alice(), delay)
        })
    }

    #[test]
    fn test_lands_on_predicted_address() {
        let mut chain = setup();
        let factory = chain.deploy(owner(), U256::zero(), TimelockFactory::deploy).unwrap();
        let timelock = create(&mut chain, factory, some_token(), ONE_DAY).unwrap();

        let args = TimelockArgs { admin: alice(), delay: ONE_DAY };
        assert_eq!(timelock, predict_address(factory, some_token(), &args));

        let deployed = chain.state().get::<Timelock>(timelock).unwrap();
        assert_eq!(deployed.admin(), alice());
        assert_eq!(deployed.delay(), ONE_DAY);
        assert_eq!(chain.events_from(factory).pop(), Some(&Event::CreateTimelock { timelock }));
    }

    #[test]
    fn test_one_timelock_per_target_and_arguments() {
        let mut chain = setup();
        let factory = chain.deploy(owner(), U256::zero(), TimelockFactory::deploy).unwrap();
        let first = create(&mut chain, factory, some_token(), ONE_DAY).unwrap();
        assert_eq!(
            error_of(create(&mut chain, factory, some_token(), ONE_DAY)),
            ContractError::AddressOccupied(first)
        );

        let other_target = create(&mut chain, factory, account(71), ONE_DAY).unwrap();
        let other_delay = create(&mut chain, factory, some_token(), 2 * ONE_DAY).unwrap();
        assert_ne!(other_target, first);
        assert_ne!(other_delay, first);
    }

    #[test]
    fn test_delay_bounds_enforced() {
        let mut chain = setup();
        let factory = chain.deploy(owner(), U256::zero(), TimelockFactory::deploy).unwrap();
        let result = create(&mut chain, factory, some_token(), 60);
        assert_eq!(error_of(result), ContractError::ConstructorInvalid(InvalidParam::Delay));
    }
}

#[cfg(test)]
mod vault_factory_tests {
    use super::*;

    fn create(chain: &mut Chain, factory: Address, token: Address) -> Result<Address> {
        chain.transact(alice(), factory, U256::zero(), |state, ctx| VaultFactory::create_vault(state, ctx, token))
    }

    #[test]
    fn test_caller_owns_the_vault() {
        let mut chain = setup();
        let factory = chain.deploy(owner(), U256::zero(), VaultFactory::deploy).unwrap();
        let vault = create(&mut chain, factory, some_token()).unwrap();

        assert_eq!(vault, predict_address(factory, some_token(), &VaultArgs { token: some_token() }));
        let deployed = chain.state().get::<Vault>(vault).unwrap();
        assert_eq!(deployed.owner(), alice());
        assert_eq!(deployed.token(), some_token());

        assert_eq!(
            chain.events_from(vault).pop(),
            Some(&Event::OwnershipTransferred { previous_owner: factory, new_owner: alice() })
        );
        assert_eq!(chain.events_from(factory).pop(), Some(&Event::CreateVault { vault }));
    }

    #[test]
    fn test_one_vault_per_token() {
        let mut chain = setup();
        let factory = chain.deploy(owner(), U256::zero(), VaultFactory::deploy).unwrap();
        let vault = create(&mut chain, factory, some_token()).unwrap();
        assert_eq!(error_of(create(&mut chain, factory, some_token())), ContractError::AddressOccupied(vault));
        assert_ne!(create(&mut chain, factory, account(71)).unwrap(), vault);
    }

    #[test]
    fn test_factories_are_independent() {
        let mut chain = setup();
        let first = chain.deploy(owner(), U256::zero(), VaultFactory::deploy).unwrap();
        let second = chain.deploy(owner(), U256::zero(), VaultFactory::deploy).unwrap();
        assert_ne!(first, second);
        assert_ne!(
            create(&mut chain, first, some_token()).unwrap(),
            create(&mut chain, second, some_token()).unwrap()
        );
    }
}
