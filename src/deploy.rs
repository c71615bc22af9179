//! Deterministic contract addressing
//!
//! Addresses follow the EVM rules bit for bit:
//! - CREATE:  `keccak256(rlp([sender, nonce]))[12..]`
//! - CREATE2: `keccak256(0xff ++ deployer ++ salt ++ keccak256(init_code))[12..]`
//!
//! The init code of a contract kind is its fixed blueprint bytecode followed by
//! the ABI-encoded constructor arguments, so changing any argument moves the
//! contract to a different address and repeating all of them collides.

use anyhow::Result;
use ethereum_types::{Address, H256};
use tracing::debug;

use crate::abi::{self, keccak256, Param};
use crate::chain::{Context, State};
use crate::error::ContractError;

/// A deployable contract kind: blueprint code plus constructor arguments
pub trait Blueprint {
    const BYTECODE: &'static [u8];

    fn constructor_args(&self) -> Vec<Param>;

    fn init_code_hash(&self) -> H256 {
        init_code_hash(Self::BYTECODE, &self.constructor_args())
    }
}

/// `keccak256(abi.encodePacked(account))`
pub fn salt_for(account: Address) -> H256 {
    keccak256(account.as_bytes())
}

pub fn init_code_hash(bytecode: &[u8], args: &[Param]) -> H256 {
    let mut init_code = bytecode.to_vec();
    init_code.extend_from_slice(&abi::encode(args));
    keccak256(&init_code)
}

pub fn create2_address(deployer: Address, salt: H256, init_code_hash: H256) -> Address {
    let mut preimage = Vec::with_capacity(85);
    preimage.push(0xff);
    preimage.extend_from_slice(deployer.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    preimage.extend_from_slice(init_code_hash.as_bytes());
    Address::from_slice(&keccak256(&preimage).as_bytes()[12..])
}

/// Address `factory` deploys `blueprint` at when salted with `key`
pub fn predict_address<B: Blueprint>(factory: Address, key: Address, blueprint: &B) -> Address {
    create2_address(factory, salt_for(key), blueprint.init_code_hash())
}

pub fn create_address(sender: Address, nonce: u64) -> Address {
    // rlp([sender, nonce]); the list is always shorter than 56 bytes
    let mut nonce_rlp = Vec::new();
    if nonce == 0 {
        nonce_rlp.push(0x80);
    } else if nonce < 0x80 {
        nonce_rlp.push(nonce as u8);
    } else {
        let bytes = nonce.to_be_bytes();
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(7);
        nonce_rlp.push(0x80 + (8 - first) as u8);
        nonce_rlp.extend_from_slice(&bytes[first..]);
    }

    let mut rlp = Vec::with_capacity(32);
    rlp.push(0xc0 + (21 + nonce_rlp.len()) as u8);
    rlp.push(0x94);
    rlp.extend_from_slice(sender.as_bytes());
    rlp.extend_from_slice(&nonce_rlp);
    Address::from_slice(&keccak256(&rlp).as_bytes()[12..])
}

/// Deploys `blueprint` from `ctx.myself` at its CREATE2 address.
///
/// `construct` runs with a context whose `myself` is the new address and must
/// insert the contract there. Fails with `AddressOccupied` if that address
/// already holds code.
pub fn create2<B, F>(
    state: &mut State,
    ctx: &Context,
    salt: H256,
    blueprint: &B,
    construct: F,
) -> Result<Address>
where
    B: Blueprint,
    F: FnOnce(&mut State, &Context) -> Result<()>,
{
    let address = create2_address(ctx.myself, salt, blueprint.init_code_hash());
    if state.has_code(address) {
        return Err(ContractError::AddressOccupied(address).into());
    }

    debug!(deployer = ?ctx.myself, ?address, "create2");
    construct(state, &ctx.deploy_into(address))?;
    Ok(address)
}
