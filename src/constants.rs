use ethereum_types::{Address, H160};
use hex_lit::hex;

// Well-known addresses
pub const ZERO_ADDRESS: Address = H160([0u8; 20]);
pub const DEAD_ADDRESS: Address = H160(hex!("000000000000000000000000000000000000dEaD"));
pub const WETH_ADDRESS: Address = H160(hex!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c"));
pub const AMM_FACTORY_ADDRESS: Address = H160(hex!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73"));
pub const ROUTER_ADDRESS: Address = H160(hex!("10ED43C718714eb63d5aA57B78B54704E256024E"));

// Time
pub const ONE_DAY: u64 = 86_400;
pub const LAUNCH_WINDOW: u64 = 7 * ONE_DAY;           // launch time must be within 1 week
pub const MIN_LIQUIDITY_LOCK: u64 = 182 * ONE_DAY;    // 15_724_800s, 6 months

// Admin timelock
pub const GRACE_PERIOD: u64 = 14 * ONE_DAY;
pub const MINIMUM_DELAY: u64 = ONE_DAY;
pub const MAXIMUM_DELAY: u64 = 30 * ONE_DAY;

// Token economics
pub const DECIMALS: u8 = 9;
pub const MAX_FEE_PERCENT: u64 = 15;
/// 1,000,000,000 * 10^6 * 10^9 base units
pub const TOTAL_SUPPLY: u128 = 1_000_000_000_000_000_000_000_000;

// AMM
pub const MINIMUM_LIQUIDITY: u64 = 1_000;
pub const SWAP_FEE_BPS: u64 = 30;                    // 0.3% pool fee
pub const BPS: u64 = 10_000;
