//! EVM transaction model: legacy EIP-155 signing and contract call encoding

pub mod abi;
pub mod tx;

pub use tx::{LegacyTx, SignedEthTx, CALL_GAS, DEFAULT_GAS_PRICE, SWAP_GAS, TRANSFER_GAS};

use alloy_primitives::U256;

/// `n * 10^exp` as a U256, for the wei amounts the workloads use.
pub fn pow10(n: u64, exp: usize) -> U256 {
    U256::from(n) * U256::from(10u8).pow(U256::from(exp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow10() {
        assert_eq!(pow10(1, 18), U256::from(1_000_000_000_000_000_000u128));
        assert_eq!(pow10(1000, 10), U256::from(10_000_000_000_000u64));
        assert_eq!(pow10(3, 0), U256::from(3u8));
    }
}
