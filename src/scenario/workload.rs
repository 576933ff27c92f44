//! Benchmark workloads: one kind of transaction each

use crate::batch::TxType;
use crate::error::{BenchError, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vm {
    Move,
    Eth,
}

/// Which pool a transaction's counterparty comes from, if it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    None,
    SameVm,
    OtherVm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workload {
    MoveNativeIntra,
    MoveCoinIntra,
    MoveNativeCross,
    MoveCoinCross,
    EthNativeIntra,
    EthNativeCross,
    EthErc20Intra,
    EthErc20Cross,
    UniswapIntra,
    UniswapCross,
    PancakeIntra,
    PancakeCross,
    CompoundIntra,
    CompoundCross,
}

pub const ALL_WORKLOADS: [Workload; 14] = [
    Workload::MoveNativeIntra,
    Workload::MoveCoinIntra,
    Workload::MoveNativeCross,
    Workload::MoveCoinCross,
    Workload::EthNativeIntra,
    Workload::EthNativeCross,
    Workload::EthErc20Intra,
    Workload::EthErc20Cross,
    Workload::UniswapIntra,
    Workload::UniswapCross,
    Workload::PancakeIntra,
    Workload::PancakeCross,
    Workload::CompoundIntra,
    Workload::CompoundCross,
];

// Amounts moved by each workload.
pub const MOVE_NATIVE_TRANSFER: u64 = 100;
pub const MOVE_COIN_TRANSFER: u64 = 100;
/// Move intra transfers drawn inside a mix of several workloads
pub const MOVE_SALAD_TRANSFER: u64 = 10_000;
pub const MOVE_CROSS_DEPOSIT: u64 = 10_000;
pub const MOVE_SWAP_IN: u64 = 100_000;
pub const COMPOUND_COLLATERAL: u64 = 500_000_000;
pub const COMPOUND_REPAY_MOVE: u64 = 200_000;
/// 10^10 wei
pub const ETH_TRANSFER_EXP: usize = 10;
/// 10^18 wei
pub const ETH_CROSS_VALUE_EXP: usize = 18;
/// 1000 * 10^10 tokens
pub const ETH_SWAP_IN_EXP: usize = 13;
/// 10^24
pub const UNISWAP_DEADLINE_EXP: usize = 24;
pub const COMPOUND_BORROW_EXP: usize = 13;
pub const COMPOUND_REPAY_EXP: usize = 15;

impl Workload {
    pub fn name(self) -> &'static str {
        match self {
            Workload::MoveNativeIntra => "move_native_intra",
            Workload::MoveCoinIntra => "move_coin_intra",
            Workload::MoveNativeCross => "move_native_cross",
            Workload::MoveCoinCross => "move_coin_cross",
            Workload::EthNativeIntra => "eth_native_intra",
            Workload::EthNativeCross => "eth_native_cross",
            Workload::EthErc20Intra => "eth_erc20_intra",
            Workload::EthErc20Cross => "eth_erc20_cross",
            Workload::UniswapIntra => "uniswap_intra",
            Workload::UniswapCross => "uniswap_cross",
            Workload::PancakeIntra => "pancake_intra",
            Workload::PancakeCross => "pancake_cross",
            Workload::CompoundIntra => "compound_intra",
            Workload::CompoundCross => "compound_cross",
        }
    }

    /// VM the transaction is submitted to.
    pub fn vm(self) -> Vm {
        if self.tx_type().is_move() {
            Vm::Move
        } else {
            Vm::Eth
        }
    }

    pub fn tx_type(self) -> TxType {
        match self {
            Workload::MoveNativeIntra | Workload::MoveCoinIntra | Workload::PancakeIntra => {
                TxType::NativeAptos
            }
            Workload::MoveNativeCross
            | Workload::MoveCoinCross
            | Workload::UniswapCross
            | Workload::CompoundCross => TxType::CrossAptos,
            Workload::EthNativeIntra
            | Workload::EthErc20Intra
            | Workload::UniswapIntra
            | Workload::CompoundIntra => TxType::NativeEth,
            Workload::EthNativeCross | Workload::EthErc20Cross | Workload::PancakeCross => {
                TxType::CrossEth
            }
        }
    }

    pub fn receiver(self) -> Receiver {
        match self {
            Workload::MoveNativeIntra
            | Workload::MoveCoinIntra
            | Workload::EthNativeIntra
            | Workload::EthErc20Intra => Receiver::SameVm,
            Workload::MoveNativeCross
            | Workload::MoveCoinCross
            | Workload::EthNativeCross
            | Workload::EthErc20Cross => Receiver::OtherVm,
            _ => Receiver::None,
        }
    }

    /// Lending positions live on the genesis account, so these always sign with it.
    pub fn genesis_only(self) -> bool {
        matches!(self, Workload::CompoundIntra | Workload::CompoundCross)
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Workload {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.replace('-', "_");
        ALL_WORKLOADS
            .iter()
            .copied()
            .find(|w| w.name() == wanted)
            .ok_or_else(|| BenchError::ScenarioError(format!("unknown workload '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for workload in ALL_WORKLOADS {
            assert_eq!(workload.name().parse::<Workload>().unwrap(), workload);
        }
        assert_eq!(
            "eth-erc20-cross".parse::<Workload>().unwrap(),
            Workload::EthErc20Cross
        );
        assert!("eth_magic".parse::<Workload>().is_err());
    }

    #[test]
    fn test_tags_follow_origin_vm() {
        assert_eq!(Workload::PancakeCross.vm(), Vm::Eth);
        assert_eq!(Workload::PancakeCross.tx_type(), TxType::CrossEth);
        assert_eq!(Workload::UniswapCross.vm(), Vm::Move);
        assert_eq!(Workload::UniswapCross.tx_type(), TxType::CrossAptos);
        assert_eq!(Workload::CompoundIntra.tx_type(), TxType::NativeEth);
        for workload in ALL_WORKLOADS {
            let cross = workload.tx_type().is_cross();
            assert_eq!(cross, workload.name().ends_with("cross"), "{}", workload);
        }
    }
}
