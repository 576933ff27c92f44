//! Weighted mixes of workloads ("salads")

use super::workload::Workload;
use crate::error::{BenchError, Result};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct Mix {
    pub name: String,
    pub parts: Vec<(Workload, u32)>,
}

use Workload::*;

/// Named mixes from the experiment suites. Weights are percentages.
const NAMED_MIXES: &[(&str, &[(Workload, u32)])] = &[
    (
        "salad_native_coin_e80_m20",
        &[(EthNativeIntra, 80), (MoveNativeIntra, 20)],
    ),
    (
        "salad_native_coin_e70_m20_ec5_mc5",
        &[
            (EthNativeIntra, 70),
            (MoveNativeIntra, 20),
            (EthNativeCross, 5),
            (MoveNativeCross, 5),
        ],
    ),
    (
        "salad_erc_custom_coin_e60_m40",
        &[(EthErc20Intra, 60), (MoveCoinIntra, 40)],
    ),
    (
        "salad_erc_custom_coin_e55_m35_c10",
        &[
            (EthErc20Intra, 55),
            (MoveCoinIntra, 35),
            (EthErc20Cross, 5),
            (MoveCoinCross, 5),
        ],
    ),
    (
        "salad_uniswap_pancake_uni45_pancake55",
        &[(UniswapIntra, 45), (PancakeIntra, 55)],
    ),
    (
        "salad_uniswap_pancake_uni45_pancake45_cross10",
        &[
            (UniswapIntra, 45),
            (PancakeIntra, 45),
            (UniswapCross, 5),
            (PancakeCross, 5),
        ],
    ),
    (
        "salad_pancake_custom15_pancake15_erc70",
        &[(MoveCoinIntra, 15), (PancakeIntra, 15), (EthErc20Intra, 70)],
    ),
    (
        "salad_pancake_custom15_pancake15_erc60_crosspan10",
        &[
            (MoveCoinIntra, 15),
            (PancakeIntra, 15),
            (EthErc20Intra, 60),
            (PancakeCross, 10),
        ],
    ),
    (
        "salad_uniswap_intra20_erc30_custom50",
        &[(UniswapIntra, 20), (EthErc20Intra, 30), (MoveCoinIntra, 50)],
    ),
    (
        "salad_uniswap_intra20_cross10_erc30_custom40",
        &[
            (UniswapIntra, 20),
            (UniswapCross, 10),
            (EthErc20Intra, 30),
            (MoveCoinIntra, 40),
        ],
    ),
];

impl Mix {
    pub fn new(name: &str, parts: Vec<(Workload, u32)>) -> Result<Self> {
        if parts.is_empty() || parts.iter().all(|(_, w)| *w == 0) {
            return Err(BenchError::ScenarioError(format!(
                "mix '{}' has no positive weights",
                name
            )));
        }
        Ok(Mix {
            name: name.to_string(),
            parts,
        })
    }

    pub fn single(workload: Workload) -> Self {
        Mix {
            name: workload.name().to_string(),
            parts: vec![(workload, 1)],
        }
    }

    pub fn named(name: &str) -> Option<Self> {
        NAMED_MIXES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(n, parts)| Mix {
                name: n.to_string(),
                parts: parts.to_vec(),
            })
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        NAMED_MIXES.iter().map(|(n, _)| *n)
    }

    /// Resolve a CLI argument: a named mix, a single workload, or an inline
    /// spec such as `eth_native_intra:80,move_native_intra:20`.
    pub fn resolve(spec: &str) -> Result<Self> {
        if let Some(mix) = Self::named(spec) {
            return Ok(mix);
        }
        if !spec.contains(':') {
            return Ok(Self::single(spec.parse()?));
        }
        let parts = spec
            .split(',')
            .map(|part| {
                let (name, weight) = part.split_once(':').ok_or_else(|| {
                    BenchError::ScenarioError(format!("expected workload:weight, got '{}'", part))
                })?;
                let weight = weight.trim().parse::<u32>().map_err(|e| {
                    BenchError::ScenarioError(format!("bad weight in '{}': {}", part, e))
                })?;
                Ok((name.trim().parse::<Workload>()?, weight))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(spec, parts)
    }

    pub fn workloads(&self) -> impl Iterator<Item = Workload> + '_ {
        self.parts.iter().map(|(w, _)| *w)
    }

    pub fn sampler(&self) -> Result<MixSampler> {
        let weights = self.parts.iter().map(|(_, w)| *w);
        let index = WeightedIndex::new(weights)
            .map_err(|e| BenchError::ScenarioError(format!("mix '{}': {}", self.name, e)))?;
        Ok(MixSampler {
            workloads: self.workloads().collect(),
            index,
        })
    }
}

pub struct MixSampler {
    workloads: Vec<Workload>,
    index: WeightedIndex<u32>,
}

impl MixSampler {
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Workload {
        self.workloads[self.index.sample(rng)]
    }
}
