//! Addresses of the contracts and modules the deploy scripts publish, plus the
//! Move coin types built on top of them.

use crate::aptos::{AccountAddress, StructTag, TypeTag};
use crate::config::ContractsConfig;
use crate::error::{BenchError, Result};
use alloy_primitives::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// Account the Move packages are published under
    pub move_deployer: AccountAddress,
    pub pancake_router: AccountAddress,
    /// ERC20 coin in the full deployment
    pub eth_coin: Address,
    /// Cross-space proxy; also the ERC20 coin when only the coin is deployed
    pub eth_proxy: Address,
    /// Mirror of the Move coin on the EVM side
    pub eth_coin2: Address,
    pub uniswap_router: Address,
    pub vault: Address,
    pub move_router: Address,
    pub cross_wrapper: Address,
    pub lp_token: Address,
    pub compound_example: Address,
    pub compound_ctoken: Address,
    pub compound_ctoken2: Address,
    /// Underlying token repaid by the compound example
    pub compound_token2: Address,
    pub only_eth_coin_deployed: bool,
}

fn parse_eth(field: &str, value: &str) -> Result<Address> {
    value
        .parse()
        .map_err(|e| BenchError::ConfigError(format!("contracts.{}: {}", field, e)))
}

fn parse_move(field: &str, value: &str) -> Result<AccountAddress> {
    value
        .parse()
        .map_err(|e| BenchError::ConfigError(format!("contracts.{}: {}", field, e)))
}

impl Deployment {
    pub fn from_config(config: &ContractsConfig) -> Result<Self> {
        Ok(Deployment {
            move_deployer: parse_move("move_deployer", &config.move_deployer)?,
            pancake_router: parse_move("pancake_router", &config.pancake_router)?,
            eth_coin: parse_eth("eth_coin", &config.eth_coin)?,
            eth_proxy: parse_eth("eth_proxy", &config.eth_proxy)?,
            eth_coin2: parse_eth("eth_coin2", &config.eth_coin2)?,
            uniswap_router: parse_eth("uniswap_router", &config.uniswap_router)?,
            vault: parse_eth("vault", &config.vault)?,
            move_router: parse_eth("move_router", &config.move_router)?,
            cross_wrapper: parse_eth("cross_wrapper", &config.cross_wrapper)?,
            lp_token: parse_eth("lp_token", &config.lp_token)?,
            compound_example: parse_eth("compound_example", &config.compound_example)?,
            compound_ctoken: parse_eth("compound_ctoken", &config.compound_ctoken)?,
            compound_ctoken2: parse_eth("compound_ctoken2", &config.compound_ctoken2)?,
            compound_token2: parse_eth("compound_token2", &config.compound_token2)?,
            only_eth_coin_deployed: false,
        })
    }

    /// Addresses produced by the deploy scripts on a fresh local testnet.
    pub fn local() -> Result<Self> {
        Self::from_config(&ContractsConfig::default())
    }

    pub fn with_only_eth_coin(mut self, only_eth_coin_deployed: bool) -> Self {
        self.only_eth_coin_deployed = only_eth_coin_deployed;
        self
    }

    /// The ERC20 used for custom-coin transfers. When the deploy script only
    /// publishes the coin it lands at the proxy's address.
    pub fn erc20_coin(&self) -> Address {
        if self.only_eth_coin_deployed {
            self.eth_proxy
        } else {
            self.eth_coin
        }
    }

    fn deployer_struct(&self, module: &str, name: &str, type_args: Vec<TypeTag>) -> TypeTag {
        TypeTag::Struct(Box::new(StructTag {
            address: self.move_deployer,
            module: module.to_string(),
            name: name.to_string(),
            type_args,
        }))
    }

    /// `deployer::native_coin::DiemCoin`
    pub fn diem_coin(&self) -> TypeTag {
        self.deployer_struct("native_coin", "DiemCoin", vec![])
    }

    /// `deployer::native_coin_2::DiemCoin2`
    pub fn diem_coin2(&self) -> TypeTag {
        self.deployer_struct("native_coin_2", "DiemCoin2", vec![])
    }

    /// `deployer::mirror_coin::EthCoin`
    pub fn mirror_eth_coin(&self) -> TypeTag {
        self.deployer_struct("mirror_coin", "EthCoin", vec![])
    }

    /// `deployer::lp_token::LPToken<EthCoin, DiemCoin>`
    pub fn lp_token_tag(&self) -> TypeTag {
        self.deployer_struct(
            "lp_token",
            "LPToken",
            vec![self.mirror_eth_coin(), self.diem_coin()],
        )
    }

    /// The `CoinStore` resource type that holds `coin` for an account.
    pub fn coin_store(coin: &TypeTag) -> String {
        format!("0x1::coin::CoinStore<{}>", coin)
    }
}
