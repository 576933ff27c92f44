//! Entry function payloads used by the workloads and funding steps.

use super::types::{
    arg_address, arg_bytes, arg_u64, AccountAddress, EntryFunction, ModuleId, StructTag,
    TransactionPayload, TypeTag,
};
use crate::contracts::Deployment;
use crate::error::Result;
use alloy_primitives::Address;

/// Deadline passed to the cross-VM swap; far enough in the future for replay.
pub const SWAP_DEADLINE: u64 = 1_913_334_000;

fn aptos_coin() -> TypeTag {
    TypeTag::Struct(Box::new(StructTag {
        address: AccountAddress::ONE,
        module: "aptos_coin".to_string(),
        name: "AptosCoin".to_string(),
        type_args: vec![],
    }))
}

fn call(
    address: AccountAddress,
    module: &str,
    function: &str,
    ty_args: Vec<TypeTag>,
    args: Vec<Vec<u8>>,
) -> TransactionPayload {
    EntryFunction::new(ModuleId::new(address, module), function, ty_args, args).into()
}

/// `0x1::coin::transfer<0x1::aptos_coin::AptosCoin>(to, amount)`
pub fn aptos_coin_transfer(to: &AccountAddress, amount: u64) -> TransactionPayload {
    call(
        AccountAddress::ONE,
        "coin",
        "transfer",
        vec![aptos_coin()],
        vec![arg_address(to), arg_u64(amount)],
    )
}

/// `deployer::native_coin::transfer(to, amount)`
pub fn custom_coin_transfer(
    deployment: &Deployment,
    to: &AccountAddress,
    amount: u64,
) -> TransactionPayload {
    call(
        deployment.move_deployer,
        "native_coin",
        "transfer",
        vec![],
        vec![arg_address(to), arg_u64(amount)],
    )
}

/// `deployer::native_coin::mint(to, amount)`, signed by the deployer.
pub fn custom_coin_mint(
    deployment: &Deployment,
    to: &AccountAddress,
    amount: u64,
) -> TransactionPayload {
    call(
        deployment.move_deployer,
        "native_coin",
        "mint",
        vec![],
        vec![arg_address(to), arg_u64(amount)],
    )
}

/// `0x1::managed_coin::register<coin>()`
pub fn register_coin(coin: TypeTag) -> TransactionPayload {
    call(
        AccountAddress::ONE,
        "managed_coin",
        "register",
        vec![coin],
        vec![],
    )
}

/// Moves native coin to an EVM account through `cross_vm_coin_erc20`.
pub fn deposit_aptos_coin_cross(
    deployment: &Deployment,
    eth_receiver: &Address,
    amount: u64,
) -> Result<TransactionPayload> {
    Ok(call(
        deployment.move_deployer,
        "cross_vm_coin_erc20",
        "deposit_aptos_coin",
        vec![],
        vec![arg_bytes(eth_receiver.as_slice())?, arg_u64(amount)],
    ))
}

/// Moves `DiemCoin` to an EVM account through `cross_vm_coin_erc20`.
pub fn deposit_custom_coin_cross(
    deployment: &Deployment,
    eth_receiver: &Address,
    amount: u64,
) -> Result<TransactionPayload> {
    Ok(call(
        deployment.move_deployer,
        "cross_vm_coin_erc20",
        "deposit",
        vec![deployment.diem_coin()],
        vec![arg_bytes(eth_receiver.as_slice())?, arg_u64(amount)],
    ))
}

/// Bridges `DiemCoin` into its EVM mirror through the reverse demo module.
pub fn deposit_custom_coin_reverse(
    deployment: &Deployment,
    eth_receiver: &Address,
    amount: u64,
) -> Result<TransactionPayload> {
    Ok(call(
        deployment.move_deployer,
        "cross_vm_coin_reverse_demo",
        "deposit",
        vec![deployment.diem_coin()],
        vec![arg_bytes(eth_receiver.as_slice())?, arg_u64(amount)],
    ))
}

/// `router::swap_exact_input<DiemCoin, DiemCoin2>(amount_in, amount_out_min)`
pub fn pancake_swap_exact_input(
    deployment: &Deployment,
    amount_in: u64,
    amount_out_min: u64,
) -> TransactionPayload {
    call(
        deployment.pancake_router,
        "router",
        "swap_exact_input",
        vec![deployment.diem_coin(), deployment.diem_coin2()],
        vec![arg_u64(amount_in), arg_u64(amount_out_min)],
    )
}

/// Swap on the EVM uniswap pair, initiated from Move.
pub fn uniswap_swap_cross(
    deployment: &Deployment,
    amount_in: u64,
    amount_out_min: u64,
) -> Result<TransactionPayload> {
    Ok(call(
        deployment.move_deployer,
        "cross_vm_coin_reverse_demo",
        "swap_exact_tokens_for_tokens",
        vec![deployment.diem_coin(), deployment.mirror_eth_coin()],
        vec![
            arg_u64(amount_in),
            arg_u64(amount_out_min),
            arg_u64(SWAP_DEADLINE),
            arg_bytes(deployment.cross_wrapper.as_slice())?,
        ],
    ))
}

pub fn compound_borrow_cross(deployment: &Deployment, collateral: u64) -> TransactionPayload {
    call(
        deployment.move_deployer,
        "cross_vm_coin_compound",
        "deposit_collateral_and_borrow",
        vec![deployment.diem_coin(), deployment.mirror_eth_coin()],
        vec![arg_u64(collateral)],
    )
}

pub fn compound_repay_cross(deployment: &Deployment, amount: u64) -> TransactionPayload {
    call(
        deployment.move_deployer,
        "cross_vm_coin_compound",
        "repay_debt_and_fetch_collateral",
        vec![deployment.diem_coin(), deployment.mirror_eth_coin()],
        vec![arg_u64(amount)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_deposit_encodes_eth_address_as_bytes() {
        let deployment = Deployment::local().unwrap();
        let receiver = deployment.vault;
        let TransactionPayload(function) = deposit_custom_coin_cross(&deployment, &receiver, 10_000).unwrap();

        assert_eq!(function.module.name, "cross_vm_coin_erc20");
        assert_eq!(function.function, "deposit");
        assert_eq!(function.ty_args, vec![deployment.diem_coin()]);
        assert_eq!(function.args[0][0], 20);
        assert_eq!(&function.args[0][1..], receiver.as_slice());
        assert_eq!(function.args[1], 10_000u64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_pancake_swap_targets_router() {
        let deployment = Deployment::local().unwrap();
        let TransactionPayload(function) = pancake_swap_exact_input(&deployment, 100_000, 1);
        assert_eq!(function.module.address, deployment.pancake_router);
        assert_eq!(function.module.name, "router");
        assert_eq!(function.ty_args.len(), 2);
    }

    #[test]
    fn test_uniswap_cross_arguments() {
        let deployment = Deployment::local().unwrap();
        let TransactionPayload(function) = uniswap_swap_cross(&deployment, 100_000, 1).unwrap();
        assert_eq!(function.args.len(), 4);
        assert_eq!(function.args[2], SWAP_DEADLINE.to_le_bytes().to_vec());
        assert_eq!(function.args[3].len(), 21);
    }
}
