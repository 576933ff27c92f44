//! Solidity surface of the deployed EVM contracts.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};

sol! {
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
    }

    interface ICrossSpaceProxy {
        function sendETHCrossSpace(string receiver) external payable;
    }

    interface IVault {
        function deposit(bytes32 receiver, uint256 amount) external;
    }

    interface IUniswapRouter {
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] path,
            address to,
            uint256 deadline
        ) external returns (uint256[] amounts);
    }

    interface ICrossWrapper {
        function swapExactTokensForTokens(
            address tokenIn,
            address tokenOut,
            uint256 amountIn,
            uint256 amountOutMin
        ) external;
        function approvePortal(address token) external;
    }

    interface ICompoundExample {
        function borrowEthExample(
            address cEther,
            address cToken,
            address underlying,
            uint256 amount
        ) external;
        function myEthRepayBorrow(
            address cEther,
            address cToken,
            address underlying,
            uint256 amount
        ) external;
    }
}

/// Allowance used for every approval: 2^255.
pub fn max_approval() -> U256 {
    U256::from(1u8) << 255
}

pub fn erc20_transfer(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}

pub fn erc20_approve(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

pub fn erc20_balance_of(owner: Address) -> Bytes {
    IERC20::balanceOfCall { owner }.abi_encode().into()
}

/// `receiver` is the Move address in its `0x`-prefixed long hex form.
pub fn send_eth_cross_space(receiver: String) -> Bytes {
    ICrossSpaceProxy::sendETHCrossSpaceCall { receiver }
        .abi_encode()
        .into()
}

pub fn vault_deposit(receiver: B256, amount: U256) -> Bytes {
    IVault::depositCall { receiver, amount }.abi_encode().into()
}

pub fn uniswap_swap_exact_tokens(
    amount_in: U256,
    amount_out_min: U256,
    path: Vec<Address>,
    to: Address,
    deadline: U256,
) -> Bytes {
    IUniswapRouter::swapExactTokensForTokensCall {
        amountIn: amount_in,
        amountOutMin: amount_out_min,
        path,
        to,
        deadline,
    }
    .abi_encode()
    .into()
}

pub fn wrapper_swap_exact_tokens(
    token_in: Address,
    token_out: Address,
    amount_in: U256,
    amount_out_min: U256,
) -> Bytes {
    ICrossWrapper::swapExactTokensForTokensCall {
        tokenIn: token_in,
        tokenOut: token_out,
        amountIn: amount_in,
        amountOutMin: amount_out_min,
    }
    .abi_encode()
    .into()
}

pub fn wrapper_approve_portal(token: Address) -> Bytes {
    ICrossWrapper::approvePortalCall { token }.abi_encode().into()
}

pub fn compound_borrow(c_ether: Address, c_token: Address, underlying: Address, amount: U256) -> Bytes {
    ICompoundExample::borrowEthExampleCall {
        cEther: c_ether,
        cToken: c_token,
        underlying,
        amount,
    }
    .abi_encode()
    .into()
}

pub fn compound_repay(c_ether: Address, c_token: Address, underlying: Address, amount: U256) -> Bytes {
    ICompoundExample::myEthRepayBorrowCall {
        cEther: c_ether,
        cToken: c_token,
        underlying,
        amount,
    }
    .abi_encode()
    .into()
}
