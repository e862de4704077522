use alloy_sol_types::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
    }
}

sol! {
    /// ERC-7984 confidential token wrapping a public ERC-20. Balances are
    /// exposed as opaque ciphertext handles; the zero handle marks an
    /// account that never held a balance.
    #[sol(rpc)]
    #[derive(Debug)]
    interface IConfidentialToken {
        function confidentialBalanceOf(address account) external view returns (bytes32);

        function wrap(address to, uint256 amount) external;

        function unwrap(address from, address to, uint256 amount) external;

        function confidentialTransferAndCall(
            address to,
            bytes32 encryptedAmount,
            bytes calldata inputProof,
            bytes calldata data
        ) external returns (bytes32);
    }
}

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface IConfidentialLending {
        function asset() external view returns (address);
        function aAsset() external view returns (address);
        function AAVE_POOL_ADDRESS() external view returns (address);
        function confidentialBalanceOf(address account) external view returns (bytes32);
    }
}

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface IV4Quoter {
        struct PoolKey {
            address currency0;
            address currency1;
            uint24 fee;
            int24 tickSpacing;
            address hooks;
        }

        struct QuoteExactSingleParams {
            PoolKey poolKey;
            bool zeroForOne;
            uint128 exactAmount;
            bytes hookData;
        }

        function quoteExactInputSingle(QuoteExactSingleParams memory params)
            external
            returns (uint256 amountOut, uint256 gasEstimate);
    }
}
