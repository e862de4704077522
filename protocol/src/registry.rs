//! Per-chain protocol constants: token addresses, protocol contracts and
//! token decimal precision.

use alloy_primitives::{address, Address};

/// Sepolia testnet chain id, the only deployment so far.
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

/// Tokens the protocol knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSymbol {
    Usdc,
    CUsdc,
    Uni,
    CUni,
}

impl TokenSymbol {
    pub fn decimals(self) -> u8 {
        match self {
            TokenSymbol::Usdc => 6,
            TokenSymbol::CUsdc => 6,
            TokenSymbol::Uni => 18,
            TokenSymbol::CUni => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenSymbol::Usdc => "USDC",
            TokenSymbol::CUsdc => "cUSDC",
            TokenSymbol::Uni => "UNI",
            TokenSymbol::CUni => "cUNI",
        }
    }
}

/// A contract whose confidential balance the coordinator tracks for the
/// connected owner, together with the public-token side of the pair (when
/// there is one) and the precision revealed amounts are formatted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedContract {
    pub label: &'static str,
    pub contract: Address,
    pub public_token: Option<Address>,
    pub decimals: u8,
}

/// Deployed contract addresses for one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRegistry {
    pub chain_id: u64,
    /// USDC as used by the AAVE deployment.
    pub usdc: Address,
    /// Confidential wrapper around `usdc`.
    pub confidential_usdc: Address,
    /// USDC and UNI as used by the Uniswap deployment (different USDC!).
    pub uniswap_usdc: Address,
    pub uniswap_uni: Address,
    pub lending: Address,
    pub aave_pool: Address,
}

impl ProtocolRegistry {
    pub fn sepolia() -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
            usdc: address!("94a9d9ac8a22534e3faca9f4e7f2e2cf85d5e4c8"),
            confidential_usdc: address!("022521db54b0bfc74d8f76a8838a63494dd00d01"),
            uniswap_usdc: address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238"),
            uniswap_uni: address!("1f9840a85d5af5bf1d1762f925bdaddc4201f984"),
            lending: address!("4c6faabbdd81b1c8a8d6204ba3a511467e081205"),
            aave_pool: address!("6ae43d3271ff6888e7fc43fd7321a503ff738951"),
        }
    }

    pub fn for_chain(chain_id: u64) -> Option<Self> {
        (chain_id == SEPOLIA_CHAIN_ID).then(Self::sepolia)
    }

    /// The confidential-balance slots the portfolio view tracks per owner:
    /// the wrapped token itself and the lending pool position.
    pub fn reveal_targets(&self) -> Vec<TrackedContract> {
        vec![
            TrackedContract {
                label: "cUSDC",
                contract: self.confidential_usdc,
                public_token: Some(self.usdc),
                decimals: TokenSymbol::CUsdc.decimals(),
            },
            TrackedContract {
                label: "lending",
                contract: self.lending,
                public_token: None,
                decimals: TokenSymbol::CUsdc.decimals(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sepolia_registry_is_selected_by_chain_id() {
        assert_eq!(
            ProtocolRegistry::for_chain(SEPOLIA_CHAIN_ID),
            Some(ProtocolRegistry::sepolia())
        );
        assert_eq!(ProtocolRegistry::for_chain(1), None);
    }

    #[test]
    fn reveal_targets_cover_token_and_lending() {
        let registry = ProtocolRegistry::sepolia();
        let targets = registry.reveal_targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].contract, registry.confidential_usdc);
        assert_eq!(targets[0].public_token, Some(registry.usdc));
        assert_eq!(targets[1].contract, registry.lending);
        assert_eq!(targets[1].public_token, None);
    }

    #[test]
    fn decimals_match_deployments() {
        assert_eq!(TokenSymbol::Usdc.decimals(), 6);
        assert_eq!(TokenSymbol::CUsdc.decimals(), 6);
        assert_eq!(TokenSymbol::Uni.decimals(), 18);
        assert_eq!(TokenSymbol::CUni.decimals(), 6);
    }
}
