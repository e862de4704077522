//! Uniswap V4 swap quoting.

use crate::chain::contracts::IV4Quoter;
use crate::error::{Error, Result};
use alloy_primitives::{
    aliases::{I24, U24},
    Address, Bytes, U256,
};
use alloy_provider::Provider;
use shield_protocol::AmountError;
use std::sync::Arc;

/// 0.3 % fee tier
const POOL_FEE: u32 = 3000;
const TICK_SPACING: i32 = 60;

/// Build the pool key for a token pair. V4 requires currency0 < currency1;
/// the returned flag is true when the swap direction is currency0 -> 1,
/// i.e. the input token sorts first.
pub fn build_pool_key(token_in: Address, token_out: Address) -> (IV4Quoter::PoolKey, bool) {
    let zero_for_one = token_in < token_out;
    let (currency0, currency1) = if zero_for_one {
        (token_in, token_out)
    } else {
        (token_out, token_in)
    };
    let key = IV4Quoter::PoolKey {
        currency0,
        currency1,
        fee: U24::from(POOL_FEE),
        tickSpacing: I24::try_from(TICK_SPACING).expect("tick spacing fits in 24 bits"),
        hooks: Address::ZERO,
    };
    (key, zero_for_one)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    pub amount_out: U256,
    pub gas_estimate: U256,
}

pub struct QuoteAdapter<P: Provider + Clone> {
    provider: Arc<P>,
    quoter: Address,
}

impl<P: Provider + Clone> QuoteAdapter<P> {
    pub fn new(provider: Arc<P>, quoter: Address) -> Self {
        Self { provider, quoter }
    }

    /// Quote an exact-input single-hop swap. `amount_in` is in the input
    /// token's base units.
    pub async fn quote_exact_input(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<SwapQuote> {
        let exact_amount =
            u128::try_from(amount_in).map_err(|_| Error::Amount(AmountError::Overflow))?;
        let (pool_key, zero_for_one) = build_pool_key(token_in, token_out);
        let params = IV4Quoter::QuoteExactSingleParams {
            poolKey: pool_key,
            zeroForOne: zero_for_one,
            exactAmount: exact_amount,
            hookData: Bytes::new(),
        };

        let quoter = IV4Quoter::new(self.quoter, self.provider.clone());
        let quote = quoter
            .quoteExactInputSingle(params)
            .call()
            .await
            .map_err(|e| Error::Contract(e.to_string()))?;

        Ok(SwapQuote {
            amount_out: quote.amountOut,
            gas_estimate: quote.gasEstimate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_currencies_and_sets_direction() {
        let low = Address::repeat_byte(0x01);
        let high = Address::repeat_byte(0xff);

        let (key, zero_for_one) = build_pool_key(low, high);
        assert!(zero_for_one);
        assert_eq!(key.currency0, low);
        assert_eq!(key.currency1, high);

        let (key, zero_for_one) = build_pool_key(high, low);
        assert!(!zero_for_one);
        assert_eq!(key.currency0, low);
        assert_eq!(key.currency1, high);
    }

    #[test]
    fn pool_parameters_match_deployment() {
        let (key, _) = build_pool_key(Address::repeat_byte(1), Address::repeat_byte(2));
        assert_eq!(key.fee, U24::from(3000u32));
        assert_eq!(key.tickSpacing, I24::try_from(60).unwrap());
        assert_eq!(key.hooks, Address::ZERO);
    }
}
