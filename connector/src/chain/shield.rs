//! Shielding: wrapping a public ERC-20 balance into its confidential
//! counterpart. Two on-chain steps, approve then wrap, each waited to its
//! receipt, with the current stage observable for progress display. The
//! tracker picks up the new ciphertext handle on its next poll, which also
//! resets any previously revealed view of the balance.

use crate::chain::contracts::{IConfidentialToken, IERC20};
use crate::error::{Error, Result};
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use shield_protocol::amount::{normalize_amount_input, parse_units};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShieldStage {
    Idle,
    Approving,
    Wrapping,
    Done,
}

/// Sanitize free-form input into base units. `Ok(None)` means there is
/// nothing to do (empty or zero input), mirroring how the form treats it.
pub fn parse_shield_amount(input: &str, decimals: u8) -> Result<Option<U256>> {
    let normalized = normalize_amount_input(input, decimals);
    let normalized = normalized.trim_end_matches('.');
    if normalized.is_empty() {
        return Ok(None);
    }
    let amount = parse_units(normalized, decimals)?;
    Ok((!amount.is_zero()).then_some(amount))
}

/// Runs the approve-then-wrap pipeline for one token pair.
pub struct ShieldAdapter<P: Provider + Clone> {
    provider: Arc<P>,
    token: Address,
    confidential_token: Address,
    decimals: u8,
    owner: Address,
    stage_tx: watch::Sender<ShieldStage>,
}

impl<P: Provider + Clone> ShieldAdapter<P> {
    pub fn new(
        provider: Arc<P>,
        token: Address,
        confidential_token: Address,
        decimals: u8,
        owner: Address,
    ) -> Self {
        let (stage_tx, _) = watch::channel(ShieldStage::Idle);
        Self {
            provider,
            token,
            confidential_token,
            decimals,
            owner,
            stage_tx,
        }
    }

    /// Observe stage progression while a shield is running.
    pub fn stage(&self) -> watch::Receiver<ShieldStage> {
        self.stage_tx.subscribe()
    }

    /// Shield the given user-entered amount of the public token.
    pub async fn shield(&self, amount_input: &str) -> Result<()> {
        let Some(amount) = parse_shield_amount(amount_input, self.decimals)? else {
            debug!("Shield requested with empty or zero amount, nothing to do");
            return Ok(());
        };

        let result = self.run(amount).await;
        if result.is_err() {
            let _ = self.stage_tx.send(ShieldStage::Idle);
        }
        result
    }

    async fn run(&self, amount: U256) -> Result<()> {
        let _ = self.stage_tx.send(ShieldStage::Approving);
        let erc20 = IERC20::new(self.token, self.provider.clone());
        let pending = erc20
            .approve(self.confidential_token, amount)
            .from(self.owner)
            .send()
            .await
            .map_err(|e| Error::Contract(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| Error::Provider(e.to_string()))?;
        if !receipt.status() {
            return Err(Error::Contract("Approve transaction reverted".into()));
        }

        let _ = self.stage_tx.send(ShieldStage::Wrapping);
        let token = IConfidentialToken::new(self.confidential_token, self.provider.clone());
        let pending = token
            .wrap(self.owner, amount)
            .from(self.owner)
            .send()
            .await
            .map_err(|e| Error::Contract(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| Error::Provider(e.to_string()))?;
        if !receipt.status() {
            return Err(Error::Contract("Wrap transaction reverted".into()));
        }

        let _ = self.stage_tx.send(ShieldStage::Done);
        info!(
            "Shielded {} base units of {} into {}",
            amount, self.token, self.confidential_token
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shield_protocol::AmountError;

    #[test]
    fn parses_user_input_at_token_precision() {
        assert_eq!(
            parse_shield_amount("1,000.50", 6).unwrap(),
            Some(U256::from(1_000_500_000u64))
        );
        // fraction beyond the token's precision is truncated by normalization
        assert_eq!(
            parse_shield_amount("0.1234567", 6).unwrap(),
            Some(U256::from(123_456u64))
        );
    }

    #[test]
    fn empty_and_zero_inputs_are_noops() {
        assert_eq!(parse_shield_amount("", 6).unwrap(), None);
        assert_eq!(parse_shield_amount("0", 6).unwrap(), None);
        assert_eq!(parse_shield_amount("0.000", 6).unwrap(), None);
        assert_eq!(parse_shield_amount("abc", 6).unwrap(), None);
    }

    #[test]
    fn trailing_dot_is_tolerated() {
        assert_eq!(
            parse_shield_amount("5.", 6).unwrap(),
            Some(U256::from(5_000_000u64))
        );
    }

    #[test]
    fn error_type_surfaces_for_unrepresentable_amounts() {
        // normalization bounds the fraction, so only overflow remains
        let huge = "9".repeat(80);
        assert!(matches!(
            parse_shield_amount(&huge, 6),
            Err(Error::Amount(AmountError::Overflow))
        ));
    }
}
