//! Confidential lending adapter.
//!
//! Supplying is a confidential transfer-and-call of an encrypted amount into
//! the lending pool; the pool's own confidential balance for the owner is
//! tracked and revealed like any other slot.

use crate::chain::contracts::{IConfidentialLending, IConfidentialToken};
use crate::error::{Error, Result};
use crate::relayer::client::EncryptedAmount;
use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::Provider;
use std::sync::Arc;
use tracing::info;

pub struct LendingAdapter<P: Provider + Clone> {
    provider: Arc<P>,
    lending: Address,
    confidential_token: Address,
    owner: Address,
}

impl<P: Provider + Clone> LendingAdapter<P> {
    pub fn new(
        provider: Arc<P>,
        lending: Address,
        confidential_token: Address,
        owner: Address,
    ) -> Self {
        Self {
            provider,
            lending,
            confidential_token,
            owner,
        }
    }

    /// Supply an encrypted amount of the confidential token into the pool.
    pub async fn supply(&self, amount: &EncryptedAmount) -> Result<()> {
        let token = IConfidentialToken::new(self.confidential_token, self.provider.clone());
        let pending = token
            .confidentialTransferAndCall(
                self.lending,
                B256::from(amount.handle),
                amount.input_proof.clone(),
                Bytes::new(),
            )
            .from(self.owner)
            .send()
            .await
            .map_err(|e| Error::Contract(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| Error::Provider(e.to_string()))?;
        if !receipt.status() {
            return Err(Error::Contract("Supply transaction reverted".into()));
        }

        info!("Supplied encrypted amount {} into lending", amount.handle);
        Ok(())
    }

    /// Underlying public asset of the pool.
    pub async fn asset(&self) -> Result<Address> {
        IConfidentialLending::new(self.lending, self.provider.clone())
            .asset()
            .call()
            .await
            .map_err(|e| Error::Contract(e.to_string()))
    }

    /// AAVE interest-bearing token the pool deposits into.
    pub async fn a_asset(&self) -> Result<Address> {
        IConfidentialLending::new(self.lending, self.provider.clone())
            .aAsset()
            .call()
            .await
            .map_err(|e| Error::Contract(e.to_string()))
    }

    pub async fn aave_pool(&self) -> Result<Address> {
        IConfidentialLending::new(self.lending, self.provider.clone())
            .AAVE_POOL_ADDRESS()
            .call()
            .await
            .map_err(|e| Error::Contract(e.to_string()))
    }
}
