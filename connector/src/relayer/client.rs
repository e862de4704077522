//! External decrypt client.
//!
//! All cryptography lives on the other side of this seam: the relayer checks
//! the user's signed authorization, decrypts the ciphertexts behind the
//! submitted handles and returns plaintexts keyed by the exact handle they
//! were requested under.

use crate::core::auth::DecryptionAuthorization;
use crate::error::{Error, Result};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use shield_protocol::{CiphertextHandle, HandleContractPair, Plaintext};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;

/// Result set of one batch user decryption, keyed by handle. May be partial:
/// only successfully decrypted handles are included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecryptionResults(HashMap<CiphertextHandle, Plaintext>);

impl DecryptionResults {
    pub fn insert(&mut self, handle: CiphertextHandle, plaintext: Plaintext) {
        self.0.insert(handle, plaintext);
    }

    pub fn get(&self, handle: &CiphertextHandle) -> Option<&Plaintext> {
        self.0.get(handle)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &HashMap<CiphertextHandle, Plaintext> {
        &self.0
    }
}

impl FromIterator<(CiphertextHandle, Plaintext)> for DecryptionResults {
    fn from_iter<I: IntoIterator<Item = (CiphertextHandle, Plaintext)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An encrypted input ready to be written on chain: the input handle plus the
/// zero-knowledge proof the contract verifies against it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptedAmount {
    pub handle: CiphertextHandle,
    pub input_proof: Bytes,
}

/// The FHE service the connector delegates all ciphertext work to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecryptClient: Send + Sync {
    /// Decrypt a batch of handles under the owner's signed authorization.
    async fn user_decrypt(
        &self,
        pairs: &[HandleContractPair],
        authorization: &DecryptionAuthorization,
        chain_id: u64,
    ) -> Result<DecryptionResults>;

    /// Encrypt a 64-bit amount as an input for the given contract and owner.
    async fn encrypt_u64(
        &self,
        contract: Address,
        owner: Address,
        value: u64,
    ) -> Result<EncryptedAmount>;
}

#[derive(Deserialize)]
struct UserDecryptHttpResponse {
    response: Vec<DecryptedEntry>,
}

#[derive(Deserialize)]
struct DecryptedEntry {
    handle: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputProofHttpResponse {
    handle: String,
    input_proof: String,
}

/// HTTP client for the relayer's JSON API.
pub struct RelayerClient {
    http: reqwest::Client,
    base_url: String,
}

impl RelayerClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn parse_handle(raw: &str) -> Result<CiphertextHandle> {
        CiphertextHandle::from_str(raw).map_err(|e| Error::InvalidHandle(e.to_string()))
    }
}

#[async_trait]
impl DecryptClient for RelayerClient {
    async fn user_decrypt(
        &self,
        pairs: &[HandleContractPair],
        authorization: &DecryptionAuthorization,
        chain_id: u64,
    ) -> Result<DecryptionResults> {
        let body = json!({
            "handleContractPairs": pairs
                .iter()
                .map(|p| json!({
                    "handle": p.handle.to_string(),
                    "contractAddress": p.contract_address.to_string(),
                }))
                .collect::<Vec<_>>(),
            "requestValidity": {
                "startTimestamp": authorization.start_timestamp,
                "durationDays": authorization.duration_days,
            },
            "contractsChainId": chain_id,
            "contractAddresses": authorization
                .contract_addresses
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>(),
            "userAddress": authorization.owner.to_string(),
            "signature": authorization.signature.to_string(),
            "publicKey": authorization.public_key.to_string(),
        });

        info!(
            "Requesting user decryption of {} handles from relayer",
            pairs.len()
        );
        let response: UserDecryptHttpResponse = self
            .http
            .post(self.endpoint("v1/user-decrypt"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut results = DecryptionResults::default();
        for entry in response.response {
            let handle = Self::parse_handle(&entry.handle)?;
            results.insert(handle, Plaintext::parse(&entry.value));
        }
        Ok(results)
    }

    async fn encrypt_u64(
        &self,
        contract: Address,
        owner: Address,
        value: u64,
    ) -> Result<EncryptedAmount> {
        let body = json!({
            "contractAddress": contract.to_string(),
            "userAddress": owner.to_string(),
            "value": value,
        });

        let response: InputProofHttpResponse = self
            .http
            .post(self.endpoint("v1/input-proof"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let input_proof = Bytes::from_str(&response.input_proof)
            .map_err(|e| Error::Relayer(format!("Invalid input proof: {}", e)))?;
        Ok(EncryptedAmount {
            handle: Self::parse_handle(&response.handle)?,
            input_proof,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    #[test]
    fn results_lookup_by_handle() {
        let h1 = CiphertextHandle::from(B256::repeat_byte(1));
        let h2 = CiphertextHandle::from(B256::repeat_byte(2));
        let results: DecryptionResults =
            [(h1, Plaintext::parse("1000000"))].into_iter().collect();

        assert_eq!(results.len(), 1);
        assert!(results.get(&h1).is_some());
        assert!(results.get(&h2).is_none());
    }

    #[test]
    fn decrypt_response_parses_numeric_and_string_values() {
        let raw = r#"{
            "response": [
                {"handle": "0x0101010101010101010101010101010101010101010101010101010101010101", "value": "1000000"},
                {"handle": "0x0202020202020202020202020202020202020202020202020202020202020202", "value": "opaque"}
            ]
        }"#;
        let parsed: UserDecryptHttpResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.response.len(), 2);
        assert_eq!(
            Plaintext::parse(&parsed.response[0].value),
            Plaintext::Uint(alloy_primitives::U256::from(1_000_000u64))
        );
        assert_eq!(
            Plaintext::parse(&parsed.response[1].value),
            Plaintext::Str("opaque".to_string())
        );
    }
}
