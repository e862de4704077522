//! User-decryption authorization.
//!
//! The relayer only serves a user decryption when it carries an EIP-712
//! signature from the balance owner granting access to the listed contracts
//! for a bounded validity window. Signatures are cached per
//! (chain id, owner) and re-used while they are still valid and cover the
//! contracts of the request; a session identity change drops the cache.

use crate::core::session::SessionContext;
use crate::error::{Error, Result};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{eip712_domain, sol, SolStruct};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

const EIP712_DOMAIN_NAME: &str = "Decryption";
const EIP712_DOMAIN_VERSION: &str = "1";

sol! {
    /// Typed payload the relayer verifies before serving a user decryption.
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 startTimestamp;
        uint256 durationDays;
    }
}

/// A signed, chain- and contract-scoped grant to decrypt the owner's
/// balances, valid for a bounded time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionAuthorization {
    pub owner: Address,
    pub chain_id: u64,
    /// Ephemeral key the relayer re-encrypts results towards.
    pub public_key: Bytes,
    pub signature: Bytes,
    pub contract_addresses: Vec<Address>,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

impl DecryptionAuthorization {
    /// Sign a fresh authorization with the session wallet.
    pub fn issue(
        session: &SessionContext,
        contract_addresses: Vec<Address>,
        verifying_contract: Address,
        duration_days: u64,
    ) -> Result<Self> {
        let start_timestamp = unix_now();
        let public_key = ephemeral_public_key();

        let verification = UserDecryptRequestVerification {
            publicKey: public_key.clone(),
            contractAddresses: contract_addresses.clone(),
            startTimestamp: U256::from(start_timestamp),
            durationDays: U256::from(duration_days),
        };
        let domain = eip712_domain! {
            name: EIP712_DOMAIN_NAME,
            version: EIP712_DOMAIN_VERSION,
            chain_id: session.chain_id,
            verifying_contract: verifying_contract,
        };
        let hash = verification.eip712_signing_hash(&domain);
        let signature = session.wallet.sign_hash(&hash)?;

        Ok(Self {
            owner: session.owner,
            chain_id: session.chain_id,
            public_key,
            signature: Bytes::from(signature),
            contract_addresses,
            start_timestamp,
            duration_days,
        })
    }

    pub fn is_valid_at(&self, now: u64) -> bool {
        let end = self
            .start_timestamp
            .saturating_add(self.duration_days.saturating_mul(86_400));
        now >= self.start_timestamp && now < end
    }

    /// Whether every requested contract is within this grant's scope.
    pub fn covers(&self, contracts: &[Address]) -> bool {
        contracts
            .iter()
            .all(|c| self.contract_addresses.contains(c))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn ephemeral_public_key() -> Bytes {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Bytes::from(bytes.to_vec())
}

/// String-keyed storage for serialized authorizations.
pub trait AuthorizationStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn clear(&self);
}

/// In-memory store; authorizations never touch disk.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationStore {
    entries: Mutex<HashMap<String, String>>,
}

impl AuthorizationStore for InMemoryAuthorizationStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value);
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

/// Hands out authorizations for decrypt requests, re-signing only when the
/// cached one is missing, expired or does not cover the requested contracts.
pub struct AuthorizationManager {
    store: Arc<dyn AuthorizationStore>,
    verifying_contract: Address,
    validity_days: u64,
}

impl AuthorizationManager {
    pub fn new(
        store: Arc<dyn AuthorizationStore>,
        verifying_contract: Address,
        validity_days: u64,
    ) -> Self {
        Self {
            store,
            verifying_contract,
            validity_days,
        }
    }

    pub fn authorization_for(
        &self,
        session: &SessionContext,
        contracts: &[Address],
    ) -> Result<DecryptionAuthorization> {
        let key = Self::store_key(session);
        if let Some(raw) = self.store.get(&key) {
            if let Ok(cached) = serde_json::from_str::<DecryptionAuthorization>(&raw) {
                if cached.is_valid_at(unix_now()) && cached.covers(contracts) {
                    return Ok(cached);
                }
            }
        }

        let auth = DecryptionAuthorization::issue(
            session,
            contracts.to_vec(),
            self.verifying_contract,
            self.validity_days,
        )?;
        let serialized = serde_json::to_string(&auth)
            .map_err(|e| Error::Authorization(format!("Failed to serialize: {}", e)))?;
        self.store.set(&key, serialized);
        Ok(auth)
    }

    /// Drop every cached authorization; called on session identity changes.
    pub fn clear(&self) {
        self.store.clear();
    }

    fn store_key(session: &SessionContext) -> String {
        format!("{}:{}", session.chain_id, session.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::SessionWallet;

    const TEST_CHAIN_ID: u64 = 1337;

    fn test_session() -> SessionContext {
        let wallet = SessionWallet::random(Some(TEST_CHAIN_ID)).unwrap();
        SessionContext::new(TEST_CHAIN_ID, wallet)
    }

    fn manager() -> AuthorizationManager {
        AuthorizationManager::new(
            Arc::new(InMemoryAuthorizationStore::default()),
            Address::repeat_byte(0xde),
            10,
        )
    }

    #[test]
    fn issued_authorization_is_valid_and_scoped() {
        let session = test_session();
        let contracts = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        let auth = DecryptionAuthorization::issue(
            &session,
            contracts.clone(),
            Address::repeat_byte(0xde),
            10,
        )
        .unwrap();

        assert_eq!(auth.owner, session.owner);
        assert!(!auth.signature.is_empty());
        assert!(auth.is_valid_at(auth.start_timestamp));
        assert!(auth.covers(&contracts));
        assert!(auth.covers(&contracts[..1]));
        assert!(!auth.covers(&[Address::repeat_byte(9)]));
    }

    #[test]
    fn authorization_expires() {
        let session = test_session();
        let auth =
            DecryptionAuthorization::issue(&session, vec![], Address::repeat_byte(0xde), 1)
                .unwrap();
        assert!(auth.is_valid_at(auth.start_timestamp + 86_399));
        assert!(!auth.is_valid_at(auth.start_timestamp + 86_400));
        assert!(!auth.is_valid_at(auth.start_timestamp.saturating_sub(1)));
    }

    #[test]
    fn manager_reuses_a_covering_authorization() {
        let session = test_session();
        let manager = manager();
        let contracts = [Address::repeat_byte(1)];

        let first = manager.authorization_for(&session, &contracts).unwrap();
        let second = manager.authorization_for(&session, &contracts).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn manager_reissues_for_uncovered_contracts() {
        let session = test_session();
        let manager = manager();

        let first = manager
            .authorization_for(&session, &[Address::repeat_byte(1)])
            .unwrap();
        let second = manager
            .authorization_for(&session, &[Address::repeat_byte(2)])
            .unwrap();
        assert_ne!(first.contract_addresses, second.contract_addresses);
    }

    #[test]
    fn manager_clear_drops_cache() {
        let session = test_session();
        let manager = manager();
        let contracts = [Address::repeat_byte(1)];

        let first = manager.authorization_for(&session, &contracts).unwrap();
        manager.clear();
        let second = manager.authorization_for(&session, &contracts).unwrap();
        // a fresh ephemeral key was generated
        assert_ne!(first.public_key, second.public_key);
    }

    #[test]
    fn serde_round_trip() {
        let session = test_session();
        let auth = DecryptionAuthorization::issue(
            &session,
            vec![Address::repeat_byte(1)],
            Address::repeat_byte(0xde),
            10,
        )
        .unwrap();
        let json = serde_json::to_string(&auth).unwrap();
        let parsed: DecryptionAuthorization = serde_json::from_str(&json).unwrap();
        assert_eq!(auth, parsed);
    }
}
