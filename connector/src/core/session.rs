use alloy_primitives::{Address, ChainId, B256};
use alloy_signer::{Signer, SignerSync};
use alloy_signer_local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Signer error: {0}")]
    SignerError(#[from] alloy_signer::Error),
    #[error("Local signer error: {0}")]
    LocalSignerError(#[from] alloy_signer_local::LocalSignerError),
    #[error("Failed to load wallet: {0}")]
    LoadError(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Local signer backing the connected session, used to authorize
/// user-decryption requests.
#[derive(Clone)]
pub struct SessionWallet {
    pub signer: PrivateKeySigner,
}

impl SessionWallet {
    /// Create a new wallet from a mnemonic phrase
    pub fn from_mnemonic(phrase: &str, chain_id: Option<ChainId>) -> Result<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .build()?
            .with_chain_id(chain_id);

        Ok(Self { signer })
    }

    /// Create a new wallet from a mnemonic file
    pub fn from_mnemonic_file(path: PathBuf, chain_id: Option<ChainId>) -> Result<Self> {
        let phrase = std::fs::read_to_string(&path)
            .map_err(|e| SessionError::LoadError(format!("Failed to read mnemonic file: {}", e)))?;
        Self::from_mnemonic(phrase.trim(), chain_id)
    }

    /// Create a new random wallet
    pub fn random(chain_id: Option<ChainId>) -> Result<Self> {
        let signer = PrivateKeySigner::random().with_chain_id(chain_id);
        Ok(Self { signer })
    }

    /// Get the wallet's address
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a hash
    pub fn sign_hash(&self, hash: &B256) -> Result<Vec<u8>> {
        Ok(self.signer.sign_hash_sync(hash)?.as_bytes().to_vec())
    }
}

/// The ambient identity every tracker and decrypt request runs under.
///
/// Passed explicitly rather than read from globals: when either identity
/// field changes the coordinator rebuilds its trackers and drops every
/// cached authorization and resolution tied to the old identity.
#[derive(Clone)]
pub struct SessionContext {
    pub chain_id: ChainId,
    pub owner: Address,
    pub wallet: SessionWallet,
}

impl SessionContext {
    pub fn new(chain_id: ChainId, wallet: SessionWallet) -> Self {
        Self {
            chain_id,
            owner: wallet.address(),
            wallet,
        }
    }

    /// The fields a cached authorization or resolution is scoped to.
    pub fn identity(&self) -> (ChainId, Address) {
        (self.chain_id, self.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CHAIN_ID: u64 = 1337;
    const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_wallet_from_mnemonic() {
        let wallet = SessionWallet::from_mnemonic(TEST_MNEMONIC, Some(TEST_CHAIN_ID)).unwrap();
        assert!(wallet.address() != Address::ZERO);
    }

    #[test]
    fn test_random_wallets_are_distinct() {
        let a = SessionWallet::random(Some(TEST_CHAIN_ID)).unwrap();
        let b = SessionWallet::random(Some(TEST_CHAIN_ID)).unwrap();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn test_sign_hash() {
        let wallet = SessionWallet::random(Some(TEST_CHAIN_ID)).unwrap();
        let signature = wallet.sign_hash(&B256::repeat_byte(0x42)).unwrap();
        assert!(!signature.is_empty());
    }

    #[test]
    fn test_session_identity() {
        let wallet = SessionWallet::from_mnemonic(TEST_MNEMONIC, Some(TEST_CHAIN_ID)).unwrap();
        let owner = wallet.address();
        let session = SessionContext::new(TEST_CHAIN_ID, wallet);
        assert_eq!(session.identity(), (TEST_CHAIN_ID, owner));
    }
}
