use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque reference to the ciphertext backing an encrypted balance.
///
/// A handle identifies "the current encrypted value of balance B for owner O
/// in contract C at this moment". It is not secret, but it is only meaningful
/// under the (chain id, contract address) pair it was fetched from. The
/// all-zero handle is what a confidential token returns for an account that
/// never held a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CiphertextHandle(B256);

impl CiphertextHandle {
    pub const UNINITIALIZED: Self = Self(B256::ZERO);

    pub fn new(raw: B256) -> Self {
        Self(raw)
    }

    /// False for the zero handle, which the chain returns for accounts that
    /// never interacted with the contract.
    pub fn is_initialized(&self) -> bool {
        self.0 != B256::ZERO
    }

    pub fn as_b256(&self) -> &B256 {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }
}

impl From<B256> for CiphertextHandle {
    fn from(raw: B256) -> Self {
        Self(raw)
    }
}

impl From<CiphertextHandle> for B256 {
    fn from(handle: CiphertextHandle) -> Self {
        handle.0
    }
}

impl FromStr for CiphertextHandle {
    type Err = HandleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s)
            .map(Self)
            .map_err(|e| HandleParseError(e.to_string()))
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid ciphertext handle: {0}")]
pub struct HandleParseError(String);
