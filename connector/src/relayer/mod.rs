pub mod client;

pub use client::{DecryptClient, DecryptionResults, EncryptedAmount, RelayerClient};
