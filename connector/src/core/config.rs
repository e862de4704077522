use crate::error::{Error, Result};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, str::FromStr};

/// Default confidential-balance poll interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Default validity window of a decryption authorization in days
pub const DEFAULT_AUTHORIZATION_VALIDITY_DAYS: u64 = 10;

/// Configuration for the shield connector
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Chain RPC endpoint
    pub rpc_url: String,
    /// FHE relayer endpoint
    pub relayer_url: String,
    /// Chain ID
    pub chain_id: u64,
    /// Mnemonic phrase for the session wallet
    pub mnemonic: String,
    /// Contract verifying EIP-712 decryption authorizations
    pub decryption_verifier_address: String,
    /// Confidential-balance poll interval in seconds
    pub poll_interval_secs: Option<u64>,
    /// Validity window of a decryption authorization in days
    pub authorization_validity_days: Option<u64>,
    /// Channel size for event processing
    pub channel_size: Option<usize>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        if config.rpc_url.is_empty() {
            return Err(Error::Config("RPC URL must not be empty".into()));
        }
        if config.relayer_url.is_empty() {
            return Err(Error::Config("Relayer URL must not be empty".into()));
        }

        if !config.decryption_verifier_address.starts_with("0x") {
            return Err(Error::Config(
                "Decryption verifier address must start with 0x".into(),
            ));
        }
        Address::from_str(&config.decryption_verifier_address)
            .map_err(|e| Error::Config(format!("Invalid decryption verifier address: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get the decryption verifier as an Address
    pub fn get_decryption_verifier_address(&self) -> Result<Address> {
        Address::from_str(&self.decryption_verifier_address)
            .map_err(|e| Error::Config(format!("Invalid decryption verifier address: {}", e)))
    }

    pub fn poll_interval_secs(&self) -> u64 {
        self.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
    }

    pub fn authorization_validity_days(&self) -> u64 {
        self.authorization_validity_days
            .unwrap_or(DEFAULT_AUTHORIZATION_VALIDITY_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn test_config() -> Config {
        Config {
            rpc_url: "http://localhost:8545".to_string(),
            relayer_url: "http://localhost:3001".to_string(),
            chain_id: 11155111,
            mnemonic: "test test test test test test test test test test test junk".to_string(),
            decryption_verifier_address: "0x0000000000000000000000000000000000000000".to_string(),
            poll_interval_secs: Some(5),
            authorization_validity_days: Some(10),
            channel_size: Some(100),
        }
    }

    #[test]
    fn test_load_valid_config() {
        let config = test_config();

        let temp_file = NamedTempFile::new().unwrap();
        config.to_file(temp_file.path()).unwrap();

        let loaded_config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.rpc_url, loaded_config.rpc_url);
        assert_eq!(config.relayer_url, loaded_config.relayer_url);
        assert_eq!(config.chain_id, loaded_config.chain_id);
        assert_eq!(config.mnemonic, loaded_config.mnemonic);
        assert_eq!(
            config.decryption_verifier_address,
            loaded_config.decryption_verifier_address
        );
        assert_eq!(config.poll_interval_secs, loaded_config.poll_interval_secs);
        assert_eq!(config.channel_size, loaded_config.channel_size);
    }

    #[test]
    fn test_invalid_address() {
        let mut config = test_config();
        config.decryption_verifier_address = "0x0000".to_string();

        let temp_file = NamedTempFile::new().unwrap();
        config.to_file(temp_file.path()).unwrap();

        assert!(Config::from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_defaults() {
        let mut config = test_config();
        config.poll_interval_secs = None;
        config.authorization_validity_days = None;
        assert_eq!(config.poll_interval_secs(), DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(
            config.authorization_validity_days(),
            DEFAULT_AUTHORIZATION_VALIDITY_DAYS
        );
    }
}
