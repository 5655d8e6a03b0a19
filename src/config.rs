//! Configuration.
//!
//! Network endpoint, chain selection, and the API keys for off-chain
//! co-signing services. Everything is loaded once at the boundary (env vars
//! or a TOML file) and injected into the router's constructor; nothing in
//! the build logic reads the environment ambiently.

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::addresses::AddressBook;
use crate::types::FillOptions;

/// Upper bound on swap slack: more than 10% overpayment is almost certainly
/// a caller mistake, not slippage protection.
const MAX_SWAP_SLACK_BPS: u64 = 1_000;

/// Main configuration for the fill builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    /// RPC URL (Alchemy/Infura recommended)
    pub rpc_url: String,

    /// Chain ID (1 = Ethereum Mainnet)
    pub chain_id: u64,

    // ========== Off-chain Services ==========
    /// X2Y2 order-signing API key; X2Y2 fills are impossible without it
    pub x2y2_api_key: Option<String>,

    /// Custody-release API key for cb-held ZeroExV4 orders
    pub custody_api_key: Option<String>,

    // ========== Build Defaults ==========
    /// Slack on top of quoted swap inputs, in basis points
    pub swap_slack_bps: u64,

    /// Default best-effort policy for module calls
    pub partial: bool,

    /// Default skip-on-error policy for fallible order generation
    pub skip_errors: bool,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| "https://eth.llamarpc.com".to_string()),
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            x2y2_api_key: env::var("X2Y2_API_KEY").ok(),
            custody_api_key: env::var("CUSTODY_API_KEY").ok(),
            swap_slack_bps: env::var("SWAP_SLACK_BPS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
            partial: env::var("PARTIAL_FILLS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            skip_errors: env::var("SKIP_ERRORS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration before wiring up a router
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() || self.rpc_url.contains("YOUR_API_KEY") {
            return Err(eyre::eyre!(
                "Invalid RPC_URL - please set a valid Alchemy/Infura URL"
            ));
        }

        if AddressBook::for_chain(self.chain_id).is_none() {
            return Err(eyre::eyre!(
                "No contract registry for chain {} (mainnet only)",
                self.chain_id
            ));
        }

        if self.swap_slack_bps > MAX_SWAP_SLACK_BPS {
            return Err(eyre::eyre!(
                "SWAP_SLACK_BPS > {} ({}% overpayment) makes no sense",
                MAX_SWAP_SLACK_BPS,
                self.swap_slack_bps / 100
            ));
        }

        Ok(())
    }

    /// Fill options seeded from the configured defaults.
    pub fn fill_options(&self) -> FillOptions {
        FillOptions {
            partial: self.partial,
            skip_errors: self.skip_errors,
            swap_slack_bps: self.swap_slack_bps,
            ..Default::default()
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              THE SWEEPER - CONFIGURATION                   ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Chain ID:          {:^40} ║", self.chain_id);
        println!("║ Swap Slack:        {:>36} bps ║", self.swap_slack_bps);
        println!("║ Partial Fills:     {:^40} ║", self.partial);
        println!("║ Skip Errors:       {:^40} ║", self.skip_errors);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!(
            "║ X2Y2 API Key:      {:^40} ║",
            if self.x2y2_api_key.is_some() { "✓ Configured" } else { "✗ Not Set" }
        );
        println!(
            "║ Custody API Key:   {:^40} ║",
            if self.custody_api_key.is_some() { "✓ Configured" } else { "✗ Not Set" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "https://eth.llamarpc.com".to_string(),
            chain_id: 1,
            x2y2_api_key: None,
            custody_api_key: None,
            swap_slack_bps: 50,
            partial: false,
            skip_errors: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fill_options().swap_slack_bps, 50);
    }

    #[test]
    fn test_unsupported_chain_fails_validation() {
        let config = Config {
            chain_id: 137,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_excessive_slack_fails_validation() {
        let config = Config {
            swap_slack_bps: 5_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config {
            x2y2_api_key: Some("key".to_string()),
            ..Default::default()
        };
        let encoded = toml::to_string_pretty(&config).unwrap();
        let decoded: Config = toml::from_str(&encoded).unwrap();
        assert_eq!(decoded.chain_id, 1);
        assert_eq!(decoded.x2y2_api_key.as_deref(), Some("key"));
    }
}
