use serde::{Deserialize, Serialize};

use crate::sync::types::BlockHeight;

/// Blocks a miner payout or claim output waits before it can be spent.
pub const DEFAULT_MATURITY_DELAY: BlockHeight = 144;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub maturity_delay: BlockHeight,
    pub defrag: DefragConfig,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            maturity_delay: DEFAULT_MATURITY_DELAY,
            defrag: DefragConfig::default(),
        }
    }
}

/// When and how the wallet consolidates its coin outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefragConfig {
    /// Minimum number of spendable outputs before a defrag is planned.
    pub threshold: usize,
    /// Number of outputs merged by one defrag.
    pub batch_size: usize,
    /// Number of largest outputs left untouched.
    pub start_index: usize,
}

impl Default for DefragConfig {
    fn default() -> Self {
        Self {
            threshold: 50,
            batch_size: 35,
            start_index: 10,
        }
    }
}

impl WalletConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: WalletConfig =
            serde_json::from_str(r#"{ "defrag": { "batch_size": 5 } }"#).unwrap();

        assert_eq!(config.maturity_delay, DEFAULT_MATURITY_DELAY);
        assert_eq!(config.defrag.batch_size, 5);
        assert_eq!(config.defrag.threshold, 50);
    }
}
