use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Indexer configuration. All fields have working defaults so a config
/// file only needs to override what it cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Directory of the local replica database
    pub db_path: PathBuf,
    /// Node RPC endpoint the transport layer connects to
    pub rpc_url: String,
    /// Capacity of the block existence cache
    pub block_cache_size: usize,
    /// Capacity of the DAA window entry cache
    pub daa_window_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("datadir/index"),
            rpc_url: "ws://127.0.0.1:18110".to_string(),
            block_cache_size: 100_000,
            daa_window_cache_size: 300_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"rpcUrl": "ws://node:18110"}"#).unwrap();
        assert_eq!(config.rpc_url, "ws://node:18110");
        assert_eq!(config.block_cache_size, Config::default().block_cache_size);
    }
}
