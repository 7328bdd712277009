use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::{Result, SentinelError};

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RpcProtocol {
    Http,
    Ws,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainCfg {
    pub rpc_url: String,
    pub protocol: RpcProtocol, // "http" (log filter polling) or "ws" (eth_subscribe)
    pub http_polling_interval_secs: u64, // Polling interval in seconds, for HTTP RPC only
    pub chain_id: Option<u64>, // When set, checked against the node on first use
}

#[derive(Debug, Deserialize, Clone)]
pub struct SentinelCfg {
    pub name: String,
    pub address: String,
    pub abi_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenerCfg {
    pub event: String,
    pub from_block: Option<u64>, // Replay past alerts starting from this block before going live
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppCfg {
    pub chain: ChainCfg,
    pub sentinel: SentinelCfg,
    pub listener: ListenerCfg,
}

impl AppCfg {
    /// Load config from a YAML file, then apply `SENTINEL__<SECTION>__<KEY>` env overrides
    pub fn load(path: &str) -> Result<Self> {
        let builder = with_defaults()?
            .add_source(File::new(path, FileFormat::Yaml))
            .add_source(Environment::with_prefix("SENTINEL").separator("__").try_parsing(true));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Load config from YAML text, without environment overrides
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = with_defaults()?
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.chain.rpc_url.trim().is_empty() {
            return Err(SentinelError::Configuration(
                "chain.rpc_url must not be empty".to_string(),
            ));
        }
        if self.chain.http_polling_interval_secs == 0 {
            return Err(SentinelError::Configuration(
                "chain.http_polling_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.listener.event.trim().is_empty() {
            return Err(SentinelError::Configuration(
                "listener.event must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn with_defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(config::Config::builder()
        .set_default("chain.protocol", "http")?
        .set_default("chain.http_polling_interval_secs", 4)?
        .set_default("sentinel.name", "NFTWashTradeSentinel")?
        .set_default("listener.event", "alert")?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
chain:
  rpc_url: "http://localhost:8545"
sentinel:
  address: "0x5FbDB2315678afecb367f032d93F642f64180aa3"
  abi_path: "./abi/NFTWashTradeSentinel.json"
"#;

    #[test]
    fn test_defaults_applied() {
        let cfg = AppCfg::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(cfg.chain.protocol, RpcProtocol::Http);
        assert_eq!(cfg.chain.http_polling_interval_secs, 4);
        assert_eq!(cfg.chain.chain_id, None);
        assert_eq!(cfg.sentinel.name, "NFTWashTradeSentinel");
        assert_eq!(cfg.listener.event, "alert");
        assert_eq!(cfg.listener.from_block, None);
    }

    #[test]
    fn test_ws_protocol_and_replay() {
        let yaml = r#"
chain:
  rpc_url: "ws://localhost:8546"
  protocol: "ws"
  chain_id: 31337
sentinel:
  address: "0x5FbDB2315678afecb367f032d93F642f64180aa3"
  abi_path: "./abi/NFTWashTradeSentinel.json"
listener:
  from_block: 12
"#;
        let cfg = AppCfg::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.chain.protocol, RpcProtocol::Ws);
        assert_eq!(cfg.chain.chain_id, Some(31337));
        assert_eq!(cfg.listener.from_block, Some(12));
    }

    #[test]
    fn test_zero_polling_interval_rejected() {
        let yaml = MINIMAL.replace(
            "rpc_url: \"http://localhost:8545\"",
            "rpc_url: \"http://localhost:8545\"\n  http_polling_interval_secs: 0",
        );
        let err = AppCfg::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, SentinelError::Configuration(_)));
    }

    #[test]
    fn test_missing_sentinel_section_rejected() {
        let yaml = "chain:\n  rpc_url: \"http://localhost:8545\"\n";
        assert!(AppCfg::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_load_file_with_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        // only this test reads SENTINEL__* variables
        unsafe {
            std::env::set_var("SENTINEL__CHAIN__RPC_URL", "ws://node.internal:8546");
            std::env::set_var("SENTINEL__LISTENER__FROM_BLOCK", "42");
        }
        let loaded = AppCfg::load(file.path().to_str().unwrap());
        unsafe {
            std::env::remove_var("SENTINEL__CHAIN__RPC_URL");
            std::env::remove_var("SENTINEL__LISTENER__FROM_BLOCK");
        }

        let cfg = loaded.unwrap();
        assert_eq!(cfg.chain.rpc_url, "ws://node.internal:8546");
        assert_eq!(cfg.listener.from_block, Some(42));
        assert_eq!(cfg.sentinel.address, "0x5FbDB2315678afecb367f032d93F642f64180aa3");
        assert_eq!(cfg.chain.http_polling_interval_secs, 4);
    }

    #[test]
    fn test_load_missing_file_rejected() {
        let err = AppCfg::load("./does-not-exist/sentinel.yaml").unwrap_err();
        assert!(matches!(err, SentinelError::Configuration(_)));
    }
}
