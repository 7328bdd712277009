//! RPC connector: lazily built alloy providers behind the `LogTransport` capability

use std::str::FromStr;
use std::time::Duration;

use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::{Filter, Log as RpcLog};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{ChainCfg, RpcProtocol};
use crate::error::{Result, SentinelError};

/// Non-restartable stream of logs.
/// An `Err` item is a transport fault; stream end means the transport is gone.
pub type LogStream = BoxStream<'static, Result<RpcLog>>;

/// What the monitor client needs from a blockchain node
#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Open a live subscription for logs matching `filter`
    async fn subscribe_logs(&self, filter: &Filter) -> Result<LogStream>;

    /// Fetch past logs matching `filter` (`eth_getLogs`)
    async fn fetch_logs(&self, filter: &Filter) -> Result<Vec<RpcLog>>;
}

#[derive(Debug, Clone)]
pub struct ConnectorCfg {
    pub rpc_url: String,
    pub protocol: RpcProtocol,
    pub poll_interval: Duration,
    pub chain_id: Option<u64>,
}

impl From<&ChainCfg> for ConnectorCfg {
    fn from(chain: &ChainCfg) -> Self {
        Self {
            rpc_url: chain.rpc_url.clone(),
            protocol: chain.protocol.clone(),
            poll_interval: Duration::from_secs(chain.http_polling_interval_secs),
            chain_id: chain.chain_id,
        }
    }
}

/// Connection handle to an RPC endpoint. No I/O happens until the first subscription or fetch.
pub struct RpcConnector {
    config: ConnectorCfg,
    provider: OnceCell<DynProvider>,
}

impl RpcConnector {
    pub fn new(config: ConnectorCfg) -> Self {
        Self {
            config,
            provider: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ConnectorCfg {
        &self.config
    }

    /// Provider built on first use, then held for the connector's lifetime
    async fn provider(&self) -> Result<&DynProvider> {
        self.provider.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<DynProvider> {
        let provider = match self.config.protocol {
            RpcProtocol::Ws => {
                let ws = WsConnect::new(self.config.rpc_url.clone());
                ProviderBuilder::new()
                    .connect_ws(ws)
                    .await
                    .map_err(|e| {
                        SentinelError::Connectivity(format!(
                            "WS connect to {} failed: {}",
                            self.config.rpc_url, e
                        ))
                    })?
                    .erased()
            }
            RpcProtocol::Http => {
                let url = reqwest::Url::from_str(&self.config.rpc_url).map_err(|e| {
                    SentinelError::Connectivity(format!(
                        "Invalid RPC URL {}: {}",
                        self.config.rpc_url, e
                    ))
                })?;
                ProviderBuilder::new().connect_http(url).erased()
            }
        };
        info!(
            "Connecting to RPC endpoint: {} ({:?})",
            self.config.rpc_url, self.config.protocol
        );

        if let Some(expected) = self.config.chain_id {
            let chain_id = provider
                .get_chain_id()
                .await
                .map_err(|e| {
                    SentinelError::Connectivity(format!("Failed to get chain ID: {}", e))
                })?;
            if chain_id != expected {
                return Err(SentinelError::Connectivity(format!(
                    "Chain ID mismatch: expected {}, got {}",
                    expected, chain_id
                )));
            }
            info!("Chain ID: {}", chain_id);
        }

        Ok(provider)
    }
}

#[async_trait]
impl LogTransport for RpcConnector {
    async fn subscribe_logs(&self, filter: &Filter) -> Result<LogStream> {
        let provider = self.provider().await?;

        match self.config.protocol {
            RpcProtocol::Ws => {
                let sub = provider
                    .subscribe_logs(filter)
                    .await
                    .map_err(|e| {
                        SentinelError::Connectivity(format!("Log subscription failed: {}", e))
                    })?;
                debug!("Subscribed to logs via eth_subscribe");
                Ok(sub.into_stream().map(Ok).boxed())
            }
            RpcProtocol::Http => {
                let poller = provider
                    .watch_logs(filter)
                    .await
                    .map_err(|e| {
                        SentinelError::Connectivity(format!("Log filter install failed: {}", e))
                    })?;
                debug!(
                    "Watching logs via HTTP polling (interval: {:?})",
                    self.config.poll_interval
                );
                Ok(poller
                    .with_poll_interval(self.config.poll_interval)
                    .into_stream()
                    .flat_map(stream::iter)
                    .map(Ok)
                    .boxed())
            }
        }
    }

    async fn fetch_logs(&self, filter: &Filter) -> Result<Vec<RpcLog>> {
        let provider = self.provider().await?;
        provider
            .get_logs(filter)
            .await
            .map_err(|e| SentinelError::Connectivity(format!("Failed to fetch logs: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(rpc_url: &str) -> ConnectorCfg {
        ConnectorCfg {
            rpc_url: rpc_url.to_string(),
            protocol: RpcProtocol::Http,
            poll_interval: Duration::from_secs(4),
            chain_id: None,
        }
    }

    #[test]
    fn test_connector_from_chain_cfg() {
        let chain = ChainCfg {
            rpc_url: "ws://localhost:8546".to_string(),
            protocol: RpcProtocol::Ws,
            http_polling_interval_secs: 2,
            chain_id: Some(31337),
        };
        let connector_cfg = ConnectorCfg::from(&chain);
        assert_eq!(connector_cfg.poll_interval, Duration::from_secs(2));
        assert_eq!(connector_cfg.protocol, RpcProtocol::Ws);
        assert_eq!(connector_cfg.chain_id, Some(31337));
    }

    #[tokio::test]
    async fn test_bad_url_surfaces_on_first_use() {
        // Construction accepts anything
        let connector = RpcConnector::new(cfg("definitely not a url"));
        assert_eq!(connector.config().rpc_url, "definitely not a url");

        let err = connector.fetch_logs(&Filter::new()).await.unwrap_err();
        assert!(matches!(err, SentinelError::Connectivity(_)));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_connectivity_error() {
        let connector = RpcConnector::new(cfg("http://127.0.0.1:1"));
        let err = connector.fetch_logs(&Filter::new()).await.unwrap_err();
        assert!(matches!(err, SentinelError::Connectivity(_)));
    }
}
