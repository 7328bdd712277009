//! NFT wash trade alert listener
//!
//! Connects to an Ethereum JSON-RPC endpoint, binds a sentinel handle to a deployed
//! monitoring contract and reports every `alert` event it emits.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wash_trade_sentinel::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connector = RpcConnector::new(ConnectorCfg {
//!         rpc_url: "http://localhost:8545".to_string(),
//!         protocol: RpcProtocol::Http,
//!         poll_interval: std::time::Duration::from_secs(4),
//!         chain_id: None,
//!     });
//!     let monitor = MonitorClient::new(MonitorOptions { provider: Arc::new(connector) });
//!
//!     let abi = std::fs::read_to_string("abi/NFTWashTradeSentinel.json")
//!         .map_err(|e| SentinelError::AbiLoad(e.to_string()))?;
//!     let sentinel = monitor.sentinel(&ContractDescriptor::new(
//!         "NFTWashTradeSentinel",
//!         abi,
//!         "0x5FbDB2315678afecb367f032d93F642f64180aa3",
//!     ))?;
//!
//!     let console = Console::stdout();
//!     let alerts = console.clone();
//!     let subscription = sentinel.on("alert", move |payload| alerts.alert(&payload)).await?;
//!     console.startup_notice();
//!
//!     subscription.run(std::future::pending()).await;
//!     Ok(())
//! }
//! ```

pub mod abi;
pub mod config;
pub mod error;
pub mod event_decoder;
pub mod monitor;
pub mod output;
pub mod provider;
pub mod types;

pub use abi::{ContractAbi, ContractDescriptor};
pub use error::{Result, SentinelError};
pub use monitor::{
    AlertStream, MonitorClient, MonitorOptions, Sentinel, SubscribeOptions, Subscription,
};
pub use output::Console;
pub use provider::{ConnectorCfg, LogStream, LogTransport, RpcConnector};
pub use types::AlertPayload;

pub mod prelude {
    pub use crate::abi::ContractDescriptor;
    pub use crate::config::{AppCfg, RpcProtocol};
    pub use crate::error::{Result, SentinelError};
    pub use crate::monitor::{MonitorClient, MonitorOptions, SubscribeOptions};
    pub use crate::output::Console;
    pub use crate::provider::{ConnectorCfg, LogTransport, RpcConnector};
    pub use crate::types::AlertPayload;
}
