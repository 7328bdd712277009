//! Monitor client, sentinel handles and alert subscriptions

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use alloy::rpc::types::{Filter, Log as RpcLog};
use alloy_json_abi::Event;
use alloy_primitives::B256;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::abi::{ContractAbi, ContractDescriptor};
use crate::error::{Result, SentinelError};
use crate::event_decoder::EventDecoder;
use crate::provider::LogTransport;
use crate::types::AlertPayload;

/// Decoded alerts in arrival order. `Err` items are non-fatal.
pub type AlertStream = BoxStream<'static, Result<AlertPayload>>;

pub struct MonitorOptions {
    pub provider: Arc<dyn LogTransport>,
}

#[derive(Clone)]
pub struct MonitorClient {
    provider: Arc<dyn LogTransport>,
}

impl MonitorClient {
    pub fn new(options: MonitorOptions) -> Self {
        Self {
            provider: options.provider,
        }
    }

    /// Bind a sentinel to a deployed contract.
    /// Fails fast on a malformed ABI or address, without network I/O.
    pub fn sentinel(&self, descriptor: &ContractDescriptor) -> Result<Sentinel> {
        let contract = ContractAbi::parse(descriptor)?;
        info!(
            "Sentinel '{}' bound to {:#x} ({} events in ABI)",
            contract.name,
            contract.address,
            contract.abi.events().count()
        );

        Ok(Sentinel {
            decoder: Arc::new(EventDecoder::new(&contract.abi)),
            contract: Arc::new(contract),
            provider: Arc::clone(&self.provider),
            options: SubscribeOptions::default(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    /// Replay logs from this block up to the head before live delivery
    pub from_block: Option<u64>,
}

pub struct Sentinel {
    contract: Arc<ContractAbi>,
    decoder: Arc<EventDecoder>,
    provider: Arc<dyn LogTransport>,
    options: SubscribeOptions,
}

impl Sentinel {
    pub fn with_options(mut self, options: SubscribeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn contract(&self) -> &ContractAbi {
        &self.contract
    }

    fn resolve_event(&self, event_name: &str) -> Result<Event> {
        self.contract.find_event(event_name).cloned().ok_or_else(|| {
            SentinelError::Configuration(format!(
                "Event '{}' not found in ABI of '{}'",
                event_name, self.contract.name
            ))
        })
    }

    fn filter(&self, event: &Event) -> Filter {
        Filter::new()
            .address(self.contract.address)
            .event_signature(event.selector())
    }

    /// Stream of decoded payloads for `event_name`, historical replay first when configured
    ///
    /// The live subscription is opened before the replay query, so logs mined in between
    /// are seen by both; live copies of replayed logs are dropped.
    pub async fn subscribe(&self, event_name: &str) -> Result<AlertStream> {
        let event = self.resolve_event(event_name)?;
        let filter = self.filter(&event);

        let live = self.provider.subscribe_logs(&filter).await?;
        info!("Subscribed to '{}' events of {:#x}", event.name, self.contract.address);

        let history = match self.options.from_block {
            Some(from_block) => {
                let logs = self.provider.fetch_logs(&filter.clone().from_block(from_block)).await?;
                info!(
                    "Replaying {} past '{}' logs from block {}",
                    logs.len(),
                    event.name,
                    from_block
                );
                logs
            }
            None => Vec::new(),
        };

        let replayed: HashSet<(B256, u64)> = history.iter().filter_map(log_key).collect();
        let live = live.filter(move |item| {
            let seen = match item {
                Ok(log) => log_key(log).is_some_and(|key| replayed.contains(&key)),
                Err(_) => false,
            };
            if seen {
                debug!("Dropping live copy of a replayed log");
            }
            future::ready(!seen)
        });

        let decoder = Arc::clone(&self.decoder);
        let contract_name = self.contract.name.clone();
        let selector = event.selector();

        let alerts = stream::iter(history.into_iter().map(Ok))
            .chain(live)
            .map(move |item| {
                let log = item?;
                if log.removed {
                    return Err(SentinelError::Decoding(format!(
                        "Log {:?} in block {:?} was removed by a reorg",
                        log.log_index, log.block_number
                    )));
                }
                if log.topics().first() != Some(&selector) {
                    return Err(SentinelError::Decoding(format!(
                        "Unexpected event topic from {:#x}",
                        log.address()
                    )));
                }
                let parsed = decoder.decode_log(&log.inner)?;
                debug!("Decoded alert: {}", parsed.format_params());
                Ok(AlertPayload::from_log(&contract_name, &log, &parsed))
            })
            .boxed();

        Ok(alerts)
    }

    /// Register one handler for `event_name`. Returns once the subscription is open.
    pub async fn on<F>(&self, event_name: &str, handler: F) -> Result<Subscription>
    where
        F: FnMut(AlertPayload) + Send + 'static,
    {
        let stream = self.subscribe(event_name).await?;

        Ok(Subscription {
            label: format!("{}:{}", self.contract.name, event_name),
            stream,
            handler: Box::new(handler),
        })
    }
}

/// An open alert subscription with its single handler
pub struct Subscription {
    label: String,
    stream: AlertStream,
    handler: Box<dyn FnMut(AlertPayload) + Send>,
}

impl Subscription {
    /// Deliver alerts one at a time until `shutdown` resolves. Returns the number delivered.
    ///
    /// Stream faults are logged and skipped. If the transport closes the stream the
    /// subscription stays idle until shutdown; it is never re-established here.
    pub async fn run<S>(mut self, shutdown: S) -> u64
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut delivered = 0u64;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down '{}' after {} alerts", self.label, delivered);
                    return delivered;
                }
                item = self.stream.next() => match item {
                    Some(Ok(payload)) => {
                        delivered += 1;
                        (self.handler)(payload);
                    }
                    Some(Err(e)) => {
                        warn!("Alert subscription '{}' error: {}", self.label, e);
                    }
                    None => {
                        error!(
                            "Alert stream '{}' closed by transport, idle until shutdown",
                            self.label
                        );
                        shutdown.await;
                        info!("Shutting down '{}' after {} alerts", self.label, delivered);
                        return delivered;
                    }
                },
            }
        }
    }
}

/// Identity of a mined log, when the node reports one
fn log_key(log: &RpcLog) -> Option<(B256, u64)> {
    Some((log.block_hash?, log.log_index?))
}
