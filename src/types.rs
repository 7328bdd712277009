use alloy::rpc::types::Log as RpcLog;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event_decoder::ParsedEvent;

/// One alert observed on-chain for the monitored sentinel contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub contract_name: String,
    pub contract_address: String,
    pub block_number: Option<u64>,
    pub block_hash: Option<String>,
    pub block_time: Option<String>,
    pub transaction_hash: Option<String>,
    pub log_index: Option<u64>,
    pub event_name: String,
    pub event_signature: String,
    pub event_data: Value,
}

impl AlertPayload {
    pub fn from_log(contract_name: &str, log: &RpcLog, event: &ParsedEvent) -> Self {
        let block_time = log
            .block_timestamp
            .and_then(|ts| i64::try_from(ts).ok())
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true));

        Self {
            contract_name: contract_name.to_string(),
            contract_address: format!("{:#x}", log.address()),
            block_number: log.block_number,
            block_hash: log.block_hash.map(|h| format!("{:#x}", h)),
            block_time,
            transaction_hash: log.transaction_hash.map(|h| format!("{:#x}", h)),
            log_index: log.log_index,
            event_name: event.name.clone(),
            event_signature: format!("{:#x}", event.signature),
            event_data: event.params_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn parsed() -> ParsedEvent {
        ParsedEvent {
            name: "Alert".to_string(),
            signature: B256::repeat_byte(0x01),
            params: Vec::new(),
        }
    }

    #[test]
    fn test_block_time_rendered_as_rfc3339() {
        let log = RpcLog {
            block_timestamp: Some(1_700_000_000),
            ..Default::default()
        };
        let payload = AlertPayload::from_log("Sentinel", &log, &parsed());
        assert_eq!(payload.block_time.as_deref(), Some("2023-11-14T22:13:20Z"));
    }

    #[test]
    fn test_out_of_range_block_time_is_omitted() {
        let log = RpcLog {
            block_timestamp: Some(u64::MAX),
            ..Default::default()
        };
        let payload = AlertPayload::from_log("Sentinel", &log, &parsed());
        assert_eq!(payload.block_time, None);
        assert_eq!(payload.event_name, "Alert");
    }
}
