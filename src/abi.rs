use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use alloy_json_abi::{Event, JsonAbi};
use alloy_primitives::Address;
use serde_json::Value;

use crate::config::SentinelCfg;
use crate::error::{Result, SentinelError};

/// Which deployed contract to monitor: raw ABI JSON text plus its address
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    pub name: String,
    pub abi: String,
    pub address: String,
}

impl ContractDescriptor {
    pub fn new(
        name: impl Into<String>,
        abi: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            abi: abi.into(),
            address: address.into(),
        }
    }

    pub fn from_cfg(cfg: &SentinelCfg) -> Result<Self> {
        let path = PathBuf::from(&cfg.abi_path);
        let abi = fs::read_to_string(&path)
            .map_err(|e| SentinelError::AbiLoad(format!("{}: {}", path.display(), e)))?;

        Ok(Self::new(cfg.name.as_str(), abi, cfg.address.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct ContractAbi {
    pub name: String,
    pub address: Address,
    pub abi: JsonAbi,
}

impl ContractAbi {
    pub fn parse(descriptor: &ContractDescriptor) -> Result<Self> {
        let address = parse_address(&descriptor.address)?;

        // Preprocess the JSON to unwrap artifacts and add missing anonymous fields
        let preprocessed_json = preprocess_abi_json(&descriptor.abi)?;
        let abi: JsonAbi = serde_json::from_value(preprocessed_json).map_err(|e| {
            SentinelError::Configuration(format!("Invalid ABI for '{}': {}", descriptor.name, e))
        })?;

        Ok(Self {
            name: descriptor.name.clone(),
            address,
            abi,
        })
    }

    /// Find an event by exact name, falling back to an ASCII case-insensitive match
    pub fn find_event(&self, name: &str) -> Option<&Event> {
        self.abi
            .events()
            .find(|e| e.name == name)
            .or_else(|| self.abi.events().find(|e| e.name.eq_ignore_ascii_case(name)))
    }
}

pub fn parse_address(address_hex: &str) -> Result<Address> {
    let trimmed = address_hex.trim();
    if !trimmed.starts_with("0x") && !trimmed.starts_with("0X") {
        return Err(SentinelError::Configuration(format!(
            "Invalid contract address '{}': missing 0x prefix",
            address_hex
        )));
    }
    Address::from_str(trimmed).map_err(|e| {
        SentinelError::Configuration(format!("Invalid contract address '{}': {}", address_hex, e))
    })
}

/// Accepts a bare ABI array or a compiled artifact carrying an `abi` field
pub fn preprocess_abi_json(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| SentinelError::Configuration(format!("ABI is not valid JSON: {}", e)))?;

    let mut entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut artifact) => match artifact.remove("abi") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(SentinelError::Configuration(
                    "ABI artifact has no 'abi' array".to_string(),
                ));
            }
        },
        _ => {
            return Err(SentinelError::Configuration(
                "ABI must be a JSON array or an artifact object".to_string(),
            ));
        }
    };

    for entry in entries.iter_mut() {
        if let Value::Object(item) = entry {
            let is_event = item.get("type").and_then(Value::as_str) == Some("event");
            if is_event && !item.contains_key("anonymous") {
                item.insert("anonymous".to_string(), Value::Bool(false));
            }
        }
    }

    Ok(Value::Array(entries))
}
