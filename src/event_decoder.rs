use std::collections::HashMap;

use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::{Event, EventParam, JsonAbi};
use alloy_primitives::{B256, Bytes, Log};
use serde_json::Value;

use crate::error::{Result, SentinelError};

#[derive(Debug, Clone)]
pub struct ParsedEventParam {
    pub name: String,
    pub param_type: String,
    pub value: DynSolValue,
    pub indexed: bool,
}

#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub name: String,
    pub signature: B256,
    pub params: Vec<ParsedEventParam>,
}

pub struct EventDecoder {
    events: HashMap<B256, Event>,
}

impl EventDecoder {
    /// Create a new EventDecoder from a JSON ABI
    pub fn new(abi: &JsonAbi) -> Self {
        let events = abi
            .events()
            .map(|event| (event.selector(), event.clone()))
            .collect();

        Self { events }
    }

    /// Decode a log entry into a ParsedEvent
    pub fn decode_log(&self, log: &Log) -> Result<ParsedEvent> {
        // Get the event signature from the first topic
        let Some(event_signature) = log.topics().first() else {
            return Err(SentinelError::Decoding("Log has no topics".to_string()));
        };

        let event = self.events.get(event_signature).ok_or_else(|| {
            SentinelError::Decoding(format!(
                "Event signature not found in ABI: {:#x}",
                event_signature
            ))
        })?;

        self.decode_log_with_event(log, event)
    }

    fn decode_log_with_event(&self, log: &Log, event: &Event) -> Result<ParsedEvent> {
        // (declaration index, param), so unnamed inputs keep their position
        let mut parsed_params: Vec<(usize, ParsedEventParam)> =
            Vec::with_capacity(event.inputs.len());
        let mut topic_index = 1; // Skip the first topic (event signature)

        let (indexed_params, non_indexed_params): (Vec<_>, Vec<_>) =
            event.inputs.iter().enumerate().partition(|(_, p)| p.indexed);

        // Decode indexed parameters from topics
        for (position, param) in &indexed_params {
            let Some(topic) = log.topics().get(topic_index) else {
                return Err(SentinelError::Decoding(format!(
                    "Not enough topics for indexed parameter: {}",
                    param.name
                )));
            };

            parsed_params.push((
                *position,
                ParsedEventParam {
                    name: param.name.clone(),
                    param_type: param.ty.clone(),
                    value: self.decode_indexed_param(param, *topic)?,
                    indexed: true,
                },
            ));

            topic_index += 1;
        }

        // Decode non-indexed parameters from data
        if !non_indexed_params.is_empty() {
            let params: Vec<&EventParam> = non_indexed_params.iter().map(|(_, p)| *p).collect();
            let data_values = self.decode_data_params(&params, &log.data.data)?;

            for ((position, param), value) in non_indexed_params.iter().zip(data_values) {
                parsed_params.push((
                    *position,
                    ParsedEventParam {
                        name: param.name.clone(),
                        param_type: param.ty.clone(),
                        value,
                        indexed: false,
                    },
                ));
            }
        }

        parsed_params.sort_by_key(|(position, _)| *position);

        Ok(ParsedEvent {
            name: event.name.clone(),
            signature: event.selector(),
            params: parsed_params.into_iter().map(|(_, p)| p).collect(),
        })
    }

    fn decode_indexed_param(&self, param: &EventParam, topic: B256) -> Result<DynSolValue> {
        let sol_type = Specifier::<DynSolType>::resolve(param).map_err(|e| {
            SentinelError::Decoding(format!("Unknown type for {}: {}", param.name, e))
        })?;

        // Dynamic types are stored as their keccak256 hash; the original value is unrecoverable
        match &sol_type {
            DynSolType::String
            | DynSolType::Bytes
            | DynSolType::Array(_)
            | DynSolType::FixedArray(..)
            | DynSolType::Tuple(_) => Ok(DynSolValue::FixedBytes(topic, 32)),
            _ => sol_type.abi_decode(topic.as_slice()).map_err(|e| {
                SentinelError::Decoding(format!(
                    "Failed to decode indexed parameter {}: {}",
                    param.name, e
                ))
            }),
        }
    }

    fn decode_data_params(&self, params: &[&EventParam], data: &Bytes) -> Result<Vec<DynSolValue>> {
        let param_types = params
            .iter()
            .map(|p| {
                Specifier::<DynSolType>::resolve(*p).map_err(|e| {
                    SentinelError::Decoding(format!(
                        "Failed to decode non-indexed parameter {} of type {}: {}",
                        p.name, p.ty, e
                    ))
                })
            })
            .collect::<Result<Vec<DynSolType>>>()?;

        let decoded = DynSolType::Tuple(param_types)
            .abi_decode_params(data)
            .map_err(|e| SentinelError::Decoding(format!("Failed to decode log data: {}", e)))?;

        match decoded {
            DynSolValue::Tuple(values) => Ok(values),
            _ => Err(SentinelError::Decoding(
                "Expected tuple from log data decoding".to_string(),
            )),
        }
    }
}

impl ParsedEvent {
    /// Parameters as a JSON object keyed by name (`argN` when unnamed), in declaration order
    pub fn params_json(&self) -> Value {
        let mut params = serde_json::Map::new();
        for (i, param) in self.params.iter().enumerate() {
            let key = if param.name.is_empty() {
                format!("arg{}", i)
            } else {
                param.name.clone()
            };
            params.insert(key, value_to_json(&param.value));
        }
        Value::Object(params)
    }

    pub fn format_params(&self) -> String {
        self.params
            .iter()
            .map(|p| format!("{}: {} = {}", p.name, p.param_type, format_value(&p.value)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Convert DynSolValue to JSON Value for serialization
pub fn value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format!("0x{}", hex::encode(&word[..*size])))
        }
        DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::Address(addr) => Value::String(format!("{:#x}", addr)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(arr) | DynSolValue::FixedArray(arr) | DynSolValue::Tuple(arr) => {
            Value::Array(arr.iter().map(value_to_json).collect())
        }
        _ => Value::String(format!("{:?}", value)),
    }
}

/// Format DynSolValue for human-readable display
fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::Address(addr) => format!("{:#x}", addr),
        DynSolValue::String(s) => format!("\"{}\"", s),
        DynSolValue::Array(arr) | DynSolValue::FixedArray(arr) => {
            let formatted: Vec<String> = arr.iter().map(format_value).collect();
            format!("[{}]", formatted.join(", "))
        }
        DynSolValue::Tuple(tuple) => {
            let formatted: Vec<String> = tuple.iter().map(format_value).collect();
            format!("({})", formatted.join(", "))
        }
        _ => format!("{:?}", value),
    }
}
