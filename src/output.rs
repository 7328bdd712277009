use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::error::{Result, SentinelError};
use crate::types::AlertPayload;

pub const STARTUP_NOTICE: &str = "Listening for NFT wash trade alerts...";
pub const ALERT_PREFIX: &str = "Wash trade detected!";

/// `<prefix> <compact JSON payload>`, a pure function of the payload
pub fn render_alert(payload: &AlertPayload) -> Result<String> {
    let body =
        serde_json::to_string(payload).map_err(|e| SentinelError::Rendering(e.to_string()))?;
    Ok(format!("{} {}", ALERT_PREFIX, body))
}

/// Line-oriented sink for the listener's observable output
pub struct Console<W> {
    out: Arc<Mutex<W>>,
}

impl<W> Clone for Console<W> {
    fn clone(&self) -> Self {
        Self { out: Arc::clone(&self.out) }
    }
}

impl Console<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    pub fn startup_notice(&self) {
        self.write_line(STARTUP_NOTICE);
    }

    /// Render failures are logged and swallowed
    pub fn alert(&self, payload: &AlertPayload) {
        match render_alert(payload) {
            Ok(line) => self.write_line(&line),
            Err(e) => warn!("Failed to render alert from {}: {}", payload.contract_name, e),
        }
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            warn!("Failed to write output line: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    impl Console<Vec<u8>> {
        fn lines(&self) -> Vec<String> {
            let out = self.out.lock().unwrap();
            String::from_utf8_lossy(&out).lines().map(str::to_string).collect()
        }
    }

    fn payload(block_number: u64) -> AlertPayload {
        AlertPayload {
            contract_name: "NFTWashTradeSentinel".to_string(),
            contract_address: "0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string(),
            block_number: Some(block_number),
            block_hash: None,
            block_time: None,
            transaction_hash: None,
            log_index: Some(0),
            event_name: "Alert".to_string(),
            event_signature: "0x00".to_string(),
            event_data: json!({"tokenId": "7", "reason": "self-trade loop"}),
        }
    }

    #[test]
    fn test_render_is_single_line_with_prefix() {
        let line = render_alert(&payload(5)).unwrap();
        assert!(line.starts_with("Wash trade detected! {"));
        assert!(!line.contains('\n'));
        assert!(line.contains("\"reason\":\"self-trade loop\""));
    }

    #[test]
    fn test_render_is_idempotent() {
        let p = payload(9);
        assert_eq!(render_alert(&p).unwrap(), render_alert(&p).unwrap());

        let console = Console::new(Vec::new());
        console.alert(&p);
        console.alert(&p);
        let lines = console.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], lines[1]);
    }

    #[test]
    fn test_console_clones_share_sink() {
        let console = Console::new(Vec::new());
        let handler_side = console.clone();
        console.startup_notice();
        handler_side.alert(&payload(1));
        let lines = console.lines();
        assert_eq!(lines[0], STARTUP_NOTICE);
        assert!(lines[1].starts_with(ALERT_PREFIX));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let console = Console::new(BrokenPipe);
        console.startup_notice();
        console.alert(&payload(2));
    }
}
