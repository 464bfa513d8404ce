//! Peer configuration.
//!
//! Every field has a default, so a JSON file only needs the values it
//! overrides:
//!
//! ```json
//! { "max_chunk_size": 8192, "logging": { "log_level": "debug" } }
//! ```

use crate::error::{PeerError, Result};
use logging::{LogLevel, Logger};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default maximum payload of one chunk message.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 16 * 1024;
/// Default channel buffer limit before `try_send` reports `Full`.
pub const DEFAULT_MAX_BUFFERED_AMOUNT: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub max_chunk_size: usize,
    pub max_buffered_amount: usize,
    pub negotiation_timeout_ms: u64,
    pub candidate_discovery_timeout_ms: u64,
    pub send_timeout_ms: u64,
    pub receive_idle_timeout_ms: u64,
    /// Address TCP host candidates are gathered on.
    pub bind_address: String,
    /// Label of the negotiated data channel.
    pub data_channel_label: String,
    /// Name handed to the completed-transfer sink.
    pub received_file_name: String,
    pub logging: LoggingConfig,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_buffered_amount: DEFAULT_MAX_BUFFERED_AMOUNT,
            negotiation_timeout_ms: 10_000,
            candidate_discovery_timeout_ms: 5_000,
            send_timeout_ms: 10_000,
            receive_idle_timeout_ms: 30_000,
            bind_address: "127.0.0.1".to_string(),
            data_channel_label: "fileTransfer".to_string(),
            received_file_name: "received-file.bin".to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PeerConfig {
    /// Loads and validates a JSON configuration file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = config_loader::load_json_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates inline JSON; `source_name` only labels errors.
    pub fn from_json(content: &str, source_name: &str) -> Result<Self> {
        let config: Self = config_loader::parse_json(content, source_name)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(PeerError::Config("max_chunk_size must be positive".into()));
        }
        if self.max_buffered_amount < self.max_chunk_size {
            return Err(PeerError::Config(format!(
                "max_buffered_amount ({}) must hold at least one chunk ({})",
                self.max_buffered_amount, self.max_chunk_size
            )));
        }
        let timeouts = [
            ("negotiation_timeout_ms", self.negotiation_timeout_ms),
            ("candidate_discovery_timeout_ms", self.candidate_discovery_timeout_ms),
            ("send_timeout_ms", self.send_timeout_ms),
            ("receive_idle_timeout_ms", self.receive_idle_timeout_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, ms)| *ms == 0) {
            return Err(PeerError::Config(format!("{name} must be positive")));
        }
        if self.bind_address.parse::<std::net::IpAddr>().is_err() {
            return Err(PeerError::Config(format!(
                "bind_address {:?} is not an IP address",
                self.bind_address
            )));
        }
        Ok(())
    }

    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size;
        self
    }

    pub fn with_max_buffered_amount(mut self, amount: usize) -> Self {
        self.max_buffered_amount = amount;
        self
    }

    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_candidate_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.candidate_discovery_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn receive_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_idle_timeout_ms)
    }

    /// Settings consumed by a [`ConnectionNegotiator`](crate::ConnectionNegotiator).
    pub fn negotiation(&self) -> NegotiationConfig {
        NegotiationConfig {
            negotiation_timeout: Duration::from_millis(self.negotiation_timeout_ms),
            candidate_discovery_timeout: Duration::from_millis(self.candidate_discovery_timeout_ms),
            data_channel_label: self.data_channel_label.clone(),
        }
    }

    /// Settings consumed by a [`ChunkedTransferSession`](crate::ChunkedTransferSession).
    pub fn transfer(&self) -> TransferConfig {
        TransferConfig {
            max_chunk_size: self.max_chunk_size,
            send_timeout: Duration::from_millis(self.send_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationConfig {
    /// Upper bound from the first description to `Connected`.
    pub negotiation_timeout: Duration,
    /// Bound on gathering, and on finding a working pair once both descriptions exist.
    pub candidate_discovery_timeout: Duration,
    pub data_channel_label: String,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        PeerConfig::default().negotiation()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    pub max_chunk_size: usize,
    /// Bound on each back-pressure wait.
    pub send_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        PeerConfig::default().transfer()
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_file_path: String,
    pub log_level: String,
    pub enable_console: bool,
    pub enable_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_file_path: "peerlink.log".to_string(),
            log_level: "info".to_string(),
            enable_console: true,
            enable_file: true,
        }
    }
}

impl LoggingConfig {
    /// Builds the root logger described by this configuration.
    pub fn build_logger(&self, component: &str) -> Result<Logger> {
        let level = LogLevel::parse_or_default(&self.log_level);
        if self.enable_file {
            return Ok(Logger::with_component(
                self.log_file_path.clone().into(),
                level,
                Some(component.to_string()),
                self.enable_console,
            )?);
        }
        if self.enable_console {
            return Ok(Logger::console(level).for_component(component));
        }
        Ok(Logger::discard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PeerConfig::default();
        assert_eq!(config.max_chunk_size, 16384);
        assert_eq!(config.max_buffered_amount, 1_048_576);
        assert_eq!(config.negotiation_timeout_ms, 10_000);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PeerConfig::from_json(
            r#"{"max_chunk_size": 1024, "logging": {"log_level": "debug"}}"#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.max_chunk_size, 1024);
        assert_eq!(config.send_timeout_ms, 10_000);
        assert_eq!(config.logging.log_level, "debug");
        assert!(config.logging.enable_file);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = PeerConfig::from_json("{not json", "inline").unwrap_err();
        assert!(matches!(err, PeerError::Config(_)));
    }

    #[test]
    fn test_validation_rejects_zero_chunk() {
        let err = PeerConfig::from_json(r#"{"max_chunk_size": 0}"#, "inline").unwrap_err();
        assert!(err.to_string().contains("max_chunk_size"));
    }

    #[test]
    fn test_validation_rejects_small_buffer() {
        let config = PeerConfig::default()
            .with_max_chunk_size(4096)
            .with_max_buffered_amount(1024);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = PeerConfig::default().with_send_timeout(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("send_timeout_ms"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peerlink.json");
        std::fs::write(&path, r#"{"bind_address": "0.0.0.0", "send_timeout_ms": 250}"#).unwrap();

        let config = PeerConfig::load_from_file(&path).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.transfer().send_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_logging_without_outputs_discards() {
        let logging = LoggingConfig {
            enable_console: false,
            enable_file: false,
            ..Default::default()
        };
        let logger = logging.build_logger("Test").unwrap();
        logger.info("dropped");
    }
}
