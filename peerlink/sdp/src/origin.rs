//! SDP origin (`o=`) field.

use crate::errors::SdpError;
use rand::Rng;
use std::fmt;

/// `o=<username> <sess-id> <sess-version> <nettype> <addrtype> <unicast-address>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub username: String,
    pub session_id: u64,
    pub session_version: u64,
    pub network_type: String,
    pub address_type: String,
    pub unicast_address: String,
}

impl Origin {
    /// Anonymous origin with a random non-zero session id.
    pub fn generate() -> Self {
        let session_id = rand::thread_rng().gen_range(1..=i64::MAX as u64);
        Self {
            session_id,
            ..Default::default()
        }
    }

    pub fn parse(value: &str) -> Result<Self, SdpError> {
        let parts: Vec<&str> = value.split_whitespace().collect();
        if parts.len() != 6 {
            return Err(SdpError::InvalidOriginFormat);
        }

        let session_id = parts[1]
            .parse()
            .map_err(|_| SdpError::InvalidSessionId)?;
        let session_version = parts[2]
            .parse()
            .map_err(|_| SdpError::InvalidSessionId)?;

        Ok(Self {
            username: parts[0].to_string(),
            session_id,
            session_version,
            network_type: parts[3].to_string(),
            address_type: parts[4].to_string(),
            unicast_address: parts[5].to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), SdpError> {
        if self.network_type != "IN" {
            return Err(SdpError::InvalidOriginFormat);
        }
        if self.address_type != "IP4" && self.address_type != "IP6" {
            return Err(SdpError::InvalidOriginFormat);
        }
        if self.session_id == 0 {
            return Err(SdpError::InvalidSessionId);
        }
        Ok(())
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            username: "-".to_string(),
            session_id: 0,
            session_version: 1,
            network_type: "IN".to_string(),
            address_type: "IP4".to_string(),
            unicast_address: "127.0.0.1".to_string(),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "o={} {} {} {} {} {}\r\n",
            self.username,
            self.session_id,
            self.session_version,
            self.network_type,
            self.address_type,
            self.unicast_address
        )
    }
}
