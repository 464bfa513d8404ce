//! ICE candidate representation and parsing.
//!
//! Candidates travel over signaling as SDP attribute values:
//! ```text
//! candidate:<foundation> <component-id> <transport> <priority> <address> <port> typ <cand-type> [raddr <rel-addr>] [rport <rel-port>]
//! ```

use crate::{candidate_type::CandidateType, errors::IceError};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Transport protocol of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Udp => "UDP",
            Transport::Tcp => "TCP",
        }
    }
}

impl FromStr for Transport {
    type Err = IceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UDP" => Ok(Transport::Udp),
            "TCP" => Ok(Transport::Tcp),
            _ => Err(IceError::InvalidTransportProtocol(s.to_string())),
        }
    }
}

/// One ICE candidate: a transport address a peer may be reachable on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub foundation: String,
    pub component_id: u32,
    pub transport: Transport,
    pub priority: u32,
    pub address: IpAddr,
    pub port: u16,
    pub candidate_type: CandidateType,
    pub related_address: Option<IpAddr>,
    pub related_port: Option<u16>,
}

impl Candidate {
    /// Builds a host candidate for component 1 with the RFC 5245 recommended priority.
    pub fn host(foundation: impl Into<String>, transport: Transport, addr: SocketAddr) -> Self {
        let candidate_type = CandidateType::Host;
        Self {
            foundation: foundation.into(),
            component_id: 1,
            transport,
            priority: Self::calculate_priority(candidate_type.preference(), 65535, 1),
            address: addr.ip(),
            port: addr.port(),
            candidate_type,
            related_address: None,
            related_port: None,
        }
    }

    /// Parses a candidate line, with or without the leading `candidate:` / `a=candidate:`.
    pub fn parse(value: &str) -> Result<Self, IceError> {
        let value = value.trim();
        let value = value.strip_prefix("a=").unwrap_or(value);
        let value = value.strip_prefix("candidate:").unwrap_or(value);

        let parts: Vec<&str> = value.split_whitespace().collect();
        if parts.len() < 8 || parts[6] != "typ" {
            return Err(IceError::InvalidCandidateFormat);
        }

        let foundation = parts[0].to_string();
        if foundation.is_empty() {
            return Err(IceError::InvalidFoundation);
        }

        let component_id: u32 = parts[1].parse().map_err(|_| IceError::InvalidComponentId)?;
        if component_id != 1 && component_id != 2 {
            return Err(IceError::InvalidComponentId);
        }

        let transport: Transport = parts[2].parse()?;
        let priority: u32 = parts[3].parse().map_err(|_| IceError::InvalidPriority)?;
        let address: IpAddr = parts[4].parse().map_err(|_| IceError::InvalidIpAddress)?;
        let port: u16 = parts[5].parse().map_err(|_| IceError::InvalidPort)?;
        let candidate_type = CandidateType::parse(parts[7])?;

        let mut related_address = None;
        let mut related_port = None;

        let mut i = 8;
        while i < parts.len() {
            match parts[i] {
                "raddr" if i + 1 < parts.len() => {
                    related_address = Some(
                        parts[i + 1]
                            .parse()
                            .map_err(|_| IceError::InvalidIpAddress)?,
                    );
                    i += 2;
                }
                "rport" if i + 1 < parts.len() => {
                    related_port = Some(parts[i + 1].parse().map_err(|_| IceError::InvalidPort)?);
                    i += 2;
                }
                // Extension attributes (generation, network-id, ...) are ignored.
                _ => i += 1,
            }
        }

        Ok(Candidate {
            foundation,
            component_id,
            transport,
            priority,
            address,
            port,
            candidate_type,
            related_address,
            related_port,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Priority = (2^24)*(type preference) + (2^8)*(local preference) + (256 - component ID)
    pub fn calculate_priority(type_pref: u32, local_pref: u32, component_id: u32) -> u32 {
        (type_pref << 24) + (local_pref << 8) + (256 - component_id)
    }
}

impl FromStr for Candidate {
    type Err = IceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Formats the candidate as it is carried in signaling (`candidate:...`).
impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "candidate:{} {} {} {} {} {} typ {}",
            self.foundation,
            self.component_id,
            self.transport.as_str(),
            self.priority,
            self.address,
            self.port,
            self.candidate_type
        )?;

        if let Some(raddr) = self.related_address {
            write!(f, " raddr {}", raddr)?;
        }

        if let Some(rport) = self.related_port {
            write!(f, " rport {}", rport)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_parse_valid_host_candidate() {
        let candidate = Candidate::parse("1 1 UDP 2130706431 192.168.1.1 8080 typ host").unwrap();

        assert_eq!(candidate.foundation, "1");
        assert_eq!(candidate.component_id, 1);
        assert_eq!(candidate.transport, Transport::Udp);
        assert_eq!(candidate.priority, 2130706431);
        assert_eq!(candidate.address, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(candidate.port, 8080);
        assert_eq!(candidate.candidate_type, CandidateType::Host);
        assert!(candidate.related_address.is_none());
    }

    #[test]
    fn test_parse_accepts_sdp_prefixes() {
        let plain = Candidate::parse("1 1 TCP 100 10.0.0.2 9 typ host").unwrap();
        let prefixed = Candidate::parse("candidate:1 1 TCP 100 10.0.0.2 9 typ host").unwrap();
        let attribute = Candidate::parse("a=candidate:1 1 TCP 100 10.0.0.2 9 typ host").unwrap();

        assert_eq!(plain, prefixed);
        assert_eq!(plain, attribute);
    }

    #[test]
    fn test_parse_srflx_with_related_address() {
        let candidate = Candidate::parse(
            "2 1 UDP 1694498815 203.0.113.1 54321 typ srflx raddr 192.168.1.1 rport 8080",
        )
        .unwrap();

        assert_eq!(candidate.candidate_type, CandidateType::Srflx);
        assert_eq!(
            candidate.related_address,
            Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)))
        );
        assert_eq!(candidate.related_port, Some(8080));
    }

    #[test]
    fn test_parse_ipv6_and_extensions() {
        let candidate =
            Candidate::parse("1 1 udp 2130706431 2001:db8::1 8080 typ host generation 0").unwrap();

        assert_eq!(
            candidate.address,
            IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Candidate::parse("1 1 UDP 2130706431 192.168.1.1"),
            Err(IceError::InvalidCandidateFormat)
        );
        assert_eq!(
            Candidate::parse("1 3 UDP 1 192.168.1.1 8080 typ host"),
            Err(IceError::InvalidComponentId)
        );
        assert!(matches!(
            Candidate::parse("1 1 SCTP 1 192.168.1.1 8080 typ host"),
            Err(IceError::InvalidTransportProtocol(_))
        ));
        assert_eq!(
            Candidate::parse("1 1 UDP 1 not-an-ip 8080 typ host"),
            Err(IceError::InvalidIpAddress)
        );
        assert_eq!(
            Candidate::parse("1 1 UDP 1 192.168.1.1 70000 typ host"),
            Err(IceError::InvalidPort)
        );
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let addr: SocketAddr = "127.0.0.1:40001".parse().unwrap();
        let candidate = Candidate::host("7", Transport::Tcp, addr);
        let line = candidate.to_string();

        assert!(line.starts_with("candidate:7 1 TCP "));
        assert!(line.ends_with("127.0.0.1 40001 typ host"));
        assert_eq!(Candidate::parse(&line).unwrap(), candidate);
    }

    #[test]
    fn test_host_priority() {
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let candidate = Candidate::host("1", Transport::Udp, addr);
        assert_eq!(candidate.priority, (126 << 24) + (65535 << 8) + 255);
    }
}
