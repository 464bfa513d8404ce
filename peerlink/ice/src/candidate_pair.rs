//! Candidate pairs and their check ordering.

use crate::candidate::Candidate;

/// A local/remote candidate pair considered for a connectivity check.
#[derive(Debug, Clone)]
pub struct CandidatePair {
    pub local: Candidate,
    pub remote: Candidate,
    pub priority: u64,
}

impl CandidatePair {
    /// Creates a pair; `local_is_controlling` selects which side plays G in the formula.
    pub fn new(local: Candidate, remote: Candidate, local_is_controlling: bool) -> Self {
        let (g, d) = if local_is_controlling {
            (local.priority, remote.priority)
        } else {
            (remote.priority, local.priority)
        };
        Self {
            local,
            remote,
            priority: Self::calculate_priority(g, d),
        }
    }

    /// pair priority = 2^32 * MIN(G,D) + 2 * MAX(G,D) + (G>D?1:0)
    fn calculate_priority(g: u32, d: u32) -> u64 {
        let min = g.min(d) as u64;
        let max = g.max(d) as u64;
        let g_greater = if g > d { 1u64 } else { 0u64 };

        (1u64 << 32) * min + 2 * max + g_greater
    }

    /// Forms every pair with a matching transport, highest priority first.
    pub fn form_pairs(
        local: &[Candidate],
        remote: &[Candidate],
        local_is_controlling: bool,
    ) -> Vec<CandidatePair> {
        let mut pairs: Vec<CandidatePair> = local
            .iter()
            .flat_map(|l| {
                remote
                    .iter()
                    .filter(move |r| r.transport == l.transport && r.component_id == l.component_id)
                    .map(move |r| CandidatePair::new(l.clone(), r.clone(), local_is_controlling))
            })
            .collect();
        pairs.sort_by(|a, b| b.priority.cmp(&a.priority));
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Transport;
    use crate::candidate_type::CandidateType;

    fn candidate(priority: u32, port: u16, transport: Transport) -> Candidate {
        Candidate {
            foundation: "test".to_string(),
            component_id: 1,
            transport,
            priority,
            address: "192.168.1.1".parse().unwrap(),
            port,
            candidate_type: CandidateType::Host,
            related_address: None,
            related_port: None,
        }
    }

    #[test]
    fn test_priority_formula() {
        let pair = CandidatePair::new(
            candidate(1000, 1, Transport::Udp),
            candidate(2000, 2, Transport::Udp),
            true,
        );
        assert_eq!(pair.priority, (1u64 << 32) * 1000 + 2 * 2000);
    }

    #[test]
    fn test_controlling_side_breaks_ties() {
        let a = CandidatePair::new(
            candidate(2000, 1, Transport::Udp),
            candidate(1000, 2, Transport::Udp),
            true,
        );
        let b = CandidatePair::new(
            candidate(2000, 1, Transport::Udp),
            candidate(1000, 2, Transport::Udp),
            false,
        );
        assert_eq!(a.priority, b.priority + 1);
    }

    #[test]
    fn test_form_pairs_sorted_and_transport_matched() {
        let local = vec![candidate(500, 1, Transport::Udp)];
        let remote = vec![
            candidate(100, 10, Transport::Udp),
            candidate(900, 11, Transport::Udp),
            candidate(950, 12, Transport::Tcp),
        ];

        let pairs = CandidatePair::form_pairs(&local, &remote, true);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].remote.port, 11);
        assert_eq!(pairs[1].remote.port, 10);
    }
}
