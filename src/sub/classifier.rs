//! Partitioning of probe results by protocol tag

use crate::sub::models::{ProbeResult, ProtocolTag};

/// Successful links grouped by protocol, in arrival order
#[derive(Debug, Clone, Default)]
pub struct ConfigPartition {
    pub vless: Vec<String>,
    pub vmess: Vec<String>,
    pub ss: Vec<String>,
    pub trojan: Vec<String>,
    pub other: Vec<String>,
}

impl ConfigPartition {
    /// Categories as (tag, links) pairs, in the fixed output order
    pub fn by_tag(&self) -> [(ProtocolTag, &[String]); 5] {
        [
            (ProtocolTag::Vless, self.vless.as_slice()),
            (ProtocolTag::Vmess, self.vmess.as_slice()),
            (ProtocolTag::Ss, self.ss.as_slice()),
            (ProtocolTag::Trojan, self.trojan.as_slice()),
            (ProtocolTag::Other, self.other.as_slice()),
        ]
    }

    /// Every successful link, concatenated in the fixed tag order
    pub fn all(&self) -> Vec<String> {
        self.by_tag()
            .iter()
            .flat_map(|(_, links)| links.iter().cloned())
            .collect()
    }

    /// Total number of successful links across all categories
    pub fn len(&self) -> usize {
        self.by_tag().iter().map(|(_, links)| links.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition successful results by protocol tag; failed probes are dropped
///
/// Deterministic for a given result order; with concurrent probing upstream
/// the only ordering inside a category is arrival order.
pub fn partition(results: &[ProbeResult]) -> ConfigPartition {
    let mut partition = ConfigPartition::default();
    for result in results.iter().filter(|r| r.success) {
        let bucket = match result.tag {
            ProtocolTag::Vless => &mut partition.vless,
            ProtocolTag::Vmess => &mut partition.vmess,
            ProtocolTag::Ss => &mut partition.ss,
            ProtocolTag::Trojan => &mut partition.trojan,
            ProtocolTag::Other => &mut partition.other,
        };
        bucket.push(result.link.clone());
    }
    partition
}
