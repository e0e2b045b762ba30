//! Data models for harvested links and probe outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Protocol category derived from a link's scheme prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProtocolTag {
    Vless,
    Vmess,
    Ss,
    Trojan,
    #[default]
    Other,
}

impl ProtocolTag {
    /// Tags in the fixed output order used for combined listings
    pub const ORDERED: [ProtocolTag; 5] = [
        ProtocolTag::Vless,
        ProtocolTag::Vmess,
        ProtocolTag::Ss,
        ProtocolTag::Trojan,
        ProtocolTag::Other,
    ];

    /// Classify a link by its scheme prefix
    pub fn from_link(link: &str) -> Self {
        if link.starts_with("vmess://") {
            ProtocolTag::Vmess
        } else if link.starts_with("vless://") {
            ProtocolTag::Vless
        } else if link.starts_with("ss://") {
            ProtocolTag::Ss
        } else if link.starts_with("trojan://") {
            ProtocolTag::Trojan
        } else {
            ProtocolTag::Other
        }
    }
}

impl fmt::Display for ProtocolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolTag::Vless => write!(f, "vless"),
            ProtocolTag::Vmess => write!(f, "vmess"),
            ProtocolTag::Ss => write!(f, "ss"),
            ProtocolTag::Trojan => write!(f, "trojan"),
            ProtocolTag::Other => write!(f, "other"),
        }
    }
}

/// Resolved (host, port) pair for a candidate link
///
/// The port stays a string: vmess payloads carry it as either text or a
/// number, and the connect attempt only needs it back in `host:port` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: String,
}

impl Endpoint {
    pub fn new(host: String, port: String) -> Self {
        Self { host, port }
    }

    /// The `host:port` form used for dialing
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.authority())
    }
}

/// Outcome of probing a single candidate link
///
/// Created exactly once per link by a probe worker and handed to the
/// consumer over the result channel; immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub link: String,
    pub host: String,
    pub port: String,
    pub success: bool,
    pub latency: Duration,
    pub error: Option<String>,
    pub tag: ProtocolTag,
}

impl ProbeResult {
    /// A link whose endpoint accepted a TCP connection
    pub fn reachable(link: String, endpoint: Endpoint, latency: Duration) -> Self {
        let tag = ProtocolTag::from_link(&link);
        Self {
            link,
            host: endpoint.host,
            port: endpoint.port,
            success: true,
            latency,
            error: None,
            tag,
        }
    }

    /// A link whose endpoint refused, timed out, or was otherwise unreachable
    pub fn unreachable(link: String, endpoint: Endpoint, latency: Duration, error: String) -> Self {
        let tag = ProtocolTag::from_link(&link);
        Self {
            link,
            host: endpoint.host,
            port: endpoint.port,
            success: false,
            latency,
            error: Some(error),
            tag,
        }
    }

    /// A link that could not be resolved to an endpoint at all
    ///
    /// No network attempt is made for these, so the latency is zero.
    pub fn undecodable(link: String, error: String) -> Self {
        let tag = ProtocolTag::from_link(&link);
        Self {
            link,
            host: String::new(),
            port: String::new(),
            success: false,
            latency: Duration::ZERO,
            error: Some(error),
            tag,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.success
    }
}
