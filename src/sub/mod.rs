//! Subscription harvesting and connectivity checking
//!
//! This module provides functionality for:
//! - Extracting proxy links (vmess/vless/trojan/ss) from subscription documents
//! - Decoding links to (host, port) endpoints
//! - Fetching subscription documents with bounded concurrency
//! - Probing endpoint reachability over a TCP worker pool
//! - Partitioning reachable links by protocol and writing result files

pub mod classifier;
pub mod decoder;
pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod prober;
pub mod sources;
pub mod stats;

pub use classifier::{partition, ConfigPartition};
pub use decoder::{decode_endpoint, DecodeError};
pub use extractor::{extract_links, extract_links_with_base64};
pub use fetcher::{Fetcher, FetcherConfig, Harvest, SourceReport};
pub use models::{Endpoint, ProbeResult, ProtocolTag};
pub use prober::{Prober, ProberConfig};
pub use stats::{RunStats, StatsSnapshot};
