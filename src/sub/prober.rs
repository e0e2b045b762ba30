//! TCP reachability probing over a bounded worker pool
//!
//! A fixed set of worker tasks consumes links from a bounded job queue,
//! resolves each through the decoder, attempts one timed TCP connect, and
//! pushes exactly one result per link into a bounded result channel. The
//! channel closes only once every worker has finished, so consumers drain
//! it to exhaustion instead of polling a counter.

use crate::sub::decoder;
use crate::sub::models::ProbeResult;
use crate::sub::stats::RunStats;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

/// Default timeout for one connect attempt
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Headroom multiplier for the job and result queues over the job count
const QUEUE_MULTIPLIER: usize = 4;

/// Default worker count
fn default_concurrency() -> usize {
    num_cpus::get() * 50
}

/// Configuration for the prober
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Deadline for each connect attempt
    pub timeout: Duration,
    /// Number of persistent probe workers
    pub concurrency: usize,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: default_concurrency(),
        }
    }
}

impl ProberConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Reachability prober for candidate links
#[derive(Clone)]
pub struct Prober {
    config: ProberConfig,
}

impl Prober {
    /// Create a prober with default configuration
    pub fn new() -> Self {
        Self::with_config(ProberConfig::default())
    }

    /// Create a prober with custom configuration
    pub fn with_config(config: ProberConfig) -> Self {
        Self { config }
    }

    /// Decode one link and probe its endpoint
    ///
    /// Decode failures become failed results without touching the network.
    /// A successful connect is dropped immediately; only reachability is
    /// tested, not protocol correctness.
    pub async fn probe_link(&self, link: &str) -> ProbeResult {
        let endpoint = match decoder::decode_endpoint(link) {
            Ok(endpoint) => endpoint,
            Err(e) => return ProbeResult::undecodable(link.to_string(), e.to_string()),
        };

        let start = Instant::now();
        match timeout(self.config.timeout, TcpStream::connect(endpoint.authority())).await {
            Ok(Ok(stream)) => {
                let latency = start.elapsed();
                drop(stream);
                ProbeResult::reachable(link.to_string(), endpoint, latency)
            }
            Ok(Err(e)) => ProbeResult::unreachable(
                link.to_string(),
                endpoint,
                start.elapsed(),
                e.to_string(),
            ),
            Err(_) => ProbeResult::unreachable(
                link.to_string(),
                endpoint,
                start.elapsed(),
                format!("connect timed out after {:?}", self.config.timeout),
            ),
        }
    }

    /// Probe every link through the worker pool
    ///
    /// Exactly one `ProbeResult` per input link arrives on the returned
    /// channel, in completion order. Workers record each outcome into
    /// `stats` as it is produced. A full result channel back-pressures the
    /// sending worker; nothing is dropped.
    pub fn probe_all(
        &self,
        links: Vec<String>,
        stats: Arc<RunStats>,
    ) -> mpsc::Receiver<ProbeResult> {
        let capacity = links.len().max(1) * QUEUE_MULTIPLIER;
        let (job_tx, job_rx) = mpsc::channel::<String>(capacity);
        let (result_tx, result_rx) = mpsc::channel::<ProbeResult>(capacity);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let workers = self.config.concurrency.min(links.len()).max(1);
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let jobs = Arc::clone(&job_rx);
            let results = result_tx.clone();
            let stats = Arc::clone(&stats);
            let prober = self.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    // Hold the queue lock only for the receive itself.
                    let job = { jobs.lock().await.recv().await };
                    let Some(link) = job else { break };

                    let result = prober.probe_link(&link).await;
                    stats.record(&result);
                    if results.send(result).await.is_err() {
                        // Consumer went away; nothing left to report to.
                        break;
                    }
                }
            }));
        }

        // Feed the queue, then drop the sender so idle workers drain out.
        tokio::spawn(async move {
            for link in links {
                if job_tx.send(link).await.is_err() {
                    break;
                }
            }
        });

        // Completion barrier: the result channel closes only after every
        // worker has returned.
        tokio::spawn(async move {
            for handle in handles {
                let _ = handle.await;
            }
            drop(result_tx);
        });

        result_rx
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new()
    }
}
