use anyhow::Context;
use bisub::sub::{
    classifier, sources, ConfigPartition, Fetcher, FetcherConfig, ProbeResult, Prober,
    ProberConfig, RunStats, StatsSnapshot,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Well-known hosts for the quick smoke run
const QUICK_SAMPLE: &[&str] = &[
    "tcp://8.8.8.8:53",
    "tcp://1.1.1.1:53",
    "tcp://github.com:443",
    "tcp://aws.amazon.com:443",
    "tcp://127.0.0.1:80",
    "tcp://127.0.0.1:443",
];

/// Sample set for the benchmark ladder
const BENCH_SAMPLE: &[&str] = &[
    "tcp://8.8.8.8:53",
    "tcp://1.1.1.1:53",
    "tcp://github.com:443",
    "tcp://aws.amazon.com:443",
    "tcp://google.com:443",
    "tcp://cloudflare.com:443",
    "tcp://8.8.4.4:53",
    "tcp://1.0.0.1:53",
];

/// Worker counts per CPU core tried by the bench subcommand
const BENCH_LEVELS: [usize; 5] = [10, 25, 50, 75, 100];

/// A subscription link harvester and TCP connectivity checker
#[derive(Parser)]
#[command(name = "bisub")]
#[command(about = "A subscription link harvester and TCP connectivity checker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch subscriptions, probe every link, and write partitioned results
    Run {
        /// Input file containing subscription URLs (one per line)
        #[arg(short, long, default_value = "subs.txt")]
        input: PathBuf,
        /// Directory for output files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        /// Number of probe workers (default: 50 per CPU core)
        #[arg(short = 'n', long)]
        concurrency: Option<usize>,
        /// Number of concurrent subscription fetches (default: 8 per CPU core)
        #[arg(long)]
        fetch_concurrency: Option<usize>,
        /// Probe timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: u64,
        /// Treat bare base64 lines in documents as vmess payloads
        #[arg(long)]
        decode_base64_lines: bool,
        /// Print individual probe failures
        #[arg(short, long)]
        verbose: bool,
    },
    /// Probe a built-in set of sample hosts
    Quick {
        /// Probe timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: u64,
        /// Print individual probe failures
        #[arg(short, long)]
        verbose: bool,
    },
    /// Compare throughput across a ladder of worker counts
    Bench {
        /// Probe timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            output_dir,
            concurrency,
            fetch_concurrency,
            timeout,
            decode_base64_lines,
            verbose,
        } => {
            run_pipeline(
                &input,
                &output_dir,
                concurrency,
                fetch_concurrency,
                timeout,
                decode_base64_lines,
                verbose,
            )
            .await?;
        }
        Commands::Quick { timeout, verbose } => {
            run_quick(timeout, verbose).await;
        }
        Commands::Bench { timeout } => {
            run_bench(timeout).await;
        }
    }

    Ok(())
}

async fn run_pipeline(
    input: &Path,
    output_dir: &Path,
    concurrency: Option<usize>,
    fetch_concurrency: Option<usize>,
    timeout: u64,
    decode_base64_lines: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    let urls = sources::read_lines(input)
        .with_context(|| format!("failed to read input file {}", input.display()))?;
    println!("Loaded {} subscription sources from {}", urls.len(), input.display());

    let mut fetcher_config = FetcherConfig::new().with_base64_lines(decode_base64_lines);
    if let Some(n) = fetch_concurrency {
        fetcher_config = fetcher_config.with_concurrency(n);
    }
    let fetcher = Fetcher::with_config(fetcher_config)?;

    println!("Fetching subscription documents...");
    let harvest = fetcher.harvest(&urls).await;
    if harvest.failed_sources() > 0 {
        println!("Skipped {} unreachable sources", harvest.failed_sources());
        if verbose {
            for report in harvest.reports.iter().filter(|r| !r.is_success()) {
                println!(
                    "  ✗ {} ({})",
                    report.source,
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }
    println!("Unique links: {}", harvest.links.len());
    println!();

    let prober = build_prober(concurrency, timeout);
    let (results, snapshot) = drain_probes(&prober, harvest.links, verbose, true).await;
    print_summary(&snapshot);

    let partition = classifier::partition(&results);
    let written = sources::write_partitions(&partition, output_dir);
    print_partition_summary(&partition, &written);

    Ok(())
}

async fn run_quick(timeout: u64, verbose: bool) {
    let links: Vec<String> = QUICK_SAMPLE.iter().map(|s| s.to_string()).collect();
    println!("Quick test: {} sample hosts, timeout {}s", links.len(), timeout);
    println!();

    let prober = build_prober(None, timeout);
    let (_, snapshot) = drain_probes(&prober, links, verbose, true).await;
    print_summary(&snapshot);
}

async fn run_bench(timeout: u64) {
    let links: Vec<String> = BENCH_SAMPLE.iter().map(|s| s.to_string()).collect();
    let cores = num_cpus::get();
    println!("Benchmark: {} sample hosts, {} CPU cores", links.len(), cores);
    println!();
    println!(
        "{:<15} {:<12} {:<12} {}",
        "Concurrency", "Duration", "Probes/sec", "Success rate"
    );
    println!("{}", "─".repeat(55));

    for level in BENCH_LEVELS {
        let workers = level * cores;
        let prober = Prober::with_config(
            ProberConfig::new()
                .with_concurrency(workers)
                .with_timeout(Duration::from_secs(timeout)),
        );

        let start = Instant::now();
        // Fresh aggregator per level; nothing leaks between sub-runs.
        let (_, snapshot) = drain_probes(&prober, links.clone(), false, false).await;
        let duration = start.elapsed();
        let per_sec = snapshot.processed as f64 / duration.as_secs_f64();

        println!(
            "{:<15} {:<12} {:<12.2} {:.1}%",
            workers,
            format!("{duration:.2?}"),
            per_sec,
            snapshot.success_rate()
        );
    }
}

fn build_prober(concurrency: Option<usize>, timeout: u64) -> Prober {
    let mut config = ProberConfig::new().with_timeout(Duration::from_secs(timeout));
    if let Some(n) = concurrency {
        config = config.with_concurrency(n);
    }
    Prober::with_config(config)
}

/// Drain the probe pool to exhaustion, rendering progress as results arrive
async fn drain_probes(
    prober: &Prober,
    links: Vec<String>,
    verbose: bool,
    show_progress: bool,
) -> (Vec<ProbeResult>, StatsSnapshot) {
    let stats = Arc::new(RunStats::new(links.len() as u64));
    let total = links.len() as u64;
    let mut rx = prober.probe_all(links, Arc::clone(&stats));

    let pb = if show_progress {
        ProgressBar::new(total)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("█░ "),
    );

    let mut results = Vec::new();
    while let Some(result) = rx.recv().await {
        pb.inc(1);
        pb.set_message(format!("{:.1} probes/sec", stats.snapshot().rate()));
        if verbose && !result.success {
            pb.println(format!(
                "  ✗ {} ({})",
                result.link,
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
        results.push(result);
    }
    pb.finish_and_clear();

    (results, stats.snapshot())
}

fn print_summary(snapshot: &StatsSnapshot) {
    println!();
    println!("{}", "═".repeat(55));
    println!("  Total:        {}", snapshot.total);
    println!("  Successful:   {}", snapshot.success);
    println!("  Failed:       {}", snapshot.failed);
    if snapshot.total > 0 {
        println!("  Success rate: {:.1}%", snapshot.success_rate());
    }
    if let (Some(min), Some(max)) = (snapshot.min_latency, snapshot.max_latency) {
        println!("  Min latency:  {min:.2?}");
        println!("  Max latency:  {max:.2?}");
    }
    println!("{}", "═".repeat(55));
}

fn print_partition_summary(partition: &ConfigPartition, written: &[PathBuf]) {
    println!();
    println!("Saved {} configs:", partition.len());
    for (tag, links) in partition.by_tag() {
        println!("  {:<8} {}", format!("{tag}:"), links.len());
    }
    println!();
    println!("Files written:");
    for path in written {
        println!("  {}", path.display());
    }
}
