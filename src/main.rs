//! partmap-stress - Concurrent Load Driver
//!
//! Hammers a shared [`ConcurrentMap`] with writer threads (set/delete churn
//! over a bounded key set) and reader threads, then reports throughput and
//! map statistics. Workers run on tokio's blocking pool because every map
//! operation is synchronous.

use anyhow::{bail, Context};
use partmap::{ConcurrentMap, MapConfig, StrKey};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Driver configuration
#[derive(Debug, Clone)]
struct Config {
    /// Number of writer workers
    writers: usize,
    /// Number of reader workers
    readers: usize,
    /// Size of the key set the workers draw from
    keys: usize,
    /// Operations per worker
    ops: usize,
    /// Partition count (None = sized from `keys`)
    partitions: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            writers: 4,
            readers: 4,
            keys: 10_000,
            ops: 200_000,
            partitions: None,
        }
    }
}

/// What the command line asked for
#[derive(Debug)]
enum Action {
    Run(Config),
    Help,
    Version,
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> anyhow::Result<Self> {
        match Self::parse(std::env::args().skip(1))? {
            Action::Run(config) => Ok(config),
            Action::Help => {
                print_help();
                std::process::exit(0);
            }
            Action::Version => {
                println!("partmap-stress version {}", partmap::VERSION);
                std::process::exit(0);
            }
        }
    }

    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Action> {
        let mut config = Config::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |name: &str| -> anyhow::Result<usize> {
                let raw = args.next().with_context(|| format!("{} requires a value", name))?;
                raw.parse()
                    .with_context(|| format!("invalid value for {}: {}", name, raw))
            };

            match arg.as_str() {
                "--writers" | "-w" => config.writers = value("--writers")?,
                "--readers" | "-r" => config.readers = value("--readers")?,
                "--keys" | "-k" => config.keys = value("--keys")?,
                "--ops" | "-n" => config.ops = value("--ops")?,
                "--partitions" | "-p" => config.partitions = Some(value("--partitions")?),
                "--help" | "-h" => return Ok(Action::Help),
                "--version" | "-v" => return Ok(Action::Version),
                other => {
                    print_help();
                    bail!("unknown argument: {}", other);
                }
            }
        }

        if config.keys == 0 {
            bail!("--keys must be at least 1");
        }

        Ok(Action::Run(config))
    }

    /// Operations across all workers
    fn total_ops(&self) -> usize {
        self.writers.saturating_add(self.readers).saturating_mul(self.ops)
    }

    fn map_config(&self) -> MapConfig {
        let config = MapConfig::for_expected_entries(self.keys);
        match self.partitions {
            Some(partitions) => config.with_partitions(partitions),
            None => config,
        }
    }
}

fn print_help() {
    println!(
        r#"
partmap-stress - Concurrent load driver for partmap

USAGE:
    partmap-stress [OPTIONS]

OPTIONS:
    -w, --writers <N>       Writer workers (default: 4)
    -r, --readers <N>       Reader workers (default: 4)
    -k, --keys <N>          Size of the shared key set (default: 10000)
    -n, --ops <N>           Operations per worker (default: 200000)
    -p, --partitions <N>    Partition count (default: sized from --keys)
    -v, --version           Print version information
    -h, --help              Print this help message

Set RUST_LOG=debug to see collision and construction events.
"#
    );
}

/// Spreads operation `i` of worker `id` over the key set.
fn key_index(i: usize, stride: usize, id: usize, keys: usize) -> usize {
    i.wrapping_mul(stride).wrapping_add(id) % keys
}

/// Set/delete churn. Every third operation is a delete.
fn write_worker(map: &ConcurrentMap<u64>, id: usize, config: &Config) {
    for i in 0..config.ops {
        let n = key_index(i, 7919, id, config.keys);
        let key = StrKey::from(format!("key:{}", n));
        if i % 3 == 2 {
            map.delete(&key);
        } else {
            map.set(&key, i as u64);
        }
    }
}

/// Point reads over the same key set. Returns the number of hits.
fn read_worker(map: &ConcurrentMap<u64>, id: usize, config: &Config) -> usize {
    (0..config.ops)
        .filter(|i| {
            let n = key_index(*i, 104_729, id, config.keys);
            map.contains(&StrKey::from(format!("key:{}", n)))
        })
        .count()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = Config::from_args()?;
    let map = Arc::new(ConcurrentMap::<u64>::with_config(config.map_config())?);
    info!(
        writers = config.writers,
        readers = config.readers,
        keys = config.keys,
        ops = config.ops,
        partitions = map.partition_count(),
        "Starting stress run"
    );

    let started = Instant::now();
    let mut workers = JoinSet::new();

    for id in 0..config.writers {
        let map = Arc::clone(&map);
        let config = config.clone();
        workers.spawn_blocking(move || {
            write_worker(&map, id, &config);
            0
        });
    }
    for id in 0..config.readers {
        let map = Arc::clone(&map);
        let config = config.clone();
        workers.spawn_blocking(move || read_worker(&map, id, &config));
    }

    let mut hits = 0usize;
    while let Some(result) = workers.join_next().await {
        hits += result.context("stress worker panicked")?;
    }

    let elapsed = started.elapsed();
    report(&map, &config, hits, elapsed);

    if map.slot_capacity() > config.keys {
        bail!(
            "slot store grew past the key set: {} slots for {} keys",
            map.slot_capacity(),
            config.keys
        );
    }

    Ok(())
}

fn report(map: &ConcurrentMap<u64>, config: &Config, hits: usize, elapsed: Duration) {
    let total_ops = config.total_ops();
    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    let stats = map.stats();

    info!(
        total_ops,
        elapsed_ms = elapsed.as_millis() as u64,
        ops_per_sec = (total_ops as f64 / secs) as u64,
        read_hits = hits,
        "Stress run finished"
    );
    info!(
        entries = stats.entries,
        slots = stats.slots,
        free_slots = stats.free_slots,
        partitions = stats.partitions,
        get_ops = stats.get_ops,
        set_ops = stats.set_ops,
        del_ops = stats.del_ops,
        collisions = stats.collisions,
        "Map statistics"
    );

    let sizes = map.partition_sizes();
    if let (Some(min), Some(max)) = (sizes.iter().min(), sizes.iter().max()) {
        info!(min, max, "Partition sizes");
    }
    if stats.collisions > 0 {
        warn!(collisions = stats.collisions, "Partition key collisions observed");
    }
}
