//! `filekv`: a thin command-line harness over the [`filekv::Store`] engine.
//!
//! This binary is an external collaborator, not part of the core engine --
//! it drives exactly one [`filekv::Store`] per invocation and never shares
//! it across threads.

use std::path::PathBuf;
use std::process::exit;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use log::{error, info, LevelFilter};

use filekv::{Result, Store};

const DEFAULT_PATH: &str = "filekv.db";

/// Args for filekv.
#[derive(Parser)]
#[clap(author, version, about)]
#[clap(propagate_version = true)]
struct Cli {
    /// Subcommand
    #[clap(subcommand)]
    command: Commands,
}

/// Enum type of subcommand for filekv.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Set the value of a string key to a string, creating the store file
    /// if it does not already exist.
    Put {
        /// Key
        key: String,
        /// Value
        value: String,
        /// Path to the store file
        #[clap(short, long, value_parser, default_value = DEFAULT_PATH)]
        path: PathBuf,
    },
    /// Get the string value of a given string key.
    Get {
        /// Key
        key: String,
        /// Path to the store file
        #[clap(short, long, value_parser, default_value = DEFAULT_PATH)]
        path: PathBuf,
    },
    /// Remove a given key.
    Delete {
        /// Key
        key: String,
        /// Path to the store file
        #[clap(short, long, value_parser, default_value = DEFAULT_PATH)]
        path: PathBuf,
    },
    /// Open a store, replay its log, and report how many live keys were
    /// found. Useful for sanity-checking a file without mutating it.
    ReplayStats {
        /// Path to the store file
        #[clap(short, long, value_parser, default_value = DEFAULT_PATH)]
        path: PathBuf,
    },
    /// Run a simple in-process throughput benchmark: `count` puts followed
    /// by `count` gets against a fresh scratch file, reporting elapsed time
    /// and ops/second.
    Bench {
        /// Number of put/get operations to run
        #[clap(short, long, value_parser, default_value_t = 10_000)]
        count: u64,
    },
}

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    if let Err(e) = run() {
        error!("{}", e);
        exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Put { key, value, path } => {
            let mut store = open_or_create(&path)?;
            store.put(key.as_bytes(), value.as_bytes())?;
            store.close();
        }
        Commands::Get { key, path } => {
            let mut store = open_or_create(&path)?;
            match store.get(key.as_bytes())? {
                Some(value) => println!("{}", String::from_utf8_lossy(&value)),
                None => println!("Key not found"),
            }
            store.close();
        }
        Commands::Delete { key, path } => {
            let mut store = open_or_create(&path)?;
            store.delete(key.as_bytes())?;
            store.close();
        }
        Commands::ReplayStats { path } => {
            let store = Store::open(&path)?;
            println!("{} live key(s)", store.len());
            store.close();
        }
        Commands::Bench { count } => run_bench(count)?,
    }

    Ok(())
}

/// Opens `path` if it exists, otherwise creates a fresh store there.
fn open_or_create(path: &PathBuf) -> Result<Store> {
    if path.exists() {
        Store::open(path)
    } else {
        Store::create(path)
    }
}

fn run_bench(count: u64) -> Result<()> {
    let path = std::env::temp_dir().join(format!("filekv-bench-{}.db", unique_suffix()));
    let mut store = Store::create(&path)?;

    let put_start = Instant::now();
    for i in 0..count {
        let key = format!("bench-key-{}", i);
        let value = format!("bench-value-{}", i);
        store.put(key.as_bytes(), value.as_bytes())?;
    }
    let put_elapsed = put_start.elapsed();

    let get_start = Instant::now();
    for i in 0..count {
        let key = format!("bench-key-{}", i);
        store.get(key.as_bytes())?;
    }
    let get_elapsed = get_start.elapsed();

    store.close();
    let _ = std::fs::remove_file(&path);

    info!(
        "put: {} ops in {:?} ({:.0} ops/sec)",
        count,
        put_elapsed,
        count as f64 / put_elapsed.as_secs_f64().max(f64::EPSILON)
    );
    info!(
        "get: {} ops in {:?} ({:.0} ops/sec)",
        count,
        get_elapsed,
        count as f64 / get_elapsed.as_secs_f64().max(f64::EPSILON)
    );

    Ok(())
}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
        ^ (std::process::id() as u128)
}
