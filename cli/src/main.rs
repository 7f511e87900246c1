//! chaintracker CLI — follow a chain head and print block and fork events.
//!
//! Usage:
//! ```bash
//! chaintracker watch --url http://localhost:8545 --chain ethereum
//! chaintracker info
//! ```

use std::env;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use chaintracker_core::{ChainTracker, ForkFn, HandlerRegistry, NewLatestFn, TrackerConfig};
use chaintracker_evm::{EvmChainFetcher, EvmFetcherConfig};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "watch" => cmd_watch(&args[2..]),
        "info" => cmd_info(),
        "version" | "--version" | "-V" => {
            println!("chaintracker {}", env!("CARGO_PKG_VERSION"));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("chaintracker {}", env!("CARGO_PKG_VERSION"));
    println!("Reorg-aware sliding-window block tracker\n");
    println!("USAGE:");
    println!("    chaintracker <COMMAND>\n");
    println!("COMMANDS:");
    println!("    watch    Follow a chain head and print events");
    println!("    info     Show default tracker settings");
    println!("    version  Print version");
    println!("    help     Print this help\n");
    println!("WATCH OPTIONS:");
    println!("    --url <URL>              JSON-RPC endpoint (required)");
    println!("    --chain <ID>             Chain identifier [default: ethereum]");
    println!("    --blocks <N>             Window size [default: 128]");
    println!("    --block-time-ms <MS>     Average block time [default: 12000]");
}

fn cmd_info() {
    let defaults = TrackerConfig::default();
    println!("chaintracker v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default window size: {} blocks", defaults.blocks_to_save);
    println!(
        "  Default block time: {:?} (poll tick = block time / 10)",
        defaults.average_block_time
    );
    println!(
        "  Default server memory: {} blocks",
        defaults.server_block_memory
    );
    println!("  Backoff cap: {:?}", chaintracker_core::BACKOFF_MAX);
}

fn cmd_watch(args: &[String]) {
    let mut url = None;
    let mut chain = "ethereum".to_string();
    let mut blocks = 128u64;
    let mut block_time_ms = 12_000u64;

    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = match iter.next() {
            Some(v) => v,
            None => {
                eprintln!("Missing value for {flag}");
                process::exit(1);
            }
        };
        match flag.as_str() {
            "--url" => url = Some(value.clone()),
            "--chain" => chain = value.clone(),
            "--blocks" => blocks = parse_or_exit(flag, value),
            "--block-time-ms" => block_time_ms = parse_or_exit(flag, value),
            other => {
                eprintln!("Unknown option: {other}");
                process::exit(1);
            }
        }
    }
    let url = match url {
        Some(url) => url,
        None => {
            eprintln!("watch requires --url");
            process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let runtime = tokio::runtime::Runtime::new().expect("failed to build tokio runtime");
    if let Err(err) = runtime.block_on(watch(url, chain, blocks, block_time_ms)) {
        eprintln!("watch failed: {err}");
        process::exit(1);
    }
}

fn parse_or_exit(flag: &str, value: &str) -> u64 {
    match value.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Invalid value for {flag}: {value}");
            process::exit(1);
        }
    }
}

async fn watch(
    url: String,
    chain: String,
    blocks: u64,
    block_time_ms: u64,
) -> Result<(), chaintracker_core::TrackerError> {
    let fetcher = Arc::new(EvmChainFetcher::new(EvmFetcherConfig::new(chain, url))?);

    let mut handlers = HandlerRegistry::new();
    handlers.on_new_latest(NewLatestFn::new("cli-print", |block, hash| {
        println!("block  #{block}  tip {hash}");
    }));
    handlers.on_fork(ForkFn::new("cli-print", |block| {
        println!("fork   detected at #{block}");
    }));

    let config = TrackerConfig::new(blocks, Duration::from_millis(block_time_ms));
    let tracker = ChainTracker::spawn(fetcher, config, handlers).await?;
    println!(
        "watching {} from block {} (Ctrl-C to stop)",
        tracker.endpoint(),
        tracker.latest_number()
    );

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");
    println!("\nstopping");
    tracker.stop().await;
    Ok(())
}
