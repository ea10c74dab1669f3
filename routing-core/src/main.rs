//! Interactive smart order router.
//!
//! Loads one depth snapshot per configured venue, then answers routing
//! requests from stdin until `exit`:
//! - a signed number routes an order (positive buys, negative sells),
//!   followed by an algorithm prompt (`G` greedy / `H` hybrid)
//! - `lq` prints the liquidity remaining on every venue
//! - `exit` quits

use anyhow::Context;
use rust_decimal::Decimal;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use tracing::info;

mod config;

use config::{Settings, DEFAULT_CONFIG_PATH};
use routing_common::data::{load_book_csv, OrderBook};
use routing_common::execution::{RoutingAlgorithm, Side, SmartOrderRouter};
use routing_common::logging::{init_logging, LogConfig};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("--help") | Some("-h") => {
            print_usage();
        }
        path => {
            if let Err(err) = run(path.unwrap_or(DEFAULT_CONFIG_PATH)) {
                eprintln!("error: {err:#}");
                std::process::exit(1);
            }
        }
    }
}

fn print_usage() {
    println!("Smart Order Router - route one instrument across venue books");
    println!();
    println!("Usage:");
    println!("  routing-core [config-path]     # default: {DEFAULT_CONFIG_PATH}.toml");
    println!();
    println!("Commands at the prompt:");
    println!("  <size>    route an order; positive buys, negative sells");
    println!("            (you will be asked for the algorithm: G greedy, H hybrid)");
    println!("  lq        print remaining liquidity per venue");
    println!("  exit      quit");
}

fn run(config_path: &str) -> anyhow::Result<()> {
    init_logging(LogConfig::from_env()).map_err(|e| anyhow::anyhow!("initializing logging: {e}"))?;

    let settings = Settings::new(config_path)
        .with_context(|| format!("loading configuration from '{config_path}'"))?;
    settings.validate()?;

    let mut books = Vec::with_capacity(settings.venues.len());
    for venue in &settings.venues {
        let mut book = OrderBook::new(venue.id.clone(), venue.taker_fee, venue.min_lot_size);
        let rows = load_book_csv(&venue.book_file, &mut book)
            .with_context(|| format!("loading book for '{}' from '{}'", venue.id, venue.book_file))?;
        info!(venue = %venue.id, rows, "book loaded");
        books.push(book);
    }

    let mut router = SmartOrderRouter::new(books);
    repl(&mut router)
}

fn repl(router: &mut SmartOrderRouter) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("order> ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();

        match input {
            "" => continue,
            "exit" | "quit" => break,
            "help" => print_usage(),
            "lq" => {
                for book in router.books() {
                    println!("{book}");
                }
            }
            _ => match Decimal::from_str(input) {
                Ok(size) if size.is_zero() => println!("order size must be non-zero"),
                Ok(size) => {
                    let side = if size > Decimal::ZERO {
                        Side::Buy
                    } else {
                        Side::Sell
                    };
                    let Some(algorithm) = prompt_algorithm(&stdin)? else {
                        break; // EOF at the algorithm prompt
                    };
                    let plan = router.distribute(size.abs(), side, algorithm);
                    println!("{plan}");
                }
                Err(_) => {
                    println!("unrecognized command '{input}' (enter a size, \"lq\", or \"exit\")");
                }
            },
        }
    }

    Ok(())
}

fn prompt_algorithm(stdin: &io::Stdin) -> anyhow::Result<Option<RoutingAlgorithm>> {
    let mut line = String::new();
    loop {
        print!("algorithm [G]reedy / [H]ybrid> ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match RoutingAlgorithm::parse(&line) {
            Some(algorithm) => return Ok(Some(algorithm)),
            None => println!("enter G or H"),
        }
    }
}
