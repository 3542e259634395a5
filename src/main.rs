use::std::env;
use::std::io;
use::std::process;

use log::info;
use sales_loader::{run, LoaderConfig};

fn main() {
    // Expecting one or more CSV file paths
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <sales.csv> [<sales.csv> ...]", args[0]);
        process::exit(1);
    }
    let paths = &args[1..];
    // Initialize logger (respect RUST_LOG env var if set)
    env_logger::init();

    let config = LoaderConfig::from_env();
    info!("starting sales loader with {} file(s)", paths.len());

    let stdout = io::stdout();
    match run(paths, &config, stdout.lock()) {
        Ok(outcome) if outcome.aggregate.is_empty() => {
            info!("no data to chart");
        }
        Ok(outcome) => {
            info!("wrote {} daily totals", outcome.aggregate.len());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
