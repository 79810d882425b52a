//! wsgraph CLI — infer a workspace's project graph.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wsgraph::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "wsgraph=warn",
        1 => "wsgraph=info",
        _ => "wsgraph=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match wsgraph::cli::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
