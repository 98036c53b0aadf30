use colored::Colorize;
use routelog::cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    // Internal diagnostics go to stderr; RUST_LOG=routelog=debug shows routing decisions
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("routelog=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = Cli::run() {
        eprintln!("{} {:#}", "✗ Error:".red().bold(), e);
        std::process::exit(1);
    }
}
