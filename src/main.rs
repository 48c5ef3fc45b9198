use clap::Parser;
use tracing_subscriber::EnvFilter;

use armctl::cli::Cli;
use armctl::services::Services;

fn main() {
    let cli = Cli::parse();

    // Set up tracing
    let filter = match cli.global_opts.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let result = Services::live(cli.global_opts.timeout)
        .and_then(|services| armctl::run(cli, &services, &mut std::io::stdout().lock()));

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
