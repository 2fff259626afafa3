use clap::Parser;
use tracing_subscriber::EnvFilter;

use csvql::cli::args::CliArgs;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    std::process::exit(csvql::cli::run(&args));
}
