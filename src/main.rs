use clap::Parser;
use tracing_subscriber::EnvFilter;

use scdemux::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("scdemux=debug,info")
    } else {
        EnvFilter::new("scdemux=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
    cli::install_panic_hook();

    match cli.command {
        cli::Commands::Demux(args) => {
            cli::demux::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Detect(args) => {
            cli::detect::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Strategies(args) => {
            cli::strategies::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Codes(args) => {
            cli::codes::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
