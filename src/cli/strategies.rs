use clap::Args;
use serde::Serialize;

use crate::cli::{CodeArgs, OutputFormat};
use crate::strategy::registry::ConstructionFailure;
use crate::strategy::StrategyInfo;

#[derive(Args)]
pub struct StrategiesArgs {
    #[command(flatten)]
    pub codes: CodeArgs,

    /// Only list strategies eligible for auto-detection
    #[arg(long)]
    pub auto_only: bool,

    /// Strategies never loaded (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub ignore: Vec<String>,
}

#[derive(Serialize)]
struct StrategyListing<'a> {
    strategies: Vec<StrategyInfo>,
    unavailable: &'a [ConstructionFailure],
}

pub fn run(args: StrategiesArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let registry = args.codes.load_registry(&args.ignore, verbose)?;

    let strategies: Vec<StrategyInfo> = registry
        .strategies()
        .iter()
        .filter(|s| !args.auto_only || s.auto_detectable())
        .map(|s| StrategyInfo::of(s.as_ref()))
        .collect();

    match format {
        OutputFormat::Text => {
            for info in &strategies {
                println!(
                    "{:<16} {}{}",
                    info.short_name,
                    info.long_name,
                    if info.auto_detectable { "" } else { " (manual only)" }
                );
                println!("   {}", info.description);
                if verbose {
                    for code in &info.codes {
                        println!("   {code}");
                    }
                }
            }
            if !registry.failures().is_empty() {
                println!("\nUnavailable:");
                for failure in registry.failures() {
                    println!("{:<16} {}", failure.short_name, failure.reason);
                }
            }
        }
        OutputFormat::Json => {
            let listing = StrategyListing {
                strategies,
                unavailable: registry.failures(),
            };
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        OutputFormat::Tsv => {
            println!("short_name\tlong_name\tauto_detectable\tcode_families\tavailable");
            for info in &strategies {
                let families: Vec<&str> = info.codes.iter().map(|c| c.alias.as_str()).collect();
                println!(
                    "{}\t{}\t{}\t{}\ttrue",
                    info.short_name,
                    info.long_name,
                    info.auto_detectable,
                    families.join(",")
                );
            }
            for failure in registry.failures() {
                println!("{}\t\t\t\tfalse", failure.short_name);
            }
        }
    }

    Ok(())
}
