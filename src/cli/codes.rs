use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::codes::{CodeLibrary, CodeSummary, ResolverConfig};
use crate::utils::validation::DEFAULT_MAX_EXPANDED_ENTRIES;

#[derive(Args)]
pub struct CodesArgs {
    /// Directory of code tables
    #[arg(required = true)]
    pub dir: PathBuf,

    /// Hamming distance to expand the tables with
    #[arg(short, long, default_value_t = 0)]
    pub distance: usize,

    /// Maximum number of expanded sequences per code table
    #[arg(long, default_value_t = DEFAULT_MAX_EXPANDED_ENTRIES)]
    pub max_expanded: u64,

    /// Resolve these sequences against every table
    #[arg(long, value_delimiter = ',')]
    pub resolve: Vec<String>,
}

pub fn run(args: CodesArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let library = CodeLibrary::load_dir(
        &args.dir,
        ResolverConfig {
            max_distance: args.distance,
            max_expanded_entries: args.max_expanded,
        },
    )?;

    if library.is_empty() {
        eprintln!("Warning: no code tables found in {}", args.dir.display());
        return Ok(());
    }

    let summaries: Vec<CodeSummary> = library.resolvers().map(|r| r.summary()).collect();

    match format {
        OutputFormat::Text => {
            for summary in &summaries {
                if verbose {
                    println!("{summary}");
                } else {
                    println!(
                        "{}: {} codes of {} bp, distance {} ({} expanded, {} ambiguous dropped)",
                        summary.alias,
                        summary.target_count,
                        summary.sequence_length,
                        summary.max_distance,
                        summary.expanded_entries,
                        summary.ambiguous_entries
                    );
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Tsv => {
            println!("alias\ttargets\tlength\tdistance\texpanded\tambiguous");
            for s in &summaries {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    s.alias,
                    s.target_count,
                    s.sequence_length,
                    s.max_distance,
                    s.expanded_entries,
                    s.ambiguous_entries
                );
            }
        }
    }

    if !args.resolve.is_empty() {
        for sequence in &args.resolve {
            let sequence = sequence.trim().to_ascii_uppercase();
            for resolver in library.resolvers() {
                let found = resolver.resolve(sequence.as_bytes()).unwrap_or("-");
                println!("{sequence}\t{}\t{found}", resolver.alias());
            }
        }
    }

    Ok(())
}
