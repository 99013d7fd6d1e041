use std::path::PathBuf;

use clap::Args;

use crate::cli::report::print_manifest_report;
use crate::cli::{CodeArgs, DetectionArgs, InputArgs, OutputFormat};
use crate::demux::pipeline::{Demultiplexer, FastqSinkFactory, RunConfig, Selection};

#[derive(Args)]
pub struct DemuxArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub codes: CodeArgs,

    #[command(flatten)]
    pub detection: DetectionArgs,

    /// Strategies to apply to every library (comma-separated); disables auto-detection
    #[arg(long = "use", value_delimiter = ',')]
    pub use_strategies: Vec<String>,

    /// Stop each library after this many read pairs
    #[arg(short = 'n', long)]
    pub max_pairs: Option<u64>,

    /// Do not write rejected read pairs
    #[arg(long)]
    pub no_rejects: bool,

    /// Output directory; one sub-directory per library
    #[arg(short, long, default_value = "raw_demultiplexed")]
    pub output: PathBuf,

    /// Also write the run report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl DemuxArgs {
    pub fn selection(&self) -> Selection {
        if self.use_strategies.is_empty() {
            Selection::AutoDetect(self.detection.config())
        } else {
            Selection::Manual(self.use_strategies.clone())
        }
    }
}

pub fn run(args: DemuxArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let manifest = args.input.manifest()?;
    let registry = args.codes.load_registry(&args.detection.ignore, verbose)?;

    let config = RunConfig {
        max_pairs: args.max_pairs,
        write_rejects: !args.no_rejects,
    };
    let demultiplexer = Demultiplexer::new(&registry, args.selection(), config)?;

    if verbose {
        eprintln!(
            "Demultiplexing {} libraries into {}",
            manifest.len(),
            args.output.display()
        );
    }

    let mut sinks = FastqSinkFactory::new(&args.output);
    let report = demultiplexer.run(&manifest, &mut sinks)?;

    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        if verbose {
            eprintln!("Wrote report to {}", path.display());
        }
    }

    print_manifest_report(&report, format, verbose)?;

    let skipped = report.libraries.iter().filter(|l| l.skipped()).count();
    if skipped > 0 {
        eprintln!("Warning: {skipped} libraries were not demultiplexed (no strategy selected)");
    }
    Ok(())
}
