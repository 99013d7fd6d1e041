use clap::Args;

use crate::cli::report::print_manifest_report;
use crate::cli::{CodeArgs, DetectionArgs, InputArgs, OutputFormat};
use crate::demux::pipeline::{Demultiplexer, RunConfig, Selection};

#[derive(Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub codes: CodeArgs,

    #[command(flatten)]
    pub detection: DetectionArgs,
}

pub fn run(args: DetectArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let manifest = args.input.manifest()?;
    let registry = args.codes.load_registry(&args.detection.ignore, verbose)?;

    let demultiplexer = Demultiplexer::new(
        &registry,
        Selection::AutoDetect(args.detection.config()),
        RunConfig::default(),
    )?;
    let report = demultiplexer.plan(&manifest)?;

    print_manifest_report(&report, format, verbose)
}
