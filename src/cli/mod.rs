//! Command-line interface for scdemux.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **demux**: Select strategies and demultiplex every library
//! - **detect**: Auto-detect strategies per library without writing reads
//! - **strategies**: List the available strategies and their code families
//! - **codes**: Summarize a directory of code tables
//!
//! ## Usage
//!
//! ```text
//! # Demultiplex one library, auto-detecting the protocol
//! scdemux demux --library PL1 --r1 PL1_R1.fastq.gz --r2 PL1_R2.fastq.gz
//!
//! # Use fixed strategies for every library of a manifest
//! scdemux demux --manifest libraries.json --use CS2C8U6,CS2C8U8
//!
//! # Dry run, JSON output
//! scdemux detect --manifest libraries.json --format json
//! ```

use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use tracing::{error, warn};

use crate::codes::resolver::{DEFAULT_BARCODE_DISTANCE, DEFAULT_INDEX_DISTANCE};
use crate::codes::{CodeLibrary, ResolverConfig};
use crate::core::manifest::LibraryManifest;
use crate::demux::detect::{
    DetectionConfig, DEFAULT_MAX_METHODS, DEFAULT_MIN_PERCENT, DEFAULT_SAMPLE_SIZE,
};
use crate::demux::engine::panic_message;
use crate::parsing::manifest::parse_manifest_file;
use crate::strategy::{StrategyContext, StrategyRegistry};
use crate::utils::validation::DEFAULT_MAX_EXPANDED_ENTRIES;

pub mod codes;
pub mod demux;
pub mod detect;
pub mod report;
pub mod strategies;

#[derive(Parser)]
#[command(name = "scdemux")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Demultiplex single-cell sequencing libraries by cell barcode")]
#[command(
    long_about = "scdemux routes read pairs to cells and samples by matching embedded barcodes against known code tables.\n\nIt provides:\n- Sequencing-error tolerant barcode lookup (Hamming distance)\n- Automatic detection of the barcoding protocol of each library\n- Recoded FASTQ output with cell, UMI and sample tags in the read name"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Demultiplex the libraries of a manifest
    Demux(demux::DemuxArgs),

    /// Detect the strategies of each library without writing output
    Detect(detect::DetectArgs),

    /// List available strategies
    Strategies(strategies::StrategiesArgs),

    /// Summarize a directory of code tables
    Codes(codes::CodesArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Report panics through `tracing` as a single error line.
///
/// The hook also runs for strategy panics that the classification engine
/// catches and counts as defects.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!(" at {}:{}", l.file(), l.line()))
            .unwrap_or_default();
        error!("panicked{location}: {}", panic_message(info.payload()));
    }));
}

/// Code table locations and expansion distances
#[derive(Args, Debug, Clone)]
pub struct CodeArgs {
    /// Directory of cell barcode tables
    #[arg(short, long, default_value = "barcodes")]
    pub barcodes: PathBuf,

    /// Directory of sequencing index tables
    #[arg(long)]
    pub indices: Option<PathBuf>,

    /// Index table used to resolve the sequencing index (defaults to the only one)
    #[arg(long)]
    pub index_alias: Option<String>,

    /// Hamming distance for cell barcodes
    #[arg(long, visible_alias = "hd", default_value_t = DEFAULT_BARCODE_DISTANCE)]
    pub barcode_distance: usize,

    /// Hamming distance for sequencing indices
    #[arg(long, visible_alias = "hdi", default_value_t = DEFAULT_INDEX_DISTANCE)]
    pub index_distance: usize,

    /// Maximum number of expanded sequences per code table
    #[arg(long, default_value_t = DEFAULT_MAX_EXPANDED_ENTRIES)]
    pub max_expanded: u64,
}

impl CodeArgs {
    /// Load the code libraries for strategy construction
    ///
    /// # Errors
    ///
    /// Returns an error if a code directory or table cannot be loaded.
    pub fn load_context(&self) -> anyhow::Result<StrategyContext> {
        let barcodes = CodeLibrary::load_dir(
            &self.barcodes,
            ResolverConfig {
                max_distance: self.barcode_distance,
                max_expanded_entries: self.max_expanded,
            },
        )?;
        let indices = match &self.indices {
            Some(dir) => CodeLibrary::load_dir(
                dir,
                ResolverConfig {
                    max_distance: self.index_distance,
                    max_expanded_entries: self.max_expanded,
                },
            )?,
            None => CodeLibrary::new(),
        };

        if let Some(alias) = &self.index_alias {
            if indices.get(alias).is_none() {
                bail!("Index table '{alias}' not found");
            }
        }

        Ok(StrategyContext {
            barcodes,
            indices,
            index_alias: self.index_alias.clone(),
        })
    }

    /// Load code libraries and build the strategy registry
    ///
    /// # Errors
    ///
    /// Returns an error if a code directory or table cannot be loaded.
    pub fn load_registry(&self, ignore: &[String], verbose: bool) -> anyhow::Result<StrategyRegistry> {
        let context = self.load_context()?;
        let registry = StrategyRegistry::discover(&context, ignore);
        if verbose {
            eprintln!(
                "Loaded {} strategies ({} unavailable)",
                registry.len(),
                registry.failures().len()
            );
        }
        Ok(registry)
    }
}

/// Input libraries: a manifest file, or a single library given inline
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// JSON manifest of libraries, lanes and mate files
    #[arg(short, long, conflicts_with_all = ["library", "r1", "r2"])]
    pub manifest: Option<PathBuf>,

    /// Library name for --r1/--r2 input
    #[arg(short, long, requires = "r1")]
    pub library: Option<String>,

    /// Read 1 files, one per lane
    #[arg(long, num_args = 1..)]
    pub r1: Vec<PathBuf>,

    /// Read 2 files, one per lane, in the same order as --r1
    #[arg(long, num_args = 1..)]
    pub r2: Vec<PathBuf>,
}

impl InputArgs {
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be loaded or no input was given.
    pub fn manifest(&self) -> anyhow::Result<LibraryManifest> {
        if let Some(path) = &self.manifest {
            return Ok(parse_manifest_file(path)?);
        }
        if self.r1.is_empty() {
            bail!("Either --manifest or --r1 is required");
        }
        if !self.r2.is_empty() && self.r2.len() != self.r1.len() {
            bail!(
                "--r1 has {} files but --r2 has {}",
                self.r1.len(),
                self.r2.len()
            );
        }

        let library = self.library.clone().unwrap_or_else(|| "library".to_string());
        let mut manifest = LibraryManifest::new();
        for (i, r1) in self.r1.iter().enumerate() {
            let lane = format!("{}", i + 1);
            manifest.add_file(&library, &lane, "R1", r1);
            if let Some(r2) = self.r2.get(i) {
                manifest.add_file(&library, &lane, "R2", r2);
            }
        }
        manifest.validate()?;
        Ok(manifest)
    }
}

/// Auto-detection parameters
#[derive(Args, Debug, Clone)]
pub struct DetectionArgs {
    /// Number of read pairs sampled per library
    #[arg(long, visible_alias = "dsize", default_value_t = DEFAULT_SAMPLE_SIZE)]
    pub sample_size: u64,

    /// Maximum number of strategies selected per library
    #[arg(long, visible_alias = "mxa", default_value_t = DEFAULT_MAX_METHODS)]
    pub max_methods: usize,

    /// Minimum yield (percent of sampled pairs) for a strategy to be selected
    #[arg(long, visible_alias = "mia", default_value_t = DEFAULT_MIN_PERCENT)]
    pub min_percent: f64,

    /// Strategies never loaded (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub ignore: Vec<String>,
}

impl DetectionArgs {
    pub fn config(&self) -> DetectionConfig {
        if self.max_methods == 0 {
            warn!("--max-methods is 0, no strategy can be selected");
        }
        DetectionConfig {
            sample_size: self.sample_size,
            max_methods: self.max_methods,
            min_percent: self.min_percent,
        }
    }
}

