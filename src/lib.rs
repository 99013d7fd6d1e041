//! # scdemux
//!
//! A library for demultiplexing single-cell sequencing libraries.
//!
//! Single-cell protocols embed short codes in the reads: a cell barcode, a
//! unique molecule identifier (UMI), and the sequencing index of the sample.
//! Which protocol a library was prepared with is often not recorded, and
//! sequencing errors mean observed codes do not always match the reference
//! set exactly.
//!
//! `scdemux` resolves observed codes against reference tables while
//! tolerating substitutions, detects the protocol of each library by sampling
//! its reads, and recodes every read pair with cell, UMI and sample tags.
//!
//! ## Features
//!
//! - **Fuzzy code lookup**: Hamming-distance expansion, ambiguous sequences are dropped
//! - **Pluggable strategies**: one per barcoding protocol, built from a static registry
//! - **Auto-detection**: per-library strategy selection from sample yields
//! - **Failure isolation**: one failing strategy or read pair never aborts a run
//!
//! ## Example
//!
//! ```rust,no_run
//! use scdemux::codes::{CodeLibrary, ResolverConfig};
//! use scdemux::demux::pipeline::{Demultiplexer, FastqSinkFactory, RunConfig, Selection};
//! use scdemux::demux::detect::DetectionConfig;
//! use scdemux::parsing::manifest::parse_manifest_file;
//! use scdemux::strategy::{StrategyContext, StrategyRegistry};
//! use std::path::Path;
//!
//! let barcodes = CodeLibrary::load_dir(Path::new("barcodes"), ResolverConfig::default()).unwrap();
//! let context = StrategyContext::new(barcodes, CodeLibrary::new());
//! let registry = StrategyRegistry::discover(&context, &[]);
//!
//! let manifest = parse_manifest_file(Path::new("libraries.json")).unwrap();
//! let demux = Demultiplexer::new(
//!     &registry,
//!     Selection::AutoDetect(DetectionConfig::default()),
//!     RunConfig::default(),
//! )
//! .unwrap();
//!
//! let report = demux.run(&manifest, &mut FastqSinkFactory::new("out")).unwrap();
//! for library in &report.libraries {
//!     println!("{}: {:?}", library.library, library.selected);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`codes`]: Code tables, fuzzy resolvers and code libraries
//! - [`core`]: Core data types for reads, tags, yields and manifests
//! - [`strategy`]: Barcoding protocols and the strategy registry
//! - [`demux`]: Classification engine, auto-detection and manifest processing
//! - [`parsing`]: Parsers for code tables, FASTQ and manifests
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod codes;
pub mod core;
pub mod demux;
pub mod parsing;
pub mod strategy;
pub mod utils;

// Re-export commonly used types for convenience
pub use codes::{CodeLibrary, FuzzyResolver, ResolverConfig};
pub use crate::core::read::{Mate, ReadPair};
pub use crate::core::tags::{RecodedRecord, TagSet};
pub use crate::core::types::*;
pub use demux::engine::ClassificationEngine;
pub use strategy::{DemuxError, Strategy, StrategyRegistry};
