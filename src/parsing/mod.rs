//! Parsers for the inputs of a demultiplexing run.
//!
//! This module provides parsers for:
//!
//! - **Code tables**: barcode and index definitions, one family per file
//! - **FASTQ files**: plain or gzip-compressed, streamed as read pairs
//! - **Library manifests**: JSON grouping of input files by library, lane and mate
//!
//! ## Example
//!
//! ```rust,no_run
//! use scdemux::parsing::fastq::ReadPairReader;
//!
//! let reader = ReadPairReader::open(&["lib_R1.fastq.gz", "lib_R2.fastq.gz"]).unwrap();
//! for pair in reader {
//!     let pair = pair.unwrap();
//!     println!("{}", pair.mates[0].name);
//! }
//! ```
//!
//! ## Code Table Format
//!
//! | Column | Description | Required |
//! |--------|-------------|----------|
//! | 1 | Identifier | No (defaults to the 1-based ordinal) |
//! | 2 | Sequence over `ACGTN` | Yes |

pub mod codes;
pub mod fastq;
pub mod manifest;
