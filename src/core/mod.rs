//! Core data types for single-cell demultiplexing.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`Code`]: A reference (sequence, identifier) pair from a barcode or index table
//! - [`ReadPair`], [`Mate`]: The mates of one sequencing fragment
//! - [`TagSet`], [`RecodedRecord`]: A classified read pair and the tags describing it
//! - [`YieldReport`]: Per-strategy success counts of one run
//! - [`LibraryManifest`]: Input files grouped by library, lane and mate
//!
//! ## Recoded Read Names
//!
//! Classified reads carry their annotations in the read name as `;`-separated
//! `KEY:value` tags:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | Is, RN, Fc, La, Ti, CX, CY | Illumina instrument, run, flowcell, lane, tile, coordinates |
//! | Rn | Read name, when not in Illumina format |
//! | Fi, CN | Filter flag, control number |
//! | Co | Header comment, when not in Illumina format |
//! | aA, aI | Raw sequencing index, resolved index identifier |
//! | LY | Library |
//! | BC, bi | Raw cell barcode, resolved barcode identifier |
//! | RX | UMI |
//! | SM | Sample: `<library>_<bi>` |
//! | dt | Strategy that classified the read |
//!
//! [`Code`]: types::Code
//! [`ReadPair`]: read::ReadPair
//! [`Mate`]: read::Mate
//! [`TagSet`]: tags::TagSet
//! [`RecodedRecord`]: tags::RecodedRecord
//! [`YieldReport`]: types::YieldReport
//! [`LibraryManifest`]: manifest::LibraryManifest

pub mod manifest;
pub mod read;
pub mod tags;
pub mod types;
