//! Barcoding protocols.
//!
//! A [`Strategy`] knows how to slice a read pair into code fields, which
//! resolvers to consult, and how to recode the pair. Classification returns a
//! [`DemuxError`] rather than panicking: `NonMultiplexable` when the pair does
//! not fit the protocol, `Defect` when the strategy itself misbehaves.
//!
//! | Short name | Read-1 layout | Code family |
//! |------------|---------------|-------------|
//! | `ILLU` | none (base formatter) | index, optional |
//! | `CS1C8U4` | barcode 8, UMI 4 | `celseq1` |
//! | `CS2C8U6` | UMI 6, barcode 8 | `celseq2` |
//! | `CS2C8U8` | UMI 8, barcode 8 | `celseq2` |
//! | `MSPJIC8U3` | UMI 3, barcode 8 | `maya_mspj1` |
//! | `NLAIII384C8U3` | UMI 3, barcode 8, `CATG` | `lennart96NLA` |

use serde::Serialize;
use thiserror::Error;

use crate::codes::CodeSummary;
use crate::core::read::ReadPair;
use crate::core::tags::RecodedRecord;

pub mod illumina;
pub mod registry;
pub mod umi_barcode;

pub use illumina::IlluminaBase;
pub use registry::{StrategyContext, StrategyRegistry};
pub use umi_barcode::{UmiBarcodeSpec, UmiBarcodeStrategy};

/// Why a strategy did not classify one read pair
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DemuxError {
    /// The pair does not fit this protocol; the pair goes to the reject path
    #[error("not multiplexable: {0}")]
    NonMultiplexable(String),

    /// The strategy failed for reasons unrelated to the read content
    #[error("strategy defect: {0}")]
    Defect(String),
}

impl DemuxError {
    pub fn non_multiplexable(reason: impl Into<String>) -> Self {
        Self::NonMultiplexable(reason.into())
    }
}

/// Errors raised while constructing a strategy
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("code family '{alias}' required by {strategy} is not loaded (available: {available})")]
    MissingCodeFamily {
        strategy: String,
        alias: String,
        available: String,
    },

    #[error("invalid layout for {strategy}: {reason}")]
    InvalidLayout { strategy: String, reason: String },

    #[error("a strategy named '{0}' is already registered")]
    DuplicateName(String),
}

/// One barcoding protocol.
///
/// Implementations hold shared, read-only resolvers and no per-stream state:
/// classifying a pair depends on that pair only.
pub trait Strategy: Send + Sync {
    /// Unique machine-usable name
    fn short_name(&self) -> &str;

    /// Human-readable name
    fn long_name(&self) -> &str;

    fn description(&self) -> &str;

    /// Whether auto-detection may select this strategy
    fn auto_detectable(&self) -> bool;

    /// Classify and recode one read pair.
    ///
    /// # Errors
    ///
    /// Returns `DemuxError::NonMultiplexable` if the pair does not satisfy the
    /// protocol, or `DemuxError::Defect` for failures of the strategy itself.
    fn demultiplex(
        &self,
        pair: &ReadPair,
        library: Option<&str>,
    ) -> Result<RecodedRecord, DemuxError>;

    /// Code families consulted by this strategy
    fn code_summary(&self) -> Vec<CodeSummary> {
        Vec::new()
    }
}

/// Serializable description of a strategy, for listings and reports
#[derive(Debug, Clone, Serialize)]
pub struct StrategyInfo {
    pub short_name: String,
    pub long_name: String,
    pub description: String,
    pub auto_detectable: bool,
    pub codes: Vec<CodeSummary>,
}

impl StrategyInfo {
    pub fn of(strategy: &dyn Strategy) -> Self {
        Self {
            short_name: strategy.short_name().to_string(),
            long_name: strategy.long_name().to_string(),
            description: strategy.description().to_string(),
            auto_detectable: strategy.auto_detectable(),
            codes: strategy.code_summary(),
        }
    }
}
