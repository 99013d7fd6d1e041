use std::sync::Arc;

use crate::codes::{CodeSummary, FuzzyResolver};
use crate::core::read::ReadPair;
use crate::core::tags::RecodedRecord;
use crate::strategy::illumina::IlluminaBase;
use crate::strategy::{DemuxError, Strategy, StrategyError};

/// Layout of a protocol that places a UMI and a cell barcode at the start of read 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UmiBarcodeSpec {
    pub short_name: &'static str,
    pub long_name: &'static str,
    pub description: &'static str,
    /// Code family the barcode is resolved against
    pub code_alias: &'static str,
    pub umi_offset: usize,
    pub umi_length: usize,
    pub barcode_offset: usize,
    pub barcode_length: usize,
    /// Sequence that must directly follow the UMI and barcode. It is part of
    /// the insert and is not trimmed.
    pub anchor: Option<&'static str>,
}

impl UmiBarcodeSpec {
    /// Bases removed from the start of read 1
    pub const fn trim_length(&self) -> usize {
        let umi_end = self.umi_offset + self.umi_length;
        let barcode_end = self.barcode_offset + self.barcode_length;
        if umi_end > barcode_end {
            umi_end
        } else {
            barcode_end
        }
    }

    /// Minimum read-1 length this layout can be read from
    pub const fn required_length(&self) -> usize {
        match self.anchor {
            Some(anchor) => self.trim_length() + anchor.len(),
            None => self.trim_length(),
        }
    }
}

pub const CS1C8U4: UmiBarcodeSpec = UmiBarcodeSpec {
    short_name: "CS1C8U4",
    long_name: "CELSeq 1, 8bp CB, 4bp UMI",
    description: "CEL-Seq1: read 1 starts with an 8 bp cell barcode followed by a 4 bp UMI",
    code_alias: "celseq1",
    umi_offset: 8,
    umi_length: 4,
    barcode_offset: 0,
    barcode_length: 8,
    anchor: None,
};

pub const CS2C8U6: UmiBarcodeSpec = UmiBarcodeSpec {
    short_name: "CS2C8U6",
    long_name: "CELSeq 2, 8bp CB, 6bp UMI",
    description: "CEL-Seq2: read 1 starts with a 6 bp UMI followed by an 8 bp cell barcode",
    code_alias: "celseq2",
    umi_offset: 0,
    umi_length: 6,
    barcode_offset: 6,
    barcode_length: 8,
    anchor: None,
};

pub const CS2C8U8: UmiBarcodeSpec = UmiBarcodeSpec {
    short_name: "CS2C8U8",
    long_name: "CELSeq 2, 8bp CB, 8bp UMI",
    description: "CEL-Seq2 with extended UMI: read 1 starts with an 8 bp UMI followed by an 8 bp cell barcode",
    code_alias: "celseq2",
    umi_offset: 0,
    umi_length: 8,
    barcode_offset: 8,
    barcode_length: 8,
    anchor: None,
};

pub const MSPJIC8U3: UmiBarcodeSpec = UmiBarcodeSpec {
    short_name: "MSPJIC8U3",
    long_name: "MspJI, 8bp CB, 3bp UMI",
    description: "MspJI single-cell methylation: read 1 starts with a 3 bp UMI followed by an 8 bp cell barcode",
    code_alias: "maya_mspj1",
    umi_offset: 0,
    umi_length: 3,
    barcode_offset: 3,
    barcode_length: 8,
    anchor: None,
};

pub const NLAIII384C8U3: UmiBarcodeSpec = UmiBarcodeSpec {
    short_name: "NLAIII384C8U3",
    long_name: "NlaIII 384, 8bp CB, 3bp UMI",
    description: "NlaIII single-cell: read 1 starts with a 3 bp UMI and an 8 bp cell barcode, followed by the CATG restriction site",
    code_alias: "lennart96NLA",
    umi_offset: 0,
    umi_length: 3,
    barcode_offset: 3,
    barcode_length: 8,
    anchor: Some("CATG"),
};

/// Cell barcode + UMI classification on top of the Illumina base recoding.
///
/// Adds `BC` (raw barcode), `bi` (barcode identifier), `RX` (UMI), `SM`
/// (`<library>_<bi>`) and `dt`, and trims the UMI and barcode from read 1.
#[derive(Debug)]
pub struct UmiBarcodeStrategy {
    spec: &'static UmiBarcodeSpec,
    barcodes: Arc<FuzzyResolver>,
    base: IlluminaBase,
}

impl UmiBarcodeStrategy {
    /// # Errors
    ///
    /// Returns `StrategyError::InvalidLayout` if the layout has an empty
    /// barcode or its barcode length differs from the code family's.
    pub fn new(
        spec: &'static UmiBarcodeSpec,
        barcodes: Arc<FuzzyResolver>,
        base: IlluminaBase,
    ) -> Result<Self, StrategyError> {
        if spec.barcode_length == 0 {
            return Err(StrategyError::InvalidLayout {
                strategy: spec.short_name.to_string(),
                reason: "barcode length is zero".to_string(),
            });
        }
        if barcodes.sequence_length() != spec.barcode_length {
            return Err(StrategyError::InvalidLayout {
                strategy: spec.short_name.to_string(),
                reason: format!(
                    "layout reads a {} bp barcode but code family '{}' has {} bp codes",
                    spec.barcode_length,
                    barcodes.alias(),
                    barcodes.sequence_length()
                ),
            });
        }
        Ok(Self {
            spec,
            barcodes,
            base,
        })
    }

    pub fn spec(&self) -> &UmiBarcodeSpec {
        self.spec
    }
}

impl Strategy for UmiBarcodeStrategy {
    fn short_name(&self) -> &str {
        self.spec.short_name
    }

    fn long_name(&self) -> &str {
        self.spec.long_name
    }

    fn description(&self) -> &str {
        self.spec.description
    }

    fn auto_detectable(&self) -> bool {
        true
    }

    fn demultiplex(
        &self,
        pair: &ReadPair,
        library: Option<&str>,
    ) -> Result<RecodedRecord, DemuxError> {
        let mut tags = self.base.base_tags(pair, library)?;
        let r1 = pair
            .r1()
            .ok_or_else(|| DemuxError::non_multiplexable("read pair has no mates"))?;

        let spec = self.spec;
        let required = spec.required_length();
        if r1.len() < required {
            return Err(DemuxError::non_multiplexable(format!(
                "read 1 is {} bp, layout needs {required} bp",
                r1.len()
            )));
        }

        let barcode = &r1.sequence[spec.barcode_offset..spec.barcode_offset + spec.barcode_length];
        let umi = &r1.sequence[spec.umi_offset..spec.umi_offset + spec.umi_length];

        if let Some(anchor) = spec.anchor {
            let start = spec.trim_length();
            if &r1.sequence[start..start + anchor.len()] != anchor.as_bytes() {
                return Err(DemuxError::non_multiplexable(format!(
                    "anchor {anchor} not found after barcode"
                )));
            }
        }

        let barcode = String::from_utf8_lossy(barcode);
        let identifier = self.barcodes.resolve(barcode.as_bytes()).ok_or_else(|| {
            DemuxError::non_multiplexable(format!("barcode {barcode} is not resolved"))
        })?;

        tags.insert("BC", &barcode);
        tags.insert("bi", identifier);
        tags.insert("RX", String::from_utf8_lossy(umi));
        match library {
            Some(library) => tags.insert("SM", format!("{library}_{identifier}")),
            None => tags.insert("SM", identifier),
        }
        tags.insert("dt", spec.short_name);

        let mut mates = Vec::with_capacity(pair.mates.len());
        mates.push(r1.trim_start(spec.trim_length()));
        mates.extend(pair.mates.iter().skip(1).cloned());

        Ok(RecodedRecord::new(tags, mates))
    }

    fn code_summary(&self) -> Vec<CodeSummary> {
        let mut summaries = vec![self.barcodes.summary()];
        summaries.extend(self.base.code_summary());
        summaries
    }
}
