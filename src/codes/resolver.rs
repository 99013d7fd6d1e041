use itertools::Itertools;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::codes::table::CodeTable;
use crate::utils::validation::{estimate_expansion, ALPHABET, DEFAULT_MAX_EXPANDED_ENTRIES};

/// Default Hamming distance for cell barcodes
pub const DEFAULT_BARCODE_DISTANCE: usize = 0;

/// Default Hamming distance for sequencing indices
pub const DEFAULT_INDEX_DISTANCE: usize = 1;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Code table '{0}' has no codes")]
    EmptyTable(String),

    #[error(
        "Expanding '{alias}' to distance {max_distance} would create ~{estimated} entries (limit {limit})"
    )]
    ExpansionTooLarge {
        alias: String,
        max_distance: usize,
        estimated: u64,
        limit: u64,
    },
}

/// Parameters for building a [`FuzzyResolver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum number of substitutions tolerated
    pub max_distance: usize,
    /// Upper bound on the expanded mapping size, checked before expansion
    pub max_expanded_entries: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_BARCODE_DISTANCE,
            max_expanded_entries: DEFAULT_MAX_EXPANDED_ENTRIES,
        }
    }
}

impl ResolverConfig {
    pub fn with_distance(max_distance: usize) -> Self {
        Self {
            max_distance,
            ..Self::default()
        }
    }
}

/// Diagnostic view of a resolver
#[derive(Debug, Clone, Serialize)]
pub struct CodeSummary {
    pub alias: String,
    pub target_count: usize,
    pub sequence_length: usize,
    pub max_distance: usize,
    pub expanded_entries: usize,
    pub ambiguous_entries: usize,
    pub identifiers: Vec<String>,
}

impl std::fmt::Display for CodeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} codes of {} bp, distance {} ({} expanded, {} ambiguous dropped): {}",
            self.alias,
            self.target_count,
            self.sequence_length,
            self.max_distance,
            self.expanded_entries,
            self.ambiguous_entries,
            self.identifiers.join(", ")
        )
    }
}

/// Resolves observed sequences to code identifiers, tolerating up to
/// `max_distance` substitutions.
///
/// Every sequence within `max_distance` of a reference code is precomputed at
/// construction. A sequence reachable from codes with different identifiers is
/// ambiguous and dropped from the mapping, even when it is itself a reference
/// sequence. The resolver is immutable once built.
#[derive(Debug)]
pub struct FuzzyResolver {
    table: CodeTable,
    max_distance: usize,
    /// Expanded sequence -> position of the code in `table`
    expanded: HashMap<Vec<u8>, usize>,
    ambiguous: usize,
}

impl FuzzyResolver {
    /// Expand a code table.
    ///
    /// # Errors
    ///
    /// Returns `ResolverError::EmptyTable` for a table without codes, or
    /// `ResolverError::ExpansionTooLarge` when the estimated mapping size
    /// exceeds `config.max_expanded_entries`.
    pub fn new(table: CodeTable, config: ResolverConfig) -> Result<Self, ResolverError> {
        let Some(length) = table.sequence_length() else {
            return Err(ResolverError::EmptyTable(table.alias().to_string()));
        };

        let estimated = estimate_expansion(table.len(), length, config.max_distance);
        if estimated > config.max_expanded_entries {
            return Err(ResolverError::ExpansionTooLarge {
                alias: table.alias().to_string(),
                max_distance: config.max_distance,
                estimated,
                limit: config.max_expanded_entries,
            });
        }

        // None marks a sequence claimed by codes with different identifiers
        let mut slots: HashMap<Vec<u8>, Option<usize>> = HashMap::new();
        for (position, code) in table.codes().iter().enumerate() {
            let sequence = code.sequence.as_bytes();
            for distance in 0..=config.max_distance.min(length) {
                for variant in substitutions(sequence, distance) {
                    match slots.entry(variant) {
                        Entry::Vacant(slot) => {
                            slot.insert(Some(position));
                        }
                        Entry::Occupied(mut slot) => {
                            if let Some(prior) = *slot.get() {
                                if table.codes()[prior].identifier != code.identifier {
                                    slot.insert(None);
                                }
                            }
                        }
                    }
                }
            }
        }

        let total = slots.len();
        let expanded: HashMap<Vec<u8>, usize> = slots
            .into_iter()
            .filter_map(|(sequence, position)| position.map(|p| (sequence, p)))
            .collect();
        let ambiguous = total - expanded.len();

        debug!(
            "Expanded '{}' ({} codes) to {} sequences at distance {}, {} ambiguous",
            table.alias(),
            table.len(),
            expanded.len(),
            config.max_distance,
            ambiguous
        );

        Ok(Self {
            table,
            max_distance: config.max_distance,
            expanded,
            ambiguous,
        })
    }

    /// Identifier for an observed sequence, or None when it is unknown or ambiguous
    #[inline]
    pub fn resolve(&self, observed: &[u8]) -> Option<&str> {
        self.expanded
            .get(observed)
            .map(|&p| self.table.codes()[p].identifier.as_str())
    }

    pub fn table(&self) -> &CodeTable {
        &self.table
    }

    pub fn alias(&self) -> &str {
        self.table.alias()
    }

    pub fn max_distance(&self) -> usize {
        self.max_distance
    }

    /// Number of reference codes
    pub fn target_count(&self) -> usize {
        self.table.len()
    }

    /// Length of the observed sequence this resolver expects
    pub fn sequence_length(&self) -> usize {
        self.table.sequence_length().unwrap_or(0)
    }

    /// Number of sequences in the expanded mapping
    pub fn expanded_len(&self) -> usize {
        self.expanded.len()
    }

    /// Number of sequences dropped as ambiguous
    pub fn ambiguous_len(&self) -> usize {
        self.ambiguous
    }

    pub fn summary(&self) -> CodeSummary {
        CodeSummary {
            alias: self.alias().to_string(),
            target_count: self.target_count(),
            sequence_length: self.sequence_length(),
            max_distance: self.max_distance,
            expanded_entries: self.expanded.len(),
            ambiguous_entries: self.ambiguous,
            identifiers: self
                .table
                .identifiers()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Every sequence at exactly `distance` substitutions from `sequence`.
/// Each variant is produced once.
fn substitutions(sequence: &[u8], distance: usize) -> impl Iterator<Item = Vec<u8>> + '_ {
    (0..sequence.len())
        .combinations(distance)
        .flat_map(move |positions| {
            let mut choices: Vec<Vec<u8>> = sequence.iter().map(|&b| vec![b]).collect();
            for p in positions {
                choices[p] = ALPHABET
                    .iter()
                    .copied()
                    .filter(|&b| b != sequence[p])
                    .collect();
            }
            choices.into_iter().multi_cartesian_product()
        })
}
