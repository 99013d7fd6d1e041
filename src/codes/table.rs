use std::collections::HashMap;
use thiserror::Error;

use crate::core::types::Code;
use crate::utils::validation::{normalize_sequence, MAX_CODES};

#[derive(Error, Debug)]
pub enum CodeTableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid code table format: {0}")]
    InvalidFormat(String),

    #[error("Invalid sequence '{sequence}' for '{identifier}': only A, C, G, T and N are allowed")]
    InvalidSequence {
        identifier: String,
        sequence: String,
    },

    #[error("Sequence '{sequence}' has length {found}, expected {expected} like the rest of the table")]
    MixedLengths {
        sequence: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate sequence '{sequence}' (identifiers '{first}' and '{second}')")]
    DuplicateSequence {
        sequence: String,
        first: String,
        second: String,
    },

    #[error("Code table '{0}' is empty")]
    Empty(String),

    #[error("Too many codes: {0} exceeds maximum allowed ({MAX_CODES})")]
    TooManyCodes(usize),
}

/// An ordered, immutable set of reference codes for one code family.
///
/// Sequences are unique, upper case and all of the same length; identifiers
/// may repeat.
#[derive(Debug, Clone)]
pub struct CodeTable {
    alias: String,
    codes: Vec<Code>,
    /// Sequence -> position in `codes`
    index: HashMap<String, usize>,
}

impl CodeTable {
    /// Build a table from codes in their source order.
    ///
    /// # Errors
    ///
    /// Returns `CodeTableError` if a sequence is not over `ACGTN`, lengths differ,
    /// a sequence is listed twice, or there are too many codes.
    pub fn new(alias: impl Into<String>, codes: Vec<Code>) -> Result<Self, CodeTableError> {
        if codes.len() > MAX_CODES {
            return Err(CodeTableError::TooManyCodes(codes.len()));
        }

        let mut normalized = Vec::with_capacity(codes.len());
        let mut index = HashMap::with_capacity(codes.len());
        let mut length = None;

        for code in codes {
            let sequence = normalize_sequence(&code.sequence).ok_or_else(|| {
                CodeTableError::InvalidSequence {
                    identifier: code.identifier.clone(),
                    sequence: code.sequence.clone(),
                }
            })?;

            let expected = *length.get_or_insert(sequence.len());
            if sequence.len() != expected {
                return Err(CodeTableError::MixedLengths {
                    found: sequence.len(),
                    sequence,
                    expected,
                });
            }

            if let Some(&prior) = index.get(&sequence) {
                let first: &Code = &normalized[prior];
                return Err(CodeTableError::DuplicateSequence {
                    sequence,
                    first: first.identifier.clone(),
                    second: code.identifier,
                });
            }

            index.insert(sequence.clone(), normalized.len());
            normalized.push(Code::new(sequence, code.identifier));
        }

        Ok(Self {
            alias: alias.into(),
            codes: normalized,
            index,
        })
    }

    /// Name of the code family (e.g. `celseq2`)
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Length shared by every sequence, None for an empty table
    pub fn sequence_length(&self) -> Option<usize> {
        self.codes.first().map(|c| c.sequence.len())
    }

    /// Exact lookup of a reference sequence
    pub fn get(&self, sequence: &str) -> Option<&str> {
        self.index
            .get(sequence)
            .map(|&i| self.codes[i].identifier.as_str())
    }

    /// Distinct identifiers in first-seen order
    pub fn identifiers(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.codes
            .iter()
            .map(|c| c.identifier.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_normalizes_and_indexes() {
        let table = CodeTable::new(
            "bc",
            vec![Code::new("acgt", "1"), Code::new("TTTT", "2")],
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.sequence_length(), Some(4));
        assert_eq!(table.get("ACGT"), Some("1"));
        assert_eq!(table.get("acgt"), None);
        assert_eq!(table.codes()[0].sequence, "ACGT");
    }

    #[test]
    fn test_duplicate_sequence_rejected() {
        let err = CodeTable::new(
            "bc",
            vec![Code::new("ACGT", "1"), Code::new("ACGT", "2")],
        )
        .unwrap_err();
        assert!(matches!(err, CodeTableError::DuplicateSequence { .. }));
    }

    #[test]
    fn test_mixed_lengths_rejected() {
        let err =
            CodeTable::new("bc", vec![Code::new("ACGT", "1"), Code::new("ACG", "2")]).unwrap_err();
        assert!(matches!(
            err,
            CodeTableError::MixedLengths {
                expected: 4,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_base_rejected() {
        let err = CodeTable::new("bc", vec![Code::new("ACGU", "1")]).unwrap_err();
        assert!(matches!(err, CodeTableError::InvalidSequence { .. }));
    }

    #[test]
    fn test_shared_identifiers() {
        let table = CodeTable::new(
            "idx",
            vec![
                Code::new("AAAA", "S1"),
                Code::new("CCCC", "S1"),
                Code::new("GGGG", "S2"),
            ],
        )
        .unwrap();
        assert_eq!(table.identifiers(), vec!["S1", "S2"]);
    }
}
