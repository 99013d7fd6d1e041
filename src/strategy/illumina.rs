use std::sync::Arc;

use crate::codes::{CodeSummary, FuzzyResolver};
use crate::core::read::ReadPair;
use crate::core::tags::{RecodedRecord, TagSet};
use crate::strategy::{DemuxError, Strategy};

/// Tags taken from the seven fields of an Illumina read name
/// (`instrument:run:flowcell:lane:tile:x:y`)
const NAME_TAGS: [&str; 7] = ["Is", "RN", "Fc", "La", "Ti", "CX", "CY"];

/// Tag holding a read name that is not in Illumina format
pub const READ_NAME_TAG: &str = "Rn";

/// Tag holding a header comment that is not in Illumina format
pub const COMMENT_TAG: &str = "Co";

/// Minimal Illumina recoding without code validation.
///
/// Splits the instrument read name into tags and records the read-filter
/// flag, control number and raw sequencing index of the header comment. When
/// an index code family is configured, a resolved index adds the `aI` tag; an
/// unresolved index is not an error.
///
/// Barcode strategies start from [`IlluminaBase::base_tags`]; on its own the
/// base formatter recodes rejected pairs.
#[derive(Debug, Clone, Default)]
pub struct IlluminaBase {
    index: Option<Arc<FuzzyResolver>>,
}

impl IlluminaBase {
    pub const SHORT_NAME: &'static str = "ILLU";

    pub fn new(index: Option<Arc<FuzzyResolver>>) -> Self {
        Self { index }
    }

    /// Tags shared by every strategy: Illumina name fields, comment fields,
    /// index and library.
    ///
    /// # Errors
    ///
    /// Returns `DemuxError::NonMultiplexable` for an empty pair, an empty read
    /// name, or mates whose names disagree.
    pub fn base_tags(&self, pair: &ReadPair, library: Option<&str>) -> Result<TagSet, DemuxError> {
        let r1 = pair
            .r1()
            .ok_or_else(|| DemuxError::non_multiplexable("read pair has no mates"))?;

        let name = strip_mate_suffix(&r1.name);
        if name.is_empty() {
            return Err(DemuxError::non_multiplexable("empty read name"));
        }
        for mate in pair.mates.iter().skip(1) {
            if strip_mate_suffix(&mate.name) != name {
                return Err(DemuxError::non_multiplexable(format!(
                    "mate names disagree: '{}' and '{}'",
                    r1.name, mate.name
                )));
            }
        }

        let mut tags = TagSet::new();
        let fields: Vec<&str> = name.split(':').collect();
        if fields.len() == NAME_TAGS.len() {
            for (key, value) in NAME_TAGS.iter().zip(fields) {
                tags.insert(key, value);
            }
        } else {
            tags.insert(READ_NAME_TAG, name);
        }

        if !r1.description.is_empty() {
            // read:filtered:control:index
            let comment: Vec<&str> = r1.description.split(':').collect();
            if let [_read, filtered, control, index] = comment.as_slice() {
                tags.insert("Fi", filtered);
                tags.insert("CN", control);
                if !index.is_empty() {
                    tags.insert("aA", index);
                    if let Some(identifier) = self.resolve_index(index) {
                        tags.insert("aI", identifier);
                    }
                }
            } else {
                tags.insert(COMMENT_TAG, &r1.description);
            }
        }

        if let Some(library) = library {
            tags.insert("LY", library);
        }
        Ok(tags)
    }

    /// Dual indices (`i7+i5`) are looked up whole first, then by the i7 part
    fn resolve_index(&self, index: &str) -> Option<&str> {
        let resolver = self.index.as_ref()?;
        resolver.resolve(index.as_bytes()).or_else(|| {
            index
                .split_once('+')
                .and_then(|(i7, _)| resolver.resolve(i7.as_bytes()))
        })
    }
}

fn strip_mate_suffix(name: &str) -> &str {
    name.strip_suffix("/1")
        .or_else(|| name.strip_suffix("/2"))
        .unwrap_or(name)
}

impl Strategy for IlluminaBase {
    fn short_name(&self) -> &str {
        Self::SHORT_NAME
    }

    fn long_name(&self) -> &str {
        "Illumina"
    }

    fn description(&self) -> &str {
        "Illumina read name and index recoding, no cell barcode"
    }

    fn auto_detectable(&self) -> bool {
        false
    }

    fn demultiplex(
        &self,
        pair: &ReadPair,
        library: Option<&str>,
    ) -> Result<RecodedRecord, DemuxError> {
        let mut tags = self.base_tags(pair, library)?;
        tags.insert("dt", Self::SHORT_NAME);
        Ok(RecodedRecord::new(tags, pair.mates.clone()))
    }

    fn code_summary(&self) -> Vec<CodeSummary> {
        self.index.iter().map(|r| r.summary()).collect()
    }
}
