use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::utils::validation::{validate_library_name, ValidationError};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Manifest contains no libraries")]
    Empty,

    #[error("Library '{library}' has no input files")]
    EmptyLibrary { library: String },

    #[error("Library '{library}' lane '{lane}' has {mates} mate roles, expected 1 or 2")]
    MateRoles {
        library: String,
        lane: String,
        mates: usize,
    },

    #[error("Library '{library}' lane '{lane}' has unequal file counts per mate: {counts:?}")]
    UnequalMateFiles {
        library: String,
        lane: String,
        counts: Vec<usize>,
    },

    #[error("Library '{library}' mixes lanes with {first} and {other} mates per pair")]
    MixedMateCounts {
        library: String,
        first: usize,
        other: usize,
    },

    #[error("Invalid library name '{library}': {source}")]
    InvalidLibraryName {
        library: String,
        source: ValidationError,
    },
}

/// Input files of one lane, keyed by mate role (`R1`, `R2`)
pub type LaneFiles = BTreeMap<String, Vec<PathBuf>>;

/// Input files of one library, keyed by lane
pub type LibraryFiles = BTreeMap<String, LaneFiles>;

/// Files that are read together as one read-pair stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    pub lane: String,
    /// One path per mate, in mate-role order
    pub files: Vec<PathBuf>,
}

/// Grouping of input files by library, lane and mate role.
///
/// The manifest is supplied fully formed; file names are never inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryManifest {
    pub libraries: BTreeMap<String, LibraryFiles>,
}

impl LibraryManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manifest holding one library with a single lane
    pub fn single_library(library: impl Into<String>, r1: Vec<PathBuf>, r2: Vec<PathBuf>) -> Self {
        let mut lane = LaneFiles::new();
        lane.insert("R1".to_string(), r1);
        if !r2.is_empty() {
            lane.insert("R2".to_string(), r2);
        }
        let mut files = LibraryFiles::new();
        files.insert("0".to_string(), lane);

        let mut manifest = Self::new();
        manifest.libraries.insert(library.into(), files);
        manifest
    }

    /// Add one file to a library/lane/mate slot
    pub fn add_file(
        &mut self,
        library: impl Into<String>,
        lane: impl Into<String>,
        mate: impl Into<String>,
        path: impl Into<PathBuf>,
    ) {
        self.libraries
            .entry(library.into())
            .or_default()
            .entry(lane.into())
            .or_default()
            .entry(mate.into())
            .or_default()
            .push(path.into());
    }

    pub fn library_names(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Check library names and mate consistency of every lane
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.libraries.is_empty() {
            return Err(ManifestError::Empty);
        }
        for library in self.libraries.keys() {
            validate_library_name(library).map_err(|source| ManifestError::InvalidLibraryName {
                library: library.clone(),
                source,
            })?;
            self.file_groups(library)?;
        }
        Ok(())
    }

    /// The read-pair file groups of a library, lane by lane.
    ///
    /// Within a lane the n-th file of every mate role forms one group.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError` if the library is unknown or has no files, a
    /// lane has an unsupported number of mate roles or unequal file counts, or
    /// lanes disagree on the number of mates per pair.
    pub fn file_groups(&self, library: &str) -> Result<Vec<FileGroup>, ManifestError> {
        let lanes = self
            .libraries
            .get(library)
            .ok_or_else(|| ManifestError::EmptyLibrary {
                library: library.to_string(),
            })?;

        let mut groups = Vec::new();
        for (lane, mates) in lanes {
            if mates.is_empty() || mates.len() > 2 {
                return Err(ManifestError::MateRoles {
                    library: library.to_string(),
                    lane: lane.clone(),
                    mates: mates.len(),
                });
            }

            let counts: Vec<usize> = mates.values().map(Vec::len).collect();
            if counts.windows(2).any(|w| w[0] != w[1]) {
                return Err(ManifestError::UnequalMateFiles {
                    library: library.to_string(),
                    lane: lane.clone(),
                    counts,
                });
            }

            for i in 0..counts[0] {
                groups.push(FileGroup {
                    lane: lane.clone(),
                    files: mates.values().map(|paths| paths[i].clone()).collect(),
                });
            }
        }

        let Some(first) = groups.first().map(|g| g.files.len()) else {
            return Err(ManifestError::EmptyLibrary {
                library: library.to_string(),
            });
        };
        if let Some(other) = groups.iter().map(|g| g.files.len()).find(|&n| n != first) {
            return Err(ManifestError::MixedMateCounts {
                library: library.to_string(),
                first,
                other,
            });
        }
        Ok(groups)
    }

    /// Number of mates per pair for a library (1 or 2), from its first lane
    pub fn mates_per_pair(&self, library: &str) -> Option<usize> {
        self.libraries
            .get(library)
            .and_then(|lanes| lanes.values().next())
            .map(BTreeMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_groups_pair_files_by_index() {
        let mut manifest = LibraryManifest::new();
        manifest.add_file("lib", "L001", "R1", "a_R1_001.fq");
        manifest.add_file("lib", "L001", "R2", "a_R2_001.fq");
        manifest.add_file("lib", "L001", "R1", "a_R1_002.fq");
        manifest.add_file("lib", "L001", "R2", "a_R2_002.fq");
        manifest.add_file("lib", "L002", "R1", "b_R1_001.fq");
        manifest.add_file("lib", "L002", "R2", "b_R2_001.fq");

        let groups = manifest.file_groups("lib").unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].lane, "L001");
        assert_eq!(
            groups[1].files,
            vec![PathBuf::from("a_R1_002.fq"), PathBuf::from("a_R2_002.fq")]
        );
        assert_eq!(groups[2].lane, "L002");
    }

    #[test]
    fn test_unequal_mate_files() {
        let mut manifest = LibraryManifest::new();
        manifest.add_file("lib", "L001", "R1", "a.fq");
        manifest.add_file("lib", "L001", "R1", "b.fq");
        manifest.add_file("lib", "L001", "R2", "c.fq");

        let err = manifest.file_groups("lib").unwrap_err();
        assert!(matches!(err, ManifestError::UnequalMateFiles { .. }));
    }

    #[test]
    fn test_lanes_must_agree_on_mates() {
        let mut manifest = LibraryManifest::new();
        manifest.add_file("lib", "L001", "R1", "a_R1.fq");
        manifest.add_file("lib", "L001", "R2", "a_R2.fq");
        manifest.add_file("lib", "L002", "R1", "b_R1.fq");

        assert!(matches!(
            manifest.validate(),
            Err(ManifestError::MixedMateCounts {
                first: 2,
                other: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_single_end_library() {
        let manifest = LibraryManifest::single_library("lib", vec!["a.fq".into()], vec![]);
        assert_eq!(manifest.mates_per_pair("lib"), Some(1));
        assert_eq!(manifest.file_groups("lib").unwrap()[0].files.len(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_library_name() {
        let manifest =
            LibraryManifest::single_library("../escape", vec!["a.fq".into()], vec![]);
        assert!(matches!(
            manifest.validate(),
            Err(ManifestError::InvalidLibraryName { .. })
        ));
    }

    #[test]
    fn test_validate_empty() {
        assert!(matches!(
            LibraryManifest::new().validate(),
            Err(ManifestError::Empty)
        ));
    }
}
