use std::path::Path;

use crate::core::manifest::{LibraryManifest, ManifestError};

/// Load and validate a JSON library manifest
///
/// # Errors
///
/// Returns `ManifestError::ReadError` if the file cannot be read,
/// `ManifestError::ParseError` for malformed JSON, or a validation error.
pub fn parse_manifest_file(path: &Path) -> Result<LibraryManifest, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    parse_manifest_json(&content)
}

/// Parse and validate manifest JSON:
/// `{"libraries": {"<lib>": {"<lane>": {"R1": [...], "R2": [...]}}}}`
///
/// # Errors
///
/// Returns `ManifestError::ParseError` for malformed JSON or a validation error.
pub fn parse_manifest_json(json: &str) -> Result<LibraryManifest, ManifestError> {
    let manifest: LibraryManifest = serde_json::from_str(json)?;
    manifest.validate()?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_manifest_json() {
        let json = r#"{
            "libraries": {
                "PL1": {
                    "L001": {"R1": ["PL1_L001_R1.fastq.gz"], "R2": ["PL1_L001_R2.fastq.gz"]},
                    "L002": {"R1": ["PL1_L002_R1.fastq.gz"], "R2": ["PL1_L002_R2.fastq.gz"]}
                },
                "PL2": {
                    "L001": {"R1": ["PL2_R1.fastq"]}
                }
            }
        }"#;
        let manifest = parse_manifest_json(json).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.file_groups("PL1").unwrap().len(), 2);
        assert_eq!(manifest.mates_per_pair("PL2"), Some(1));
        assert_eq!(
            manifest.file_groups("PL2").unwrap()[0].files,
            vec![PathBuf::from("PL2_R1.fastq")]
        );
    }

    #[test]
    fn test_parse_manifest_invalid_json() {
        assert!(matches!(
            parse_manifest_json("{ not json"),
            Err(ManifestError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_manifest_three_mates() {
        let json = r#"{"libraries": {"L": {"1": {"R1": ["a"], "R2": ["b"], "I1": ["c"]}}}}"#;
        assert!(matches!(
            parse_manifest_json(json),
            Err(ManifestError::MateRoles { mates: 3, .. })
        ));
    }
}
