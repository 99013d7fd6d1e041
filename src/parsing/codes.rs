use std::path::Path;

use crate::codes::table::{CodeTable, CodeTableError};
use crate::core::types::Code;
use crate::utils::validation::MAX_CODES;

/// File extensions recognized as code tables
pub const CODE_FILE_EXTENSIONS: &[&str] = &["bc", "tsv", "txt"];

/// Alias of a code table file: its file name without extension.
/// Returns None when the extension is not a code table extension.
pub fn code_file_alias(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    if !CODE_FILE_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }
    path.file_stem()?.to_str().map(String::from)
}

/// Parse a code table file. The alias is the file stem.
///
/// # Errors
///
/// Returns `CodeTableError::Io` if the file cannot be read, or other errors
/// if the content is invalid.
pub fn parse_code_file(path: &Path) -> Result<CodeTable, CodeTableError> {
    let alias = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("codes")
        .to_string();
    let content = std::fs::read_to_string(path)?;
    parse_code_text(&alias, &content)
}

/// Parse code table text.
///
/// Each non-empty line not starting with `#` is `identifier<sep>sequence`,
/// where the separator is a tab, comma or spaces. A line holding only a
/// sequence uses the 1-based ordinal of the code as its identifier.
///
/// # Errors
///
/// Returns `CodeTableError::InvalidFormat` for lines with more than two fields,
/// `CodeTableError::Empty` if no codes are found, or the validation errors of
/// [`CodeTable::new`].
pub fn parse_code_text(alias: &str, text: &str) -> Result<CodeTable, CodeTableError> {
    let mut codes = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();

        let line_num = i + 1;
        let code = match fields.as_slice() {
            [sequence] => Code::new(*sequence, (codes.len() + 1).to_string()),
            [identifier, sequence] => Code::new(*sequence, *identifier),
            _ => {
                return Err(CodeTableError::InvalidFormat(format!(
                    "Line {line_num} of '{alias}' has {} fields, expected 1 or 2",
                    fields.len()
                )));
            }
        };

        if codes.len() >= MAX_CODES {
            return Err(CodeTableError::TooManyCodes(codes.len() + 1));
        }
        codes.push(code);
    }

    if codes.is_empty() {
        return Err(CodeTableError::Empty(alias.to_string()));
    }

    CodeTable::new(alias, codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_columns() {
        let text = "# celseq barcodes\n1\tAGTGCATG\n2,TCAGTGCA\n3 GATCAGTC\n";
        let table = parse_code_text("celseq", text).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("TCAGTGCA"), Some("2"));
        assert_eq!(table.get("GATCAGTC"), Some("3"));
        assert_eq!(table.alias(), "celseq");
    }

    #[test]
    fn test_parse_single_column_uses_ordinal() {
        let text = "\nacgt\n\nTTTT\n";
        let table = parse_code_text("bc", text).unwrap();
        assert_eq!(table.get("ACGT"), Some("1"));
        assert_eq!(table.get("TTTT"), Some("2"));
    }

    #[test]
    fn test_parse_too_many_fields() {
        let err = parse_code_text("bc", "A1 ACGT extra").unwrap_err();
        assert!(matches!(err, CodeTableError::InvalidFormat(_)));
    }

    #[test]
    fn test_parse_empty() {
        let err = parse_code_text("bc", "# nothing\n").unwrap_err();
        assert!(matches!(err, CodeTableError::Empty(_)));
    }

    #[test]
    fn test_code_file_alias() {
        assert_eq!(
            code_file_alias(Path::new("/codes/celseq2.bc")),
            Some("celseq2".to_string())
        );
        assert_eq!(
            code_file_alias(Path::new("nla.TSV")),
            Some("nla".to_string())
        );
        assert_eq!(code_file_alias(Path::new("README.md")), None);
        assert_eq!(code_file_alias(Path::new("noext")), None);
    }

    #[test]
    fn test_parse_code_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maya_mspj1.bc");
        std::fs::write(&path, "A1\tAAAACCCC\nA2\tGGGGTTTT\n").unwrap();
        let table = parse_code_file(&path).unwrap();
        assert_eq!(table.alias(), "maya_mspj1");
        assert_eq!(table.len(), 2);
    }
}
