//! Centralized validation and helper functions.

/// Symbols a code sequence may contain; also the substitution alphabet used when
/// expanding codes by Hamming distance.
pub const ALPHABET: &[u8] = b"ACGTN";

/// Default bound on the number of expanded sequences one resolver may hold
pub const DEFAULT_MAX_EXPANDED_ENTRIES: u64 = 5_000_000;

/// Maximum number of codes allowed in a single code table (DOS protection)
pub const MAX_CODES: usize = 1_000_000;

/// Library names become directory names, so they are length-limited
pub const MAX_LIBRARY_NAME_LENGTH: usize = 255;

/// Check that a sequence is non-empty and only contains [`ALPHABET`] symbols.
///
/// # Examples
///
/// ```
/// use scdemux::utils::validation::is_valid_sequence;
///
/// assert!(is_valid_sequence("ACGTN"));
/// assert!(!is_valid_sequence("ACGU"));
/// assert!(!is_valid_sequence(""));
/// ```
#[must_use]
pub fn is_valid_sequence(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| ALPHABET.contains(&b))
}

/// Normalize a sequence to upper case.
/// Returns None if the result is not a valid code sequence.
#[must_use]
pub fn normalize_sequence(s: &str) -> Option<String> {
    let upper = s.trim().to_ascii_uppercase();
    if is_valid_sequence(&upper) {
        Some(upper)
    } else {
        None
    }
}

/// Number of sequences within `max_distance` substitutions of one code of
/// length `length`, counting the code itself:
/// `sum(d = 0..=max_distance) C(length, d) * (|ALPHABET| - 1)^d`.
///
/// Saturates at `u64::MAX` instead of overflowing.
#[must_use]
pub fn expansion_per_code(length: usize, max_distance: usize) -> u64 {
    let alternates = (ALPHABET.len() - 1) as u64;
    let mut total: u64 = 0;
    let mut binomial: u64 = 1; // C(length, 0)
    let mut power: u64 = 1; // alternates^0

    for d in 0..=max_distance.min(length) {
        if d > 0 {
            // C(n, d) = C(n, d - 1) * (n - d + 1) / d
            binomial = binomial.saturating_mul((length - d + 1) as u64) / d as u64;
            power = power.saturating_mul(alternates);
        }
        total = total.saturating_add(binomial.saturating_mul(power));
    }
    total
}

/// Upper bound on the expanded mapping size for a table of `code_count` codes
#[must_use]
pub fn estimate_expansion(code_count: usize, length: usize, max_distance: usize) -> u64 {
    expansion_per_code(length, max_distance).saturating_mul(code_count as u64)
}

/// Input validation error types
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Library name too long: exceeds {MAX_LIBRARY_NAME_LENGTH} characters")]
    NameTooLong,
    #[error("Invalid library name: contains path separators, traversal or control characters")]
    InvalidName,
    #[error("Empty library name provided")]
    EmptyName,
}

/// Library name validation; the name is used as an output directory.
///
/// Rejects:
/// - Empty names and names longer than [`MAX_LIBRARY_NAME_LENGTH`]
/// - Directory traversal (`..`) and path separators
/// - Null bytes and control characters
/// - Hidden names starting with `.`
///
/// # Errors
///
/// Returns `ValidationError::EmptyName` if the name is empty,
/// `ValidationError::NameTooLong` if it exceeds the limit, or
/// `ValidationError::InvalidName` if it contains invalid characters.
pub fn validate_library_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }

    if name.len() > MAX_LIBRARY_NAME_LENGTH {
        return Err(ValidationError::NameTooLong);
    }

    if name.contains("..") || name.contains('/') || name.contains('\\') || name.starts_with('.')
    {
        return Err(ValidationError::InvalidName);
    }

    if name.chars().any(char::is_control) {
        return Err(ValidationError::InvalidName);
    }

    Ok(())
}
