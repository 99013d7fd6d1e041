//! Reference code sets and error-tolerant lookup.
//!
//! - [`CodeTable`]: the ordered, validated codes of one family
//! - [`FuzzyResolver`]: Hamming-distance expansion of a table with ambiguity removal
//! - [`CodeLibrary`]: a directory of code families, one resolver each
//!
//! ## Example
//!
//! ```rust
//! use scdemux::codes::{FuzzyResolver, ResolverConfig};
//! use scdemux::parsing::codes::parse_code_text;
//!
//! let table = parse_code_text("cells", "cell1 AAAA\ncell2 TTTT\n").unwrap();
//! let resolver = FuzzyResolver::new(table, ResolverConfig::with_distance(1)).unwrap();
//!
//! assert_eq!(resolver.resolve(b"AAAT"), Some("cell1"));
//! assert_eq!(resolver.resolve(b"ATAT"), None);
//! ```

pub mod library;
pub mod resolver;
pub mod table;

pub use library::{CodeLibrary, CodeLibraryError};
pub use resolver::{CodeSummary, FuzzyResolver, ResolverConfig, ResolverError};
pub use table::{CodeTable, CodeTableError};
