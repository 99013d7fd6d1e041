use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::codes::resolver::{FuzzyResolver, ResolverConfig, ResolverError};
use crate::codes::table::{CodeTable, CodeTableError};
use crate::parsing::codes::{code_file_alias, parse_code_file};

#[derive(Error, Debug)]
pub enum CodeLibraryError {
    #[error("Failed to read code directory '{path}': {source}")]
    Directory {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to load code table '{path}': {source}")]
    Table {
        path: String,
        source: CodeTableError,
    },

    #[error("Failed to build resolver for '{alias}': {source}")]
    Resolver {
        alias: String,
        source: ResolverError,
    },

    #[error("Code family '{alias}' is defined more than once")]
    DuplicateAlias { alias: String },
}

/// Named code families (barcode sets or index sets) with their resolvers.
///
/// Resolvers are shared with every strategy that reads the same family.
#[derive(Debug, Clone, Default)]
pub struct CodeLibrary {
    resolvers: BTreeMap<String, Arc<FuzzyResolver>>,
}

impl CodeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every code table file of a directory, all expanded with one config.
    ///
    /// Files whose extension is not a code table extension are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CodeLibraryError` if the directory cannot be listed, a table is
    /// invalid, or a resolver cannot be built. Construction fails fast, before
    /// any reads are processed.
    pub fn load_dir(dir: &Path, config: ResolverConfig) -> Result<Self, CodeLibraryError> {
        let entries = std::fs::read_dir(dir).map_err(|source| CodeLibraryError::Directory {
            path: dir.display().to_string(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CodeLibraryError::Directory {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && code_file_alias(&path).is_some() {
                paths.push(path);
            }
        }
        // Deterministic load order
        paths.sort();

        let mut library = Self::new();
        for path in paths {
            let table = parse_code_file(&path).map_err(|source| CodeLibraryError::Table {
                path: path.display().to_string(),
                source,
            })?;
            debug!("Loaded code table '{}' from {}", table.alias(), path.display());
            library.insert_table(table, config)?;
        }

        info!(
            "Loaded {} code families from {} (distance {})",
            library.len(),
            dir.display(),
            config.max_distance
        );
        Ok(library)
    }

    /// Expand a table and add it under its alias.
    ///
    /// # Errors
    ///
    /// Returns `CodeLibraryError::DuplicateAlias` if the alias is taken, or
    /// `CodeLibraryError::Resolver` if expansion fails.
    pub fn insert_table(
        &mut self,
        table: CodeTable,
        config: ResolverConfig,
    ) -> Result<Arc<FuzzyResolver>, CodeLibraryError> {
        let alias = table.alias().to_string();
        if self.resolvers.contains_key(&alias) {
            return Err(CodeLibraryError::DuplicateAlias { alias });
        }
        let resolver = FuzzyResolver::new(table, config)
            .map_err(|source| CodeLibraryError::Resolver {
                alias: alias.clone(),
                source,
            })?;
        let resolver = Arc::new(resolver);
        self.resolvers.insert(alias, Arc::clone(&resolver));
        Ok(resolver)
    }

    /// Shared handle to a family's resolver
    pub fn get(&self, alias: &str) -> Option<Arc<FuzzyResolver>> {
        self.resolvers.get(alias).cloned()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }

    pub fn resolvers(&self) -> impl Iterator<Item = &Arc<FuzzyResolver>> {
        self.resolvers.values()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
