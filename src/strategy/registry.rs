use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::codes::{CodeLibrary, FuzzyResolver};
use crate::strategy::illumina::IlluminaBase;
use crate::strategy::umi_barcode::{
    UmiBarcodeSpec, UmiBarcodeStrategy, CS1C8U4, CS2C8U6, CS2C8U8, MSPJIC8U3, NLAIII384C8U3,
};
use crate::strategy::{Strategy, StrategyError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown strategy name(s): {} (available: {})", .names.join(", "), .available.join(", "))]
    UnresolvedStrategyNames {
        names: Vec<String>,
        available: Vec<String>,
    },
}

/// Shared inputs for building strategies
#[derive(Debug, Clone, Default)]
pub struct StrategyContext {
    pub barcodes: CodeLibrary,
    pub indices: CodeLibrary,
    /// Index family for the `aI` tag. When unset, a lone index family is used.
    pub index_alias: Option<String>,
}

impl StrategyContext {
    pub fn new(barcodes: CodeLibrary, indices: CodeLibrary) -> Self {
        Self {
            barcodes,
            indices,
            index_alias: None,
        }
    }

    /// The resolver for sequencing indices, if one is configured
    pub fn index_resolver(&self) -> Option<Arc<FuzzyResolver>> {
        match &self.index_alias {
            Some(alias) => self.indices.get(alias),
            None if self.indices.len() == 1 => self.indices.resolvers().next().cloned(),
            None => None,
        }
    }

    /// A barcode family by alias
    ///
    /// # Errors
    ///
    /// Returns `StrategyError::MissingCodeFamily` if the family is not loaded.
    pub fn barcode_resolver(
        &self,
        strategy: &str,
        alias: &str,
    ) -> Result<Arc<FuzzyResolver>, StrategyError> {
        self.barcodes
            .get(alias)
            .ok_or_else(|| StrategyError::MissingCodeFamily {
                strategy: strategy.to_string(),
                alias: alias.to_string(),
                available: self.barcodes.aliases().collect::<Vec<_>>().join(", "),
            })
    }
}

/// Builds one strategy from the shared context
pub type BuildFn = fn(&StrategyContext) -> Result<Arc<dyn Strategy>, StrategyError>;

/// Registration entry for one strategy
#[derive(Clone, Copy)]
pub struct StrategyFactory {
    pub short_name: &'static str,
    pub build: BuildFn,
}

fn build_illumina(ctx: &StrategyContext) -> Result<Arc<dyn Strategy>, StrategyError> {
    Ok(Arc::new(IlluminaBase::new(ctx.index_resolver())))
}

fn build_umi_barcode(
    spec: &'static UmiBarcodeSpec,
    ctx: &StrategyContext,
) -> Result<Arc<dyn Strategy>, StrategyError> {
    let barcodes = ctx.barcode_resolver(spec.short_name, spec.code_alias)?;
    let base = IlluminaBase::new(ctx.index_resolver());
    Ok(Arc::new(UmiBarcodeStrategy::new(spec, barcodes, base)?))
}

fn build_cs1c8u4(ctx: &StrategyContext) -> Result<Arc<dyn Strategy>, StrategyError> {
    build_umi_barcode(&CS1C8U4, ctx)
}

fn build_cs2c8u6(ctx: &StrategyContext) -> Result<Arc<dyn Strategy>, StrategyError> {
    build_umi_barcode(&CS2C8U6, ctx)
}

fn build_cs2c8u8(ctx: &StrategyContext) -> Result<Arc<dyn Strategy>, StrategyError> {
    build_umi_barcode(&CS2C8U8, ctx)
}

fn build_mspjic8u3(ctx: &StrategyContext) -> Result<Arc<dyn Strategy>, StrategyError> {
    build_umi_barcode(&MSPJIC8U3, ctx)
}

fn build_nlaiii384c8u3(ctx: &StrategyContext) -> Result<Arc<dyn Strategy>, StrategyError> {
    build_umi_barcode(&NLAIII384C8U3, ctx)
}

/// Every built-in strategy, in discovery order
pub static FACTORIES: &[StrategyFactory] = &[
    StrategyFactory {
        short_name: IlluminaBase::SHORT_NAME,
        build: build_illumina,
    },
    StrategyFactory {
        short_name: CS1C8U4.short_name,
        build: build_cs1c8u4,
    },
    StrategyFactory {
        short_name: CS2C8U6.short_name,
        build: build_cs2c8u6,
    },
    StrategyFactory {
        short_name: CS2C8U8.short_name,
        build: build_cs2c8u8,
    },
    StrategyFactory {
        short_name: MSPJIC8U3.short_name,
        build: build_mspjic8u3,
    },
    StrategyFactory {
        short_name: NLAIII384C8U3.short_name,
        build: build_nlaiii384c8u3,
    },
];

/// A strategy that could not be built; the rest of the registry is unaffected
#[derive(Debug, Clone, Serialize)]
pub struct ConstructionFailure {
    pub short_name: String,
    pub reason: String,
}

/// The strategies available for one run, built once and read-only afterwards
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn Strategy>>,
    fallback: Arc<dyn Strategy>,
    failures: Vec<ConstructionFailure>,
}

impl StrategyRegistry {
    /// Build every built-in strategy except the ignored ones
    pub fn discover(ctx: &StrategyContext, ignore: &[String]) -> Self {
        Self::discover_from(FACTORIES, ctx, ignore)
    }

    /// Build strategies from a factory table.
    ///
    /// A factory that fails, or produces a name already taken, is logged and
    /// recorded as a construction failure; discovery continues with the next.
    pub fn discover_from(
        factories: &[StrategyFactory],
        ctx: &StrategyContext,
        ignore: &[String],
    ) -> Self {
        let mut strategies: Vec<Arc<dyn Strategy>> = Vec::new();
        let mut failures = Vec::new();
        let mut names = HashSet::new();

        for factory in factories {
            if ignore.iter().any(|name| name == factory.short_name) {
                debug!("Ignoring strategy {}", factory.short_name);
                continue;
            }

            let built = (factory.build)(ctx).and_then(|strategy| {
                if names.insert(strategy.short_name().to_string()) {
                    Ok(strategy)
                } else {
                    Err(StrategyError::DuplicateName(
                        strategy.short_name().to_string(),
                    ))
                }
            });

            match built {
                Ok(strategy) => {
                    debug!("Loaded strategy {}", strategy.short_name());
                    strategies.push(strategy);
                }
                Err(e) => {
                    warn!("Failed to load strategy {}: {}", factory.short_name, e);
                    failures.push(ConstructionFailure {
                        short_name: factory.short_name.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Self {
            strategies,
            fallback: Arc::new(IlluminaBase::new(ctx.index_resolver())),
            failures,
        }
    }

    /// Registry over explicit strategies
    pub fn from_strategies(strategies: Vec<Arc<dyn Strategy>>, fallback: Arc<dyn Strategy>) -> Self {
        Self {
            strategies,
            fallback,
            failures: Vec::new(),
        }
    }

    /// All strategies in discovery order
    pub fn strategies(&self) -> &[Arc<dyn Strategy>] {
        &self.strategies
    }

    pub fn get(&self, short_name: &str) -> Option<Arc<dyn Strategy>> {
        self.strategies
            .iter()
            .find(|s| s.short_name() == short_name)
            .cloned()
    }

    /// Strategies for the requested names, in request order.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnresolvedStrategyNames` listing every name
    /// without a registered strategy.
    pub fn lookup<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<dyn Strategy>>, RegistryError> {
        let mut found = Vec::with_capacity(names.len());
        let mut unresolved = Vec::new();
        for name in names {
            let name = name.as_ref();
            match self.get(name) {
                Some(strategy) => found.push(strategy),
                None => unresolved.push(name.to_string()),
            }
        }

        if unresolved.is_empty() {
            Ok(found)
        } else {
            Err(RegistryError::UnresolvedStrategyNames {
                names: unresolved,
                available: self.short_names(),
            })
        }
    }

    /// Strategies eligible for auto-detection, in discovery order
    pub fn auto_detectable(&self) -> Vec<Arc<dyn Strategy>> {
        self.strategies
            .iter()
            .filter(|s| s.auto_detectable())
            .cloned()
            .collect()
    }

    /// The base formatter used for the reject path
    pub fn fallback(&self) -> Arc<dyn Strategy> {
        Arc::clone(&self.fallback)
    }

    pub fn failures(&self) -> &[ConstructionFailure] {
        &self.failures
    }

    pub fn short_names(&self) -> Vec<String> {
        self.strategies
            .iter()
            .map(|s| s.short_name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
