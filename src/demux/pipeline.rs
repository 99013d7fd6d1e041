use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::manifest::{LibraryManifest, ManifestError};
use crate::core::types::YieldReport;
use crate::demux::detect::{AutoDetector, DetectionConfig};
use crate::demux::engine::{ClassificationEngine, EngineError};
use crate::demux::sink::{FastqSink, RecordSink};
use crate::parsing::fastq::{ReadError, ReadPairReader};
use crate::strategy::registry::{ConstructionFailure, RegistryError, StrategyRegistry};
use crate::strategy::Strategy;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Library '{library}': {source}")]
    Read { library: String, source: ReadError },

    #[error("Library '{library}': {source}")]
    Engine {
        library: String,
        source: EngineError,
    },

    #[error("Library '{library}': failed to create output: {source}")]
    Sink { library: String, source: io::Error },
}

/// How strategies are chosen for each library
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The same named strategies for every library
    Manual(Vec<String>),
    /// Per-library selection from a sample of the library's reads
    AutoDetect(DetectionConfig),
}

/// Run-wide settings for full classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Stop each library after this many read pairs, across all its lanes
    pub max_pairs: Option<u64>,
    /// Whether pairs no strategy classifies are written to a reject output
    pub write_rejects: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_pairs: None,
            write_rejects: true,
        }
    }
}

/// Creates the outputs of each library
pub trait SinkFactory {
    /// Output for classified records
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the output cannot be created.
    fn target(&mut self, library: &str, mates: usize) -> io::Result<Box<dyn RecordSink>>;

    /// Output for rejected records
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the output cannot be created.
    fn reject(&mut self, library: &str, mates: usize) -> io::Result<Box<dyn RecordSink>>;
}

/// Writes `<out>/<library>/demultiplexed_R<n>.fastq.gz` and `rejects_R<n>.fastq.gz`
#[derive(Debug, Clone)]
pub struct FastqSinkFactory {
    out_dir: PathBuf,
}

impl FastqSinkFactory {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Output paths for one library and kind (`demultiplexed` or `rejects`)
    pub fn paths(&self, library: &str, kind: &str, mates: usize) -> Vec<PathBuf> {
        let dir = self.out_dir.join(library);
        (1..=mates)
            .map(|n| dir.join(format!("{kind}_R{n}.fastq.gz")))
            .collect()
    }

    fn create(&self, library: &str, kind: &str, mates: usize) -> io::Result<Box<dyn RecordSink>> {
        std::fs::create_dir_all(self.out_dir.join(library))?;
        Ok(Box::new(FastqSink::create(&self.paths(library, kind, mates))?))
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl SinkFactory for FastqSinkFactory {
    fn target(&mut self, library: &str, mates: usize) -> io::Result<Box<dyn RecordSink>> {
        self.create(library, "demultiplexed", mates)
    }

    fn reject(&mut self, library: &str, mates: usize) -> io::Result<Box<dyn RecordSink>> {
        self.create(library, "rejects", mates)
    }
}

/// Non-fatal conditions attached to a library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LibraryWarning {
    /// Selection produced no strategy; the library was not classified
    NoStrategySelected,
}

/// Outcome for one library
#[derive(Debug, Clone, Serialize)]
pub struct LibraryReport {
    pub library: String,
    pub selected: Vec<String>,
    /// Sample yields, when strategies were auto-detected
    pub detection: Option<YieldReport>,
    /// Yields of the full run; None for dry runs and skipped libraries
    pub run: Option<YieldReport>,
    pub warnings: Vec<LibraryWarning>,
}

impl LibraryReport {
    pub fn skipped(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Outcome of processing a manifest
#[derive(Debug, Clone, Serialize)]
pub struct ManifestReport {
    pub created_at: String,
    pub libraries: Vec<LibraryReport>,
    pub construction_failures: Vec<ConstructionFailure>,
}

/// Processes the libraries of a manifest independently: select strategies,
/// then classify every read pair of the library.
pub struct Demultiplexer<'a> {
    registry: &'a StrategyRegistry,
    selection: Selection,
    config: RunConfig,
    /// Manual selection, resolved once
    manual: Option<Vec<Arc<dyn Strategy>>>,
}

impl<'a> Demultiplexer<'a> {
    /// # Errors
    ///
    /// Returns `PipelineError::Registry` if a manually selected name is unknown.
    pub fn new(
        registry: &'a StrategyRegistry,
        selection: Selection,
        config: RunConfig,
    ) -> Result<Self, PipelineError> {
        let manual = match &selection {
            Selection::Manual(names) => Some(registry.lookup(names)?),
            Selection::AutoDetect(_) => None,
        };
        Ok(Self {
            registry,
            selection,
            config,
            manual,
        })
    }

    /// Select strategies for every library without classifying anything
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if the manifest is invalid or a sample cannot be read.
    pub fn plan(&self, manifest: &LibraryManifest) -> Result<ManifestReport, PipelineError> {
        manifest.validate()?;
        let mut libraries = Vec::with_capacity(manifest.len());
        for library in manifest.library_names() {
            let (_, report) = self.select(manifest, library)?;
            libraries.push(report);
        }
        Ok(self.manifest_report(libraries))
    }

    /// Select strategies and classify every library
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if the manifest is invalid, input cannot be
    /// read, or output cannot be written. Libraries without a selected
    /// strategy are skipped with a warning, not an error.
    pub fn run(
        &self,
        manifest: &LibraryManifest,
        sinks: &mut dyn SinkFactory,
    ) -> Result<ManifestReport, PipelineError> {
        manifest.validate()?;
        let mut libraries = Vec::with_capacity(manifest.len());
        for library in manifest.library_names() {
            let (strategies, mut report) = self.select(manifest, library)?;
            if !strategies.is_empty() {
                report.run = Some(self.run_library(manifest, library, strategies, sinks)?);
            }
            libraries.push(report);
        }
        Ok(self.manifest_report(libraries))
    }

    fn manifest_report(&self, libraries: Vec<LibraryReport>) -> ManifestReport {
        ManifestReport {
            created_at: chrono::Utc::now().to_rfc3339(),
            libraries,
            construction_failures: self.registry.failures().to_vec(),
        }
    }

    fn select(
        &self,
        manifest: &LibraryManifest,
        library: &str,
    ) -> Result<(Vec<Arc<dyn Strategy>>, LibraryReport), PipelineError> {
        let (strategies, detection) = match (&self.selection, &self.manual) {
            (_, Some(manual)) => (manual.clone(), None),
            (Selection::AutoDetect(config), None) => {
                let groups = manifest.file_groups(library)?;
                let sample = ReadPairReader::open(&groups[0].files).map_err(|source| {
                    PipelineError::Read {
                        library: library.to_string(),
                        source,
                    }
                })?;
                info!("Sampling up to {} read pairs of library {}", config.sample_size, library);
                let detection = AutoDetector::new(*config)
                    .detect_and_select(sample, &self.registry.auto_detectable())
                    .map_err(|source| PipelineError::Engine {
                        library: library.to_string(),
                        source,
                    })?;
                (self.registry.lookup(&detection.selected)?, Some(detection.report))
            }
            (Selection::Manual(_), None) => (Vec::new(), None),
        };

        let mut warnings = Vec::new();
        if strategies.is_empty() {
            warn!("No strategy selected for library {}, skipping it", library);
            warnings.push(LibraryWarning::NoStrategySelected);
        }

        let report = LibraryReport {
            library: library.to_string(),
            selected: strategies
                .iter()
                .map(|s| s.short_name().to_string())
                .collect(),
            detection,
            run: None,
            warnings,
        };
        Ok((strategies, report))
    }

    fn run_library(
        &self,
        manifest: &LibraryManifest,
        library: &str,
        strategies: Vec<Arc<dyn Strategy>>,
        sinks: &mut dyn SinkFactory,
    ) -> Result<YieldReport, PipelineError> {
        let groups = manifest.file_groups(library)?;
        let mates = manifest.mates_per_pair(library).unwrap_or(1);
        let sink_error = |source| PipelineError::Sink {
            library: library.to_string(),
            source,
        };

        let mut target = sinks.target(library, mates).map_err(sink_error)?;
        let mut reject = if self.config.write_rejects {
            Some(sinks.reject(library, mates).map_err(sink_error)?)
        } else {
            None
        };

        let engine = ClassificationEngine::new(strategies)
            .with_fallback(self.registry.fallback())
            .with_library(library);
        let mut total = YieldReport::new(engine.strategy_names());

        for group in &groups {
            let remaining = self
                .config
                .max_pairs
                .map(|max| max.saturating_sub(total.processed));
            if remaining == Some(0) {
                break;
            }

            info!(
                "Demultiplexing library {} lane {} with {}",
                library,
                group.lane,
                engine.strategy_names().join(", ")
            );
            let pairs = ReadPairReader::open(&group.files).map_err(|source| PipelineError::Read {
                library: library.to_string(),
                source,
            })?;
            let target_sink: &mut dyn RecordSink = target.as_mut();
            let reject_sink: Option<&mut dyn RecordSink> = match reject.as_mut() {
                Some(sink) => Some(sink.as_mut()),
                None => None,
            };
            let report = engine
                .run(pairs, Some(target_sink), reject_sink, remaining)
                .map_err(|source| PipelineError::Engine {
                    library: library.to_string(),
                    source,
                })?;
            total.absorb(&report);
        }

        target.finish().map_err(sink_error)?;
        if let Some(reject) = reject.as_mut() {
            reject.finish().map_err(sink_error)?;
        }

        info!(
            "Library {}: {} read pairs, {} classified, {} rejected",
            library,
            total.processed,
            total.total_successes(),
            total.rejected
        );
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::read::ReadPair;
    use crate::core::tags::{RecodedRecord, TagSet};
    use crate::demux::sink::MemorySink;
    use crate::strategy::{DemuxError, IlluminaBase};
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    /// Classifies pairs whose read 1 starts with `A`
    struct LeadingA;

    impl Strategy for LeadingA {
        fn short_name(&self) -> &str {
            "LEADA"
        }
        fn long_name(&self) -> &str {
            "leading A"
        }
        fn description(&self) -> &str {
            "read 1 starts with A"
        }
        fn auto_detectable(&self) -> bool {
            true
        }
        fn demultiplex(&self, pair: &ReadPair, _: Option<&str>) -> Result<RecodedRecord, DemuxError> {
            match pair.r1() {
                Some(r1) if r1.sequence.first() == Some(&b'A') => {
                    let mut tags = TagSet::new();
                    tags.insert("Rn", &r1.name);
                    Ok(RecodedRecord::new(tags, pair.mates.clone()))
                }
                _ => Err(DemuxError::non_multiplexable("no leading A")),
            }
        }
    }

    struct SharedSink(Rc<RefCell<MemorySink>>);

    impl RecordSink for SharedSink {
        fn write(&mut self, record: &RecodedRecord) -> io::Result<()> {
            self.0.borrow_mut().write(record)
        }

        fn finish(&mut self) -> io::Result<()> {
            self.0.borrow_mut().finish()
        }
    }

    /// In-memory sinks per library, inspectable after a run
    #[derive(Default)]
    struct MemorySinks {
        targets: BTreeMap<String, Rc<RefCell<MemorySink>>>,
        rejects: BTreeMap<String, Rc<RefCell<MemorySink>>>,
    }

    impl MemorySinks {
        fn names(sinks: &BTreeMap<String, Rc<RefCell<MemorySink>>>, library: &str) -> Vec<String> {
            sinks[library]
                .borrow()
                .records
                .iter()
                .map(|r| r.tags.get("Rn").unwrap_or_default().to_string())
                .collect()
        }
    }

    fn shared(
        sinks: &mut BTreeMap<String, Rc<RefCell<MemorySink>>>,
        library: &str,
    ) -> Box<dyn RecordSink> {
        let sink = Rc::new(RefCell::new(MemorySink::new()));
        sinks.insert(library.to_string(), Rc::clone(&sink));
        Box::new(SharedSink(sink))
    }

    impl SinkFactory for MemorySinks {
        fn target(&mut self, library: &str, _mates: usize) -> io::Result<Box<dyn RecordSink>> {
            Ok(shared(&mut self.targets, library))
        }

        fn reject(&mut self, library: &str, _mates: usize) -> io::Result<Box<dyn RecordSink>> {
            Ok(shared(&mut self.rejects, library))
        }
    }

    fn write_fastq(dir: &Path, file: &str, reads: &[(&str, &str)]) -> PathBuf {
        let text: String = reads
            .iter()
            .map(|(name, seq)| format!("@{name}\n{seq}\n+\n{}\n", "I".repeat(seq.len())))
            .collect();
        let path = dir.join(file);
        std::fs::write(&path, text).unwrap();
        path
    }

    fn registry() -> StrategyRegistry {
        StrategyRegistry::from_strategies(
            vec![Arc::new(IlluminaBase::default()), Arc::new(LeadingA)],
            Arc::new(IlluminaBase::default()),
        )
    }

    #[test]
    fn test_fastq_sink_factory_paths() {
        let factory = FastqSinkFactory::new("/out");
        assert_eq!(
            factory.paths("PL1", "rejects", 2),
            vec![
                PathBuf::from("/out/PL1/rejects_R1.fastq.gz"),
                PathBuf::from("/out/PL1/rejects_R2.fastq.gz")
            ]
        );
    }

    #[test]
    fn test_manual_selection_is_resolved_up_front() {
        let registry = StrategyRegistry::from_strategies(
            vec![Arc::new(IlluminaBase::default())],
            Arc::new(IlluminaBase::default()),
        );
        let err = Demultiplexer::new(
            &registry,
            Selection::Manual(vec!["ILLU".to_string(), "MISSING".to_string()]),
            RunConfig::default(),
        )
        .err()
        .unwrap();
        match err {
            PipelineError::Registry(RegistryError::UnresolvedStrategyNames { names, .. }) => {
                assert_eq!(names, vec!["MISSING".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_library_without_selection_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_fastq(dir.path(), "good.fq", &[("g0", "AC"), ("g1", "AG"), ("g2", "CC")]);
        let bad = write_fastq(dir.path(), "bad.fq", &[("b0", "CC"), ("b1", "GG")]);
        let mut manifest = LibraryManifest::new();
        manifest.add_file("bad", "L001", "R1", bad);
        manifest.add_file("good", "L001", "R1", good);

        let registry = registry();
        let demux = Demultiplexer::new(
            &registry,
            Selection::AutoDetect(DetectionConfig::default()),
            RunConfig::default(),
        )
        .unwrap();
        let mut sinks = MemorySinks::default();
        let report = demux.run(&manifest, &mut sinks).unwrap();

        assert_eq!(report.libraries.len(), 2);
        let skipped = &report.libraries[0];
        assert_eq!(skipped.library, "bad");
        assert!(skipped.skipped());
        assert_eq!(skipped.warnings, vec![LibraryWarning::NoStrategySelected]);
        assert!(skipped.run.is_none());
        assert!(!sinks.targets.contains_key("bad"));

        let classified = &report.libraries[1];
        assert_eq!(classified.library, "good");
        assert_eq!(classified.selected, vec!["LEADA"]);
        assert!(classified.warnings.is_empty());
        let run = classified.run.as_ref().unwrap();
        assert_eq!(run.processed, 3);
        assert_eq!(run.successes("LEADA"), 2);
        assert_eq!(run.rejected, 1);
        assert_eq!(MemorySinks::names(&sinks.targets, "good"), vec!["g0", "g1"]);
        assert!(sinks.targets["good"].borrow().finished);
        assert_eq!(sinks.rejects["good"].borrow().len(), 1);
    }

    #[test]
    fn test_max_pairs_is_shared_across_lanes() {
        let dir = tempfile::tempdir().unwrap();
        let lane1 = write_fastq(dir.path(), "l1.fq", &[("a0", "AC"), ("a1", "AC")]);
        let lane2 = write_fastq(dir.path(), "l2.fq", &[("b0", "AC"), ("b1", "AC"), ("b2", "AC")]);
        let mut manifest = LibraryManifest::new();
        manifest.add_file("lib", "L001", "R1", lane1);
        manifest.add_file("lib", "L002", "R1", lane2);

        let registry = registry();
        let demux = Demultiplexer::new(
            &registry,
            Selection::Manual(vec!["ILLU".to_string()]),
            RunConfig {
                max_pairs: Some(3),
                write_rejects: false,
            },
        )
        .unwrap();
        let mut sinks = MemorySinks::default();
        let report = demux.run(&manifest, &mut sinks).unwrap();

        let run = report.libraries[0].run.as_ref().unwrap();
        assert_eq!(run.processed, 3);
        assert_eq!(run.successes("ILLU"), 3);
        assert_eq!(MemorySinks::names(&sinks.targets, "lib"), vec!["a0", "a1", "b0"]);
        assert!(sinks.rejects.is_empty());
    }

    #[test]
    fn test_mixed_mate_counts_are_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let r1 = write_fastq(dir.path(), "p_R1.fq", &[("p0", "AC")]);
        let r2 = write_fastq(dir.path(), "p_R2.fq", &[("p0", "GT")]);
        let single = write_fastq(dir.path(), "s_R1.fq", &[("s0", "AC"), ("s1", "AC")]);
        let mut manifest = LibraryManifest::new();
        manifest.add_file("lib", "L001", "R1", r1);
        manifest.add_file("lib", "L001", "R2", r2);
        manifest.add_file("lib", "L002", "R1", single);

        let registry = registry();
        let demux = Demultiplexer::new(
            &registry,
            Selection::Manual(vec!["ILLU".to_string()]),
            RunConfig::default(),
        )
        .unwrap();
        let mut sinks = MemorySinks::default();
        let err = demux.run(&manifest, &mut sinks).err().unwrap();
        assert!(matches!(
            err,
            PipelineError::Manifest(ManifestError::MixedMateCounts { .. })
        ));
        assert!(sinks.targets.is_empty());
    }
}
