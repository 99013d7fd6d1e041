use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::core::read::ReadPair;
use crate::core::tags::RecodedRecord;
use crate::core::types::YieldReport;
use crate::demux::sink::RecordSink;
use crate::parsing::fastq::ReadError;
use crate::strategy::{DemuxError, Strategy};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to read input: {0}")]
    Read(#[from] ReadError),

    #[error("Failed to write to the {sink} output: {source}")]
    Sink {
        sink: &'static str,
        source: std::io::Error,
    },
}

/// Applies a set of strategies to every read pair of a stream.
///
/// Each strategy is tried independently on each pair, so one pair may be
/// classified by several strategies. Per-pair failures never abort a run:
/// non-multiplexable pairs take the reject path and strategy defects
/// (including panics) are logged with the offending pair and counted.
pub struct ClassificationEngine {
    strategies: Vec<Arc<dyn Strategy>>,
    fallback: Option<Arc<dyn Strategy>>,
    library: Option<String>,
}

impl ClassificationEngine {
    pub fn new(strategies: Vec<Arc<dyn Strategy>>) -> Self {
        Self {
            strategies,
            fallback: None,
            library: None,
        }
    }

    /// Strategy used to format rejected pairs
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn Strategy>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Library passed to every strategy
    #[must_use]
    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    pub fn strategies(&self) -> &[Arc<dyn Strategy>] {
        &self.strategies
    }

    /// Short names of the strategies, in application order
    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies
            .iter()
            .map(|s| s.short_name().to_string())
            .collect()
    }

    /// Classify a stream.
    ///
    /// Successes go to `target`; pairs a strategy cannot classify are
    /// formatted by the fallback strategy and written to `reject`. Without a
    /// sink the records are discarded, which is how sampling runs count
    /// yields. Stops after `max_pairs` pairs when given; the limit is checked
    /// before each pair is pulled.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Read` if the stream fails and `EngineError::Sink`
    /// if a write fails. Classification failures are never returned.
    pub fn run<I>(
        &self,
        pairs: I,
        mut target: Option<&mut dyn RecordSink>,
        mut reject: Option<&mut dyn RecordSink>,
        max_pairs: Option<u64>,
    ) -> Result<YieldReport, EngineError>
    where
        I: IntoIterator<Item = Result<ReadPair, ReadError>>,
    {
        let mut report = YieldReport::new(self.strategy_names());
        let library = self.library.as_deref();
        let mut pairs = pairs.into_iter();

        loop {
            if max_pairs.is_some_and(|max| report.processed >= max) {
                debug!("Stopping after {} read pairs", report.processed);
                break;
            }
            let Some(pair) = pairs.next() else {
                break;
            };
            let pair = pair?;
            report.processed += 1;

            for (slot, strategy) in self.strategies.iter().enumerate() {
                match attempt(strategy.as_ref(), &pair, library) {
                    Ok(record) => {
                        if let Some(sink) = target.as_deref_mut() {
                            sink.write(&record).map_err(|source| EngineError::Sink {
                                sink: "target",
                                source,
                            })?;
                        }
                        report.record_success(slot);
                    }
                    Err(DemuxError::NonMultiplexable(reason)) => {
                        trace!("{} rejected {}: {}", strategy.short_name(), pair_name(&pair), reason);
                        if let Some(sink) = reject.as_deref_mut() {
                            self.write_reject(&pair, library, sink, &mut report)?;
                        }
                    }
                    Err(DemuxError::Defect(reason)) => {
                        error!("{}", defect_message(strategy.short_name(), &pair, &reason));
                        report.record_defect(slot);
                    }
                }
            }
        }

        Ok(report)
    }

    fn write_reject(
        &self,
        pair: &ReadPair,
        library: Option<&str>,
        sink: &mut dyn RecordSink,
        report: &mut YieldReport,
    ) -> Result<(), EngineError> {
        let Some(fallback) = &self.fallback else {
            return Ok(());
        };
        match attempt(fallback.as_ref(), pair, library) {
            Ok(record) => {
                sink.write(&record).map_err(|source| EngineError::Sink {
                    sink: "reject",
                    source,
                })?;
                report.rejected += 1;
            }
            Err(e) => {
                warn!(
                    "Could not format rejected read pair {}: {}",
                    pair_name(pair),
                    e
                );
                report.reject_failures += 1;
            }
        }
        Ok(())
    }
}

/// Run one strategy on one pair; a panic becomes a defect.
///
/// The process panic hook still runs before the panic is caught; the binary
/// installs one that reports through `tracing` (see `cli::install_panic_hook`).
fn attempt(
    strategy: &dyn Strategy,
    pair: &ReadPair,
    library: Option<&str>,
) -> Result<RecodedRecord, DemuxError> {
    catch_unwind(AssertUnwindSafe(|| strategy.demultiplex(pair, library)))
        .unwrap_or_else(|payload| Err(DemuxError::Defect(panic_message(payload.as_ref()))))
}

/// Text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string())
}

/// Log line for a defective classification, including the offending pair
fn defect_message(strategy: &str, pair: &ReadPair, reason: &str) -> String {
    format!(
        "Strategy {strategy} failed on read pair {}: {reason}\n{pair}",
        pair_name(pair)
    )
}

fn pair_name(pair: &ReadPair) -> &str {
    pair.r1().map_or("<empty>", |m| m.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::read::Mate;
    use crate::core::tags::TagSet;
    use crate::demux::sink::MemorySink;
    use crate::strategy::IlluminaBase;

    /// Classifies pairs whose read 1 starts with a fixed prefix
    struct Prefix {
        name: &'static str,
        prefix: &'static [u8],
    }

    impl Strategy for Prefix {
        fn short_name(&self) -> &str {
            self.name
        }
        fn long_name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "test"
        }
        fn auto_detectable(&self) -> bool {
            true
        }
        fn demultiplex(
            &self,
            pair: &ReadPair,
            _library: Option<&str>,
        ) -> Result<RecodedRecord, DemuxError> {
            let r1 = pair.r1().ok_or_else(|| DemuxError::non_multiplexable("empty"))?;
            if !r1.sequence.starts_with(self.prefix) {
                return Err(DemuxError::non_multiplexable("prefix"));
            }
            let mut tags = TagSet::new();
            tags.insert("Rn", &r1.name);
            tags.insert("dt", self.name);
            Ok(RecodedRecord::new(tags, pair.mates.clone()))
        }
    }

    struct Never;

    impl Strategy for Never {
        fn short_name(&self) -> &str {
            "NEVER"
        }
        fn long_name(&self) -> &str {
            "never"
        }
        fn description(&self) -> &str {
            "never classifies"
        }
        fn auto_detectable(&self) -> bool {
            true
        }
        fn demultiplex(&self, _: &ReadPair, _: Option<&str>) -> Result<RecodedRecord, DemuxError> {
            Err(DemuxError::non_multiplexable("never"))
        }
    }

    /// Classifies by prefix "A" but fails with a defect on prefix "C", and panics on "G"
    struct Flaky;

    impl Strategy for Flaky {
        fn short_name(&self) -> &str {
            "FLAKY"
        }
        fn long_name(&self) -> &str {
            "flaky"
        }
        fn description(&self) -> &str {
            "defective"
        }
        fn auto_detectable(&self) -> bool {
            true
        }
        fn demultiplex(&self, pair: &ReadPair, _: Option<&str>) -> Result<RecodedRecord, DemuxError> {
            match pair.mates[0].sequence.first() {
                Some(b'A') => Ok(RecodedRecord::new(TagSet::new(), pair.mates.clone())),
                Some(b'C') => Err(DemuxError::Defect("broken".to_string())),
                Some(b'G') => panic!("unexpected base"),
                _ => Err(DemuxError::non_multiplexable("other")),
            }
        }
    }

    #[test]
    fn test_defect_message_includes_pair() {
        let pair = ReadPair::single(Mate::new("r9", "1:N:0:A", "CAGT", "IIII"));
        let message = defect_message("FLAKY", &pair, "broken");
        assert!(message.starts_with("Strategy FLAKY failed on read pair r9: broken"));
        assert!(message.contains("CAGT"));
        assert!(message.contains("IIII"));
    }

    #[test]
    fn test_panic_message() {
        let payload = catch_unwind(|| panic!("static text")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static text");

        let code = 7;
        let payload = catch_unwind(|| panic!("code {code}")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "code 7");
    }

    fn stream(sequences: &[&str]) -> Vec<Result<ReadPair, ReadError>> {
        sequences
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Ok(ReadPair::single(Mate::new(
                    format!("read{i}"),
                    "",
                    *s,
                    "I".repeat(s.len()).as_str(),
                )))
            })
            .collect()
    }

    fn prefix(name: &'static str, prefix: &'static [u8]) -> Arc<dyn Strategy> {
        Arc::new(Prefix { name, prefix })
    }

    #[test]
    fn test_successes_are_written_in_stream_order() {
        let engine = ClassificationEngine::new(vec![prefix("A", b"A")]);
        let mut target = MemorySink::new();
        let report = engine
            .run(stream(&["AC", "GG", "AT", "AA"]), Some(&mut target), None, None)
            .unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.successes("A"), 3);
        let names: Vec<_> = target
            .records
            .iter()
            .map(|r| r.tags.get("Rn").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["read0", "read2", "read3"]);
    }

    #[test]
    fn test_strategies_are_not_exclusive() {
        let engine = ClassificationEngine::new(vec![prefix("A", b"A"), prefix("AC", b"AC")]);
        let mut target = MemorySink::new();
        let report = engine
            .run(stream(&["ACGT", "AGGT"]), Some(&mut target), None, None)
            .unwrap();
        assert_eq!(report.successes("A"), 2);
        assert_eq!(report.successes("AC"), 1);
        assert_eq!(target.len(), 3);
    }

    #[test]
    fn test_always_rejecting_strategy_writes_one_reject_per_pair() {
        let engine = ClassificationEngine::new(vec![Arc::new(Never)])
            .with_fallback(Arc::new(IlluminaBase::default()))
            .with_library("lib");
        let mut target = MemorySink::new();
        let mut reject = MemorySink::new();
        let report = engine
            .run(
                stream(&["AAAA", "CCCC", "GGGG"]),
                Some(&mut target),
                Some(&mut reject),
                None,
            )
            .unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(target.len(), 0);
        assert_eq!(reject.len(), 3);
        assert_eq!(report.rejected, 3);
        assert_eq!(reject.records[0].tags.get("LY"), Some("lib"));
        assert_eq!(reject.records[0].tags.get("dt"), Some("ILLU"));
    }

    #[test]
    fn test_reject_formatting_failure_is_counted() {
        let engine = ClassificationEngine::new(vec![Arc::new(Never)])
            .with_fallback(Arc::new(IlluminaBase::default()));
        let mut reject = MemorySink::new();
        // empty read name cannot be formatted
        let pairs = vec![Ok(ReadPair::single(Mate::new("", "", "A", "I")))];
        let report = engine.run(pairs, None, Some(&mut reject), None).unwrap();
        assert_eq!(reject.len(), 0);
        assert_eq!(report.reject_failures, 1);
    }

    #[test]
    fn test_max_pairs() {
        let engine = ClassificationEngine::new(vec![prefix("A", b"A")]);
        let mut source = stream(&["A", "A", "A", "A"]).into_iter();
        let report = engine.run(source.by_ref(), None, None, Some(2)).unwrap();
        assert_eq!(report.processed, 2);
        // the limit is checked before pulling, so nothing extra is consumed
        assert_eq!(source.count(), 2);
    }

    #[test]
    fn test_empty_stream_reports_zero_processed() {
        let engine = ClassificationEngine::new(vec![prefix("A", b"A")]);
        let report = engine.run(stream(&[]), None, None, None).unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.successes("A"), 0);
    }

    #[test]
    fn test_defects_do_not_abort_and_are_not_counted_as_yield() {
        let engine = ClassificationEngine::new(vec![Arc::new(Flaky), prefix("T", b"")]);
        let mut target = MemorySink::new();
        let report = engine
            .run(stream(&["AA", "CC", "GG", "TT"]), Some(&mut target), None, None)
            .unwrap();

        assert_eq!(report.processed, 4);
        // Defective executions are tracked separately and do not count as yield
        assert_eq!(report.successes("FLAKY"), 1);
        assert_eq!(report.defects("FLAKY"), 2);
        // the run continued with the next strategy on every pair
        assert_eq!(report.successes("T"), 4);
        assert_eq!(target.len(), 5);
    }

    #[test]
    fn test_idempotent() {
        let engine = ClassificationEngine::new(vec![prefix("A", b"A"), prefix("C", b"C")])
            .with_fallback(Arc::new(IlluminaBase::default()));
        let input = ["AC", "CA", "GT", "AA"];

        let mut first = (MemorySink::new(), MemorySink::new());
        let a = engine
            .run(stream(&input), Some(&mut first.0), Some(&mut first.1), None)
            .unwrap();
        let mut second = (MemorySink::new(), MemorySink::new());
        let b = engine
            .run(stream(&input), Some(&mut second.0), Some(&mut second.1), None)
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(first.0.records, second.0.records);
        assert_eq!(first.1.records, second.1.records);
    }

    #[test]
    fn test_read_error_propagates() {
        let engine = ClassificationEngine::new(vec![prefix("A", b"A")]);
        let pairs = vec![Err(ReadError::MateFiles(0))];
        assert!(matches!(
            engine.run(pairs, None, None, None),
            Err(EngineError::Read(_))
        ));
    }
}
