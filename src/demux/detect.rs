use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::read::ReadPair;
use crate::core::types::{percent_of, YieldReport};
use crate::demux::engine::{ClassificationEngine, EngineError};
use crate::parsing::fastq::ReadError;
use crate::strategy::Strategy;

/// Default number of read pairs sampled per library
pub const DEFAULT_SAMPLE_SIZE: u64 = 10_000;

/// Default maximum number of strategies selected per library
pub const DEFAULT_MAX_METHODS: usize = 1;

/// Default minimum yield, in percent of sampled pairs, for a strategy to be selected
pub const DEFAULT_MIN_PERCENT: f64 = 2.0;

/// Parameters of sampling-based strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionConfig {
    pub sample_size: u64,
    pub max_methods: usize,
    pub min_percent: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_methods: DEFAULT_MAX_METHODS,
            min_percent: DEFAULT_MIN_PERCENT,
        }
    }
}

/// Yields of a sample and the strategies chosen from them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub report: YieldReport,
    pub selected: Vec<String>,
}

/// Picks the strategies that best fit a library by trying all of them on a sample
#[derive(Debug, Clone, Default)]
pub struct AutoDetector {
    config: DetectionConfig,
}

impl AutoDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Count per-strategy successes over the first `sample_size` pairs.
    /// No records are written.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Read` if the sample cannot be read.
    pub fn detect<I>(
        &self,
        pairs: I,
        strategies: &[Arc<dyn Strategy>],
    ) -> Result<YieldReport, EngineError>
    where
        I: IntoIterator<Item = Result<ReadPair, ReadError>>,
    {
        let engine = ClassificationEngine::new(strategies.to_vec());
        let report = engine.run(pairs, None, None, Some(self.config.sample_size))?;
        debug!(
            "Sampled {} read pairs over {} strategies",
            report.processed,
            strategies.len()
        );
        Ok(report)
    }

    /// Sample, then select
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Read` if the sample cannot be read.
    pub fn detect_and_select<I>(
        &self,
        pairs: I,
        strategies: &[Arc<dyn Strategy>],
    ) -> Result<Detection, EngineError>
    where
        I: IntoIterator<Item = Result<ReadPair, ReadError>>,
    {
        let report = self.detect(pairs, strategies)?;
        let selected = self.select(&report);
        info!("Selected strategies: {:?}", selected);
        Ok(Detection { report, selected })
    }

    pub fn select(&self, report: &YieldReport) -> Vec<String> {
        select_strategies(report, self.config.max_methods, self.config.min_percent)
    }
}

/// Select strategies from a yield report.
///
/// Strategies that classified nothing are never candidates. The rest are
/// ranked by success count (ties keep report order), the top `max_methods`
/// are kept, and of those only the ones reaching `min_percent`
/// of the processed pairs remain. The result may be empty.
pub fn select_strategies(report: &YieldReport, max_methods: usize, min_percent: f64) -> Vec<String> {
    report
        .ranked()
        .into_iter()
        .filter(|entry| entry.successes > 0)
        .take(max_methods)
        .filter(|entry| percent_of(entry.successes, report.processed) >= min_percent)
        .map(|entry| entry.strategy.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::read::Mate;
    use crate::core::tags::{RecodedRecord, TagSet};
    use crate::strategy::DemuxError;

    #[test]
    fn test_select_top_methods() {
        let report = YieldReport::from_counts(100, [("A", 90), ("B", 40), ("C", 5)]);
        assert_eq!(select_strategies(&report, 2, 10.0), vec!["A", "B"]);
        assert_eq!(select_strategies(&report, 2, 50.0), vec!["A"]);
        assert_eq!(select_strategies(&report, 3, 2.0), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_select_ranks_before_threshold() {
        // C passes the threshold but is excluded by rank
        let report = YieldReport::from_counts(100, [("C", 30), ("A", 90), ("B", 40)]);
        assert_eq!(select_strategies(&report, 2, 10.0), vec!["A", "B"]);
    }

    #[test]
    fn test_select_ties_keep_discovery_order() {
        let report = YieldReport::from_counts(100, [("X", 50), ("Y", 50)]);
        assert_eq!(select_strategies(&report, 1, 0.0), vec!["X"]);
    }

    #[test]
    fn test_select_may_be_empty() {
        let report = YieldReport::from_counts(100, [("A", 1)]);
        assert!(select_strategies(&report, 1, 2.0).is_empty());
        let empty = YieldReport::from_counts(0, [("A", 0)]);
        assert!(select_strategies(&empty, 1, 0.1).is_empty());
    }

    #[test]
    fn test_select_skips_strategies_without_successes() {
        let empty = YieldReport::from_counts(0, [("A", 0)]);
        assert!(select_strategies(&empty, 1, 0.0).is_empty());

        let none = YieldReport::from_counts(100, [("A", 0), ("B", 0)]);
        assert!(select_strategies(&none, 2, 0.0).is_empty());

        let some = YieldReport::from_counts(100, [("A", 0), ("B", 3)]);
        assert_eq!(select_strategies(&some, 2, 0.0), vec!["B"]);
    }

    struct EveryOther;

    impl Strategy for EveryOther {
        fn short_name(&self) -> &str {
            "HALF"
        }
        fn long_name(&self) -> &str {
            "half"
        }
        fn description(&self) -> &str {
            "classifies even read numbers"
        }
        fn auto_detectable(&self) -> bool {
            true
        }
        fn demultiplex(&self, pair: &ReadPair, _: Option<&str>) -> Result<RecodedRecord, DemuxError> {
            let n: u64 = pair.mates[0].name.parse().unwrap_or(1);
            if n % 2 == 0 {
                Ok(RecodedRecord::new(TagSet::new(), pair.mates.clone()))
            } else {
                Err(DemuxError::non_multiplexable("odd"))
            }
        }
    }

    fn pairs(n: u64) -> impl Iterator<Item = Result<ReadPair, ReadError>> {
        (0..n).map(|i| Ok(ReadPair::single(Mate::new(i.to_string(), "", "A", "I"))))
    }

    #[test]
    fn test_detect_samples_at_most_sample_size() {
        let detector = AutoDetector::new(DetectionConfig {
            sample_size: 10,
            max_methods: 1,
            min_percent: 40.0,
        });
        let strategies: Vec<Arc<dyn Strategy>> = vec![Arc::new(EveryOther)];

        let detection = detector.detect_and_select(pairs(100), &strategies).unwrap();
        assert_eq!(detection.report.processed, 10);
        assert_eq!(detection.report.successes("HALF"), 5);
        assert_eq!(detection.selected, vec!["HALF"]);

        // shorter streams are sampled whole
        let report = detector.detect(pairs(3), &strategies).unwrap();
        assert_eq!(report.processed, 3);
    }
}
