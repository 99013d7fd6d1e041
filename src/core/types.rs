use serde::{Deserialize, Serialize};

/// Helper function to convert a count to f64 with explicit precision loss allowance
#[inline]
pub(crate) fn count_to_f64(count: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// One reference code: an observed sequence and the identifier it stands for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Code {
    /// Upper-case sequence over `ACGTN`
    pub sequence: String,

    /// Identifier (cell, well, or sample index name). Need not be unique within a table.
    pub identifier: String,
}

impl Code {
    pub fn new(sequence: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            sequence: sequence.into(),
            identifier: identifier.into(),
        }
    }
}

/// Success count for one strategy within a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyYield {
    /// Strategy short name
    pub strategy: String,

    /// Number of read pairs this strategy classified
    pub successes: u64,

    /// Number of read pairs on which this strategy failed with a defect
    #[serde(default)]
    pub defects: u64,
}

/// Per-strategy success counts for one sampling or processing run.
///
/// Entries are kept in the order the strategies were supplied to the run,
/// which is also the tie-break order when ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldReport {
    /// Number of read pairs pulled from the stream
    pub processed: u64,

    /// Number of records written to the reject sink
    #[serde(default)]
    pub rejected: u64,

    /// Number of pairs the fallback strategy could not format for the reject sink
    #[serde(default)]
    pub reject_failures: u64,

    entries: Vec<StrategyYield>,
}

impl YieldReport {
    /// Create an empty report with one zeroed entry per strategy name
    pub fn new<I, S>(strategies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            processed: 0,
            rejected: 0,
            reject_failures: 0,
            entries: strategies
                .into_iter()
                .map(|name| StrategyYield {
                    strategy: name.into(),
                    successes: 0,
                    defects: 0,
                })
                .collect(),
        }
    }

    /// Build a report directly from counts, in the given order
    pub fn from_counts<I, S>(processed: u64, counts: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self {
            processed,
            rejected: 0,
            reject_failures: 0,
            entries: counts
                .into_iter()
                .map(|(name, successes)| StrategyYield {
                    strategy: name.into(),
                    successes,
                    defects: 0,
                })
                .collect(),
        }
    }

    pub(crate) fn record_success(&mut self, slot: usize) {
        self.entries[slot].successes += 1;
    }

    pub(crate) fn record_defect(&mut self, slot: usize) {
        self.entries[slot].defects += 1;
    }

    /// Add the counts of another run over the same strategies, in the same order
    pub(crate) fn absorb(&mut self, other: &YieldReport) {
        self.processed += other.processed;
        self.rejected += other.rejected;
        self.reject_failures += other.reject_failures;
        for (mine, theirs) in self.entries.iter_mut().zip(&other.entries) {
            debug_assert_eq!(mine.strategy, theirs.strategy);
            mine.successes += theirs.successes;
            mine.defects += theirs.defects;
        }
    }

    /// Entries in strategy order
    pub fn entries(&self) -> &[StrategyYield] {
        &self.entries
    }

    /// Success count for a strategy, 0 when the strategy was not part of the run
    pub fn successes(&self, strategy: &str) -> u64 {
        self.entries
            .iter()
            .find(|e| e.strategy == strategy)
            .map_or(0, |e| e.successes)
    }

    /// Defect count for a strategy, 0 when the strategy was not part of the run
    pub fn defects(&self, strategy: &str) -> u64 {
        self.entries
            .iter()
            .find(|e| e.strategy == strategy)
            .map_or(0, |e| e.defects)
    }

    /// Total successes across all strategies
    pub fn total_successes(&self) -> u64 {
        self.entries.iter().map(|e| e.successes).sum()
    }

    /// Yield of a strategy as a percentage of the processed pairs
    pub fn percent(&self, strategy: &str) -> f64 {
        percent_of(self.successes(strategy), self.processed)
    }

    /// Entries ranked by success count descending; ties keep strategy order
    pub fn ranked(&self) -> Vec<&StrategyYield> {
        let mut ranked: Vec<&StrategyYield> = self.entries.iter().collect();
        // sort_by is stable
        ranked.sort_by(|a, b| b.successes.cmp(&a.successes));
        ranked
    }
}

/// `count / total * 100`, or 0 when nothing was processed
#[must_use]
pub fn percent_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count_to_f64(count) / count_to_f64(total) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_is_stable_on_ties() {
        let report = YieldReport::from_counts(10, [("A", 3), ("B", 5), ("C", 3), ("D", 0)]);
        let names: Vec<&str> = report.ranked().iter().map(|e| e.strategy.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C", "D"]);
    }

    #[test]
    fn test_percent() {
        let report = YieldReport::from_counts(200, [("A", 50)]);
        assert!((report.percent("A") - 25.0).abs() < f64::EPSILON);
        assert!(report.percent("missing").abs() < f64::EPSILON);
    }

    #[test]
    fn test_percent_of_empty_run() {
        assert!(percent_of(0, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_counts() {
        let mut report = YieldReport::new(["A", "B"]);
        report.record_success(1);
        report.record_success(1);
        report.record_defect(0);
        assert_eq!(report.successes("B"), 2);
        assert_eq!(report.successes("A"), 0);
        assert_eq!(report.defects("A"), 1);
        assert_eq!(report.total_successes(), 2);
    }

    #[test]
    fn test_absorb() {
        let mut total = YieldReport::from_counts(10, [("A", 3), ("B", 1)]);
        total.absorb(&YieldReport::from_counts(5, [("A", 2), ("B", 0)]));
        assert_eq!(total.processed, 15);
        assert_eq!(total.successes("A"), 5);
        assert_eq!(total.successes("B"), 1);
    }
}
