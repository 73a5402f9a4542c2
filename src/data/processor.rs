//! Pivot/Aggregation Engine
//! Reshapes flat benchmark records into (benchmark x allocator) views and
//! merges multiple record sets for cross-run comparison.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

use super::loader::{Record, RecordSet};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{}: duplicate ({benchmark}, {allocator}) pair", .path.display())]
    DuplicateKey {
        path: PathBuf,
        benchmark: String,
        allocator: String,
    },
    #[error("no valid input sources")]
    NoValidSources,
}

/// The measured quantity a view is built over. A fixed accessor set rather
/// than free-form column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    OpsPerSec,
    TimeUs,
}

impl Metric {
    fn value(self, record: &Record) -> f64 {
        match self {
            Metric::OpsPerSec => record.ops_per_sec,
            Metric::TimeUs => record.time_us,
        }
    }
}

/// Reduction applied when several records share a (benchmark, allocator)
/// pair. All variants are commutative and associative; ordering-sensitive
/// aggregations are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggFn {
    #[default]
    Mean,
    Sum,
    Min,
    Max,
}

impl AggFn {
    /// `values` is never empty: groups only exist for observed keys.
    fn apply(self, values: &[f64]) -> f64 {
        match self {
            AggFn::Mean => values.iter().sum::<f64>() / values.len() as f64,
            AggFn::Sum => values.iter().sum(),
            AggFn::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggFn::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// A two-dimensional view: (benchmark, allocator) -> value for one metric.
///
/// Pairs absent from the input stay absent; they are never materialized as
/// zero. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotView {
    cells: BTreeMap<(String, String), f64>,
}

impl PivotView {
    pub fn get(&self, benchmark: &str, allocator: &str) -> Option<f64> {
        self.cells
            .get(&(benchmark.to_string(), allocator.to_string()))
            .copied()
    }

    /// Row keys, sorted and deduplicated.
    pub fn benchmarks(&self) -> Vec<String> {
        self.cells
            .keys()
            .map(|(benchmark, _)| benchmark.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Column keys, sorted and deduplicated.
    pub fn allocators(&self) -> Vec<String> {
        self.cells
            .keys()
            .map(|(_, allocator)| allocator.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.cells
            .iter()
            .map(|((benchmark, allocator), value)| (benchmark.as_str(), allocator.as_str(), *value))
    }
}

/// Exact single-source pivot.
///
/// Requires at most one record per (benchmark, allocator) pair; a duplicate
/// within one source is rejected rather than silently resolved. Merging
/// duplicates is what `aggregate` is for.
pub fn pivot(records: &RecordSet, metric: Metric) -> Result<PivotView, EngineError> {
    let mut cells = BTreeMap::new();
    for record in records.records() {
        let key = (record.benchmark.clone(), record.allocator.clone());
        if cells.insert(key, metric.value(record)).is_some() {
            return Err(EngineError::DuplicateKey {
                path: records.path().to_path_buf(),
                benchmark: record.benchmark.clone(),
                allocator: record.allocator.clone(),
            });
        }
    }
    Ok(PivotView { cells })
}

/// Multi-source aggregation: concatenate all sets, group by the pair, reduce
/// each group with `agg`. Source order does not affect the result.
pub fn aggregate(
    sets: &[RecordSet],
    metric: Metric,
    agg: AggFn,
) -> Result<PivotView, EngineError> {
    if sets.is_empty() {
        return Err(EngineError::NoValidSources);
    }

    let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    for record in sets.iter().flat_map(|set| set.records()) {
        groups
            .entry((record.benchmark.clone(), record.allocator.clone()))
            .or_default()
            .push(metric.value(record));
    }

    let cells = groups
        .into_iter()
        .map(|(key, values)| (key, agg.apply(&values)))
        .collect();
    Ok(PivotView { cells })
}

/// Per-allocator reduction across all combined records, independent of
/// benchmark category.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocatorStats {
    pub allocator: String,
    pub count: usize,
    pub mean_ops_per_sec: f64,
    pub mean_time_us: f64,
}

/// Mean ops/sec and mean time per distinct allocator, sorted by allocator
/// name.
pub fn allocator_summary(sets: &[RecordSet]) -> Vec<AllocatorStats> {
    let mut groups: BTreeMap<String, (usize, f64, f64)> = BTreeMap::new();
    for record in sets.iter().flat_map(|set| set.records()) {
        let entry = groups.entry(record.allocator.clone()).or_insert((0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += record.ops_per_sec;
        entry.2 += record.time_us;
    }

    groups
        .into_iter()
        .map(|(allocator, (count, ops_sum, time_sum))| AllocatorStats {
            allocator,
            count,
            mean_ops_per_sec: ops_sum / count as f64,
            mean_time_us: time_sum / count as f64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(allocator: &str, benchmark: &str, ops: f64, time: f64) -> Record {
        Record {
            allocator: allocator.to_string(),
            benchmark: benchmark.to_string(),
            ops_per_sec: ops,
            time_us: time,
        }
    }

    fn set(name: &str, records: Vec<Record>) -> RecordSet {
        RecordSet::new(PathBuf::from(name), records)
    }

    #[test]
    fn pivot_keeps_absent_pairs_absent() {
        let records = set(
            "run.csv",
            vec![
                rec("tcmalloc", "random_alloc", 1000.0, 250.0),
                rec("jemalloc", "random_alloc", 1200.0, 210.0),
                rec("tcmalloc", "fixed_alloc", 3000.0, 80.0),
            ],
        );

        let view = pivot(&records, Metric::OpsPerSec).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.get("random_alloc", "tcmalloc"), Some(1000.0));
        assert_eq!(view.get("fixed_alloc", "tcmalloc"), Some(3000.0));
        // jemalloc never ran fixed_alloc: no cell, and in particular no zero.
        assert_eq!(view.get("fixed_alloc", "jemalloc"), None);
    }

    #[test]
    fn pivot_orders_keys_deterministically() {
        let records = set(
            "run.csv",
            vec![
                rec("tcmalloc", "random_alloc", 1000.0, 250.0),
                rec("jemalloc", "fixed_alloc", 2000.0, 100.0),
                rec("glibc", "mixed_workload", 500.0, 400.0),
            ],
        );

        let view = pivot(&records, Metric::TimeUs).unwrap();
        assert_eq!(
            view.benchmarks(),
            vec!["fixed_alloc", "mixed_workload", "random_alloc"]
        );
        assert_eq!(view.allocators(), vec!["glibc", "jemalloc", "tcmalloc"]);
    }

    #[test]
    fn pivot_selects_the_requested_metric() {
        let records = set("run.csv", vec![rec("tcmalloc", "random_alloc", 1000.0, 250.0)]);

        let ops = pivot(&records, Metric::OpsPerSec).unwrap();
        let time = pivot(&records, Metric::TimeUs).unwrap();
        assert_eq!(ops.get("random_alloc", "tcmalloc"), Some(1000.0));
        assert_eq!(time.get("random_alloc", "tcmalloc"), Some(250.0));
    }

    #[test]
    fn pivot_rejects_duplicate_pairs() {
        let records = set(
            "run.csv",
            vec![
                rec("tcmalloc", "random_alloc", 1000.0, 250.0),
                rec("tcmalloc", "random_alloc", 1100.0, 240.0),
            ],
        );

        match pivot(&records, Metric::OpsPerSec) {
            Err(EngineError::DuplicateKey {
                benchmark,
                allocator,
                ..
            }) => {
                assert_eq!(benchmark, "random_alloc");
                assert_eq!(allocator, "tcmalloc");
            }
            other => panic!("expected DuplicateKey, got {other:?}"),
        }
    }

    #[test]
    fn aggregate_matches_pivot_on_duplicate_free_input() {
        let records = set(
            "run.csv",
            vec![
                rec("tcmalloc", "random_alloc", 1000.0, 250.0),
                rec("jemalloc", "random_alloc", 1200.0, 210.0),
                rec("tcmalloc", "fixed_alloc", 3000.0, 80.0),
            ],
        );

        let pivoted = pivot(&records, Metric::OpsPerSec).unwrap();
        let aggregated =
            aggregate(std::slice::from_ref(&records), Metric::OpsPerSec, AggFn::Mean).unwrap();
        assert_eq!(pivoted, aggregated);
    }

    #[test]
    fn aggregate_means_across_sources() {
        let run_a = set(
            "a.csv",
            vec![rec("tcmalloc", "random_alloc", 1000.0, 250.0)],
        );
        let run_b = set(
            "b.csv",
            vec![rec("tcmalloc", "random_alloc", 2000.0, 150.0)],
        );

        let view = aggregate(&[run_a, run_b], Metric::OpsPerSec, AggFn::Mean).unwrap();
        assert_eq!(view.get("random_alloc", "tcmalloc"), Some(1500.0));
    }

    #[test]
    fn aggregate_is_order_independent() {
        let run_a = set(
            "a.csv",
            vec![
                rec("tcmalloc", "random_alloc", 1000.0, 250.0),
                rec("jemalloc", "fixed_alloc", 4000.0, 60.0),
            ],
        );
        let run_b = set(
            "b.csv",
            vec![rec("tcmalloc", "random_alloc", 3000.0, 90.0)],
        );

        let forward = aggregate(
            &[run_a.clone(), run_b.clone()],
            Metric::OpsPerSec,
            AggFn::Mean,
        )
        .unwrap();
        let reversed = aggregate(&[run_b, run_a], Metric::OpsPerSec, AggFn::Mean).unwrap();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn aggregate_supports_min_max_sum() {
        let run_a = set("a.csv", vec![rec("tcmalloc", "random_alloc", 1000.0, 250.0)]);
        let run_b = set("b.csv", vec![rec("tcmalloc", "random_alloc", 3000.0, 90.0)]);
        let sets = [run_a, run_b];

        let min = aggregate(&sets, Metric::OpsPerSec, AggFn::Min).unwrap();
        let max = aggregate(&sets, Metric::OpsPerSec, AggFn::Max).unwrap();
        let sum = aggregate(&sets, Metric::OpsPerSec, AggFn::Sum).unwrap();
        assert_eq!(min.get("random_alloc", "tcmalloc"), Some(1000.0));
        assert_eq!(max.get("random_alloc", "tcmalloc"), Some(3000.0));
        assert_eq!(sum.get("random_alloc", "tcmalloc"), Some(4000.0));
    }

    #[test]
    fn aggregate_with_no_sets_fails() {
        assert!(matches!(
            aggregate(&[], Metric::OpsPerSec, AggFn::Mean),
            Err(EngineError::NoValidSources)
        ));
    }

    #[test]
    fn allocator_summary_means_ignore_benchmark() {
        let run = set(
            "run.csv",
            vec![
                rec("jemalloc", "random_alloc", 100.0, 10.0),
                rec("jemalloc", "fixed_alloc", 300.0, 30.0),
                rec("tcmalloc", "random_alloc", 500.0, 50.0),
            ],
        );

        let summary = allocator_summary(&[run]);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].allocator, "jemalloc");
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[0].mean_ops_per_sec, 200.0);
        assert_eq!(summary[0].mean_time_us, 20.0);
        assert_eq!(summary[1].allocator, "tcmalloc");
        assert_eq!(summary[1].mean_ops_per_sec, 500.0);
    }

    #[test]
    fn allocator_summary_spans_sources() {
        let run_a = set("a.csv", vec![rec("jemalloc", "random_alloc", 100.0, 10.0)]);
        let run_b = set("b.csv", vec![rec("jemalloc", "fixed_alloc", 300.0, 30.0)]);

        let summary = allocator_summary(&[run_a, run_b]);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].mean_ops_per_sec, 200.0);
        assert_eq!(summary[0].mean_time_us, 20.0);
    }
}
