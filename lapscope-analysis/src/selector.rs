//! Representative sample selection
//!
//! Keeps raw snapshots at fixed positions of the stream (first, quartiles,
//! last) and the top-K samples by change score against their predecessor.

use crate::value_hasher;
use ahash::{AHashMap, RandomState};
use lapscope_core::{visit_leaves, ScanLimits};
use serde_json::Value;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::debug;

/// Fixed stream position of a representative sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleLabel {
    /// Index 0
    First,
    /// `n / 4`
    Quarter,
    /// `n / 2`
    Half,
    /// `3n / 4`
    ThreeQuarters,
    /// `n - 1`, refined to the final sample once the pass ends
    Last,
}

impl SampleLabel {
    /// All labels in stream order
    pub const ALL: [SampleLabel; 5] = [
        SampleLabel::First,
        SampleLabel::Quarter,
        SampleLabel::Half,
        SampleLabel::ThreeQuarters,
        SampleLabel::Last,
    ];

    /// File-name label
    pub fn as_str(self) -> &'static str {
        match self {
            SampleLabel::First => "first",
            SampleLabel::Quarter => "25pct",
            SampleLabel::Half => "50pct",
            SampleLabel::ThreeQuarters => "75pct",
            SampleLabel::Last => "last",
        }
    }

    fn target(self, total: u64) -> u64 {
        match self {
            SampleLabel::First => 0,
            SampleLabel::Quarter => total / 4,
            SampleLabel::Half => total / 2,
            SampleLabel::ThreeQuarters => total.saturating_mul(3) / 4,
            SampleLabel::Last => total.saturating_sub(1),
        }
    }
}

/// Raw snapshot of one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSample {
    /// Index of the sample in the analysed stream
    pub sample_index: u64,
    /// Compact JSON text of the sample
    pub raw_json: String,
}

/// Fixed-position slot
#[derive(Debug, Clone)]
pub struct FixedSample {
    /// Slot label
    pub label: SampleLabel,
    /// Sample index the slot waits for, if known
    pub target_index: Option<u64>,
    /// Snapshot, once captured
    pub captured: Option<CapturedSample>,
}

/// High-change sample kept in the top-K set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestingSample {
    /// Changed + appeared + disappeared leaf paths vs. the previous sample
    pub score: u64,
    /// Snapshot
    pub sample: CapturedSample,
}

impl InterestingSample {
    fn key(&self) -> (u64, u64) {
        (self.score, self.sample.sample_index)
    }
}

impl Ord for InterestingSample {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for InterestingSample {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Picks a small set of raw samples worth inspecting by hand.
///
/// Needs no schema knowledge: each sample is re-flattened into
/// `path -> value hash` and compared with the previous one.
#[derive(Debug, Clone)]
pub struct SampleSelector {
    fixed: [FixedSample; 5],
    total_estimate: Option<u64>,
    capacity: usize,
    index_threshold: usize,
    top: BinaryHeap<Reverse<InterestingSample>>,
    previous: Option<AHashMap<String, u64>>,
    hasher: RandomState,
    samples_seen: u64,
}

impl SampleSelector {
    /// Create a selector; only `first` has a target until an estimate is set
    pub fn new(limits: &ScanLimits) -> Self {
        Self {
            fixed: SampleLabel::ALL.map(|label| FixedSample {
                label,
                target_index: (label == SampleLabel::First).then_some(0),
                captured: None,
            }),
            total_estimate: None,
            capacity: limits.interesting_samples,
            index_threshold: limits.index_threshold,
            top: BinaryHeap::with_capacity(limits.interesting_samples + 1),
            previous: None,
            hasher: value_hasher(),
            samples_seen: 0,
        }
    }

    /// Fix the quantile targets from an estimated total sample count
    pub fn set_total_estimate(&mut self, total: u64) {
        let total = total.max(1);
        self.total_estimate = Some(total);
        for slot in &mut self.fixed {
            slot.target_index = Some(slot.label.target(total));
        }
        debug!(
            total,
            quarter = ?self.fixed[1].target_index,
            half = ?self.fixed[2].target_index,
            last = ?self.fixed[4].target_index,
            "Representative sample targets set"
        );
    }

    /// Estimated total, if set
    pub fn total_estimate(&self) -> Option<u64> {
        self.total_estimate
    }

    /// Samples recorded so far
    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    /// Capture fixed-position snapshots and score the sample against its
    /// predecessor
    pub fn record(&mut self, sample: &Value, sample_index: u64) {
        self.samples_seen += 1;
        let mut raw: Option<String> = None;

        for slot in &mut self.fixed {
            if slot.captured.is_none() && slot.target_index == Some(sample_index) {
                let raw_json = raw.get_or_insert_with(|| sample.to_string()).clone();
                slot.captured = Some(CapturedSample {
                    sample_index,
                    raw_json,
                });
            }
        }

        if self.capacity == 0 {
            return;
        }

        let current = self.leaf_hashes(sample);
        let score = self
            .previous
            .as_ref()
            .map_or(0, |previous| change_score(previous, &current));
        self.previous = Some(current);

        if score > 0 {
            self.offer(score, sample_index, || {
                raw.take().unwrap_or_else(|| sample.to_string())
            });
        }
    }

    /// Refine `last` to the final analysed sample.
    ///
    /// The `last` target comes from an estimate; when the stream ends at a
    /// different index the true final sample replaces it.
    pub fn finish(&mut self, final_sample: Option<(u64, &Value)>) {
        let Some((sample_index, sample)) = final_sample else {
            return;
        };
        let slot = &mut self.fixed[4];
        let captured_index = slot.captured.as_ref().map(|c| c.sample_index);
        if captured_index == Some(sample_index) {
            return;
        }

        debug!(
            estimated = ?slot.target_index,
            actual = sample_index,
            "Refining last sample to end of stream"
        );
        slot.target_index = Some(sample_index);
        slot.captured = Some(CapturedSample {
            sample_index,
            raw_json: sample.to_string(),
        });
    }

    /// Fixed slots in stream order (captured or not)
    pub fn fixed_slots(&self) -> &[FixedSample] {
        &self.fixed
    }

    /// Captured fixed-position snapshots, ordered by sample index
    pub fn fixed_samples(&self) -> Vec<(SampleLabel, &CapturedSample)> {
        let mut samples: Vec<_> = self
            .fixed
            .iter()
            .filter_map(|slot| slot.captured.as_ref().map(|c| (slot.label, c)))
            .collect();
        samples.sort_by_key(|(_, captured)| captured.sample_index);
        samples
    }

    /// Top-K snapshots, highest score first (ties: latest first)
    pub fn interesting_samples(&self) -> Vec<&InterestingSample> {
        let mut samples: Vec<_> = self.top.iter().map(|Reverse(s)| s).collect();
        samples.sort_by(|a, b| b.cmp(a));
        samples
    }

    fn offer<F>(&mut self, score: u64, sample_index: u64, raw_json: F)
    where
        F: FnOnce() -> String,
    {
        if self.top.len() >= self.capacity {
            let beats_minimum = self
                .top
                .peek()
                .is_some_and(|Reverse(min)| (score, sample_index) > min.key());
            if !beats_minimum {
                return;
            }
            self.top.pop();
        }

        self.top.push(Reverse(InterestingSample {
            score,
            sample: CapturedSample {
                sample_index,
                raw_json: raw_json(),
            },
        }));
    }

    fn leaf_hashes(&self, sample: &Value) -> AHashMap<String, u64> {
        let mut hashes = AHashMap::with_capacity(self.previous.as_ref().map_or(0, |p| p.len()));
        let hasher = &self.hasher;
        visit_leaves(sample, self.index_threshold, &mut |path, leaf| {
            hashes.insert(path.to_string(), hasher.hash_one(&*leaf.text));
        });
        hashes
    }
}

/// Paths whose hash changed, plus paths present in only one of the maps.
fn change_score(previous: &AHashMap<String, u64>, current: &AHashMap<String, u64>) -> u64 {
    let mut changed = 0u64;
    let mut added = 0u64;
    let mut common = 0usize;

    for (path, hash) in current {
        match previous.get(path) {
            Some(prev) => {
                common += 1;
                if prev != hash {
                    changed += 1;
                }
            }
            None => added += 1,
        }
    }

    let removed = (previous.len() - common) as u64;
    changed + added + removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn selector(k: usize) -> SampleSelector {
        SampleSelector::new(&ScanLimits {
            interesting_samples: k,
            ..Default::default()
        })
    }

    #[test]
    fn captures_fixed_positions() {
        let mut selector = selector(5);
        selector.set_total_estimate(8);
        for i in 0..8u64 {
            selector.record(&json!({ "i": i }), i);
        }

        let fixed: Vec<(&str, u64)> = selector
            .fixed_samples()
            .iter()
            .map(|(label, c)| (label.as_str(), c.sample_index))
            .collect();
        assert_eq!(
            fixed,
            vec![("first", 0), ("25pct", 2), ("50pct", 4), ("75pct", 6), ("last", 7)]
        );
        let half = selector.fixed_samples()[2].1.raw_json.clone();
        assert_eq!(serde_json::from_str::<Value>(&half).unwrap(), json!({"i": 4}));
    }

    #[test]
    fn scores_changed_added_and_removed_paths() {
        let mut previous = AHashMap::new();
        previous.insert("a".to_string(), 1);
        previous.insert("b".to_string(), 2);
        previous.insert("gone".to_string(), 3);
        let mut current = AHashMap::new();
        current.insert("a".to_string(), 1);
        current.insert("b".to_string(), 9);
        current.insert("new".to_string(), 4);
        assert_eq!(change_score(&previous, &current), 3);
        assert_eq!(change_score(&current, &current), 0);
    }

    #[test]
    fn keeps_top_k_by_score() {
        let mut selector = selector(2);
        let samples = [
            json!({"a": 0, "b": 0, "c": 0}),
            json!({"a": 1, "b": 0, "c": 0}),
            json!({"a": 2, "b": 1, "c": 1}),
            json!({"a": 2, "b": 1, "c": 1}),
            json!({"a": 3, "b": 2, "c": 1}),
        ];
        for (i, sample) in samples.iter().enumerate() {
            selector.record(sample, i as u64);
        }

        let top: Vec<(u64, u64)> = selector
            .interesting_samples()
            .iter()
            .map(|s| (s.score, s.sample.sample_index))
            .collect();
        assert_eq!(top, vec![(3, 2), (2, 4)]);
    }

    #[test]
    fn ties_prefer_later_samples() {
        let mut selector = selector(1);
        selector.record(&json!({"x": 0}), 0);
        selector.record(&json!({"x": 1}), 1);
        selector.record(&json!({"x": 2}), 2);
        let top = selector.interesting_samples();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].sample.sample_index, 2);
    }

    #[test]
    fn zero_score_is_never_interesting() {
        let mut selector = selector(5);
        for i in 0..4 {
            selector.record(&json!({"x": 1}), i);
        }
        assert!(selector.interesting_samples().is_empty());
    }

    #[test]
    fn finish_refines_last_when_estimate_overshoots() {
        let mut selector = selector(5);
        selector.set_total_estimate(100);
        let samples: Vec<Value> = (0..10).map(|i| json!({ "i": i })).collect();
        for (i, sample) in samples.iter().enumerate() {
            selector.record(sample, i as u64);
        }
        assert!(selector.fixed_slots()[4].captured.is_none());

        selector.finish(Some((9, &samples[9])));
        let last = selector.fixed_slots()[4].captured.as_ref().expect("last");
        assert_eq!(last.sample_index, 9);
        // Quantile targets beyond the stream stay empty.
        assert!(selector.fixed_slots()[1].captured.is_none());
    }

    #[test]
    fn without_estimate_first_and_last_are_kept() {
        let mut selector = selector(5);
        let samples = [json!(1), json!(2), json!(3)];
        for (i, sample) in samples.iter().enumerate() {
            selector.record(sample, i as u64);
        }
        selector.finish(Some((2, &samples[2])));
        let labels: Vec<&str> = selector
            .fixed_samples()
            .iter()
            .map(|(label, _)| label.as_str())
            .collect();
        assert_eq!(labels, vec!["first", "last"]);
    }
}
