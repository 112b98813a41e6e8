//! Per-path change tracking and wildcard aggregation

use crate::value_hasher;
use ahash::{AHashMap, RandomState};
use lapscope_core::{truncate_chars, visit_leaves, wildcard_path, Leaf, ScanLimits, UpdateFrequency};
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::cmp::Ordering;

/// Change history of one concrete leaf path.
#[derive(Debug, Clone, Serialize)]
pub struct FieldChangeRecord {
    /// Concrete path with literal indices, e.g. `Vehicles[3].Position.X`
    pub path: String,
    /// First value observed (truncated)
    pub first_value: String,
    /// Value after the most recent change (truncated)
    pub last_value: String,
    /// Number of samples in which the path was present
    pub total_observations: u64,
    /// Number of transitions between consecutive observations
    pub change_count: u64,
    /// Sample indices of the earliest transitions
    pub change_indices: SmallVec<[u64; 4]>,
    /// Largest absolute difference between consecutive numeric observations
    pub max_delta: Option<f64>,
    #[serde(skip)]
    previous_hash: u64,
    #[serde(skip)]
    previous_numeric: Option<f64>,
}

impl FieldChangeRecord {
    fn new(path: &str, leaf: &Leaf<'_>, hash: u64, limits: &ScanLimits) -> Self {
        let seed = truncate_chars(&leaf.text, limits.max_value_chars).to_string();
        Self {
            path: path.to_string(),
            first_value: seed.clone(),
            last_value: seed,
            total_observations: 0,
            change_count: 0,
            change_indices: SmallVec::new(),
            max_delta: None,
            previous_hash: hash,
            previous_numeric: leaf.numeric,
        }
    }

    /// Frequency class derived from changes vs. observations
    pub fn frequency(&self) -> UpdateFrequency {
        UpdateFrequency::classify(self.change_count, self.total_observations)
    }

    fn observe(&mut self, leaf: &Leaf<'_>, hash: u64, sample_index: u64, limits: &ScanLimits) {
        self.total_observations += 1;

        if hash != self.previous_hash {
            self.change_count += 1;
            if self.change_indices.len() < limits.max_change_indices {
                self.change_indices.push(sample_index);
            }
            if let (Some(current), Some(previous)) = (leaf.numeric, self.previous_numeric) {
                let delta = (current - previous).abs();
                self.max_delta = Some(self.max_delta.map_or(delta, |max| max.max(delta)));
            }
            self.last_value = truncate_chars(&leaf.text, limits.max_value_chars).to_string();
        }

        self.previous_hash = hash;
        self.previous_numeric = leaf.numeric;
    }
}

/// Statistics for all concrete paths that share one wildcard path.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedFieldRecord {
    /// Path with every literal index replaced by `[*]`
    pub wildcard_path: String,
    /// Concrete paths in the group
    pub index_count: usize,
    /// Concrete paths in the group that changed at least once
    pub active_count: usize,
    /// Sum of change counts
    pub total_changes: u64,
    /// Mean change count per concrete path
    pub avg_changes: f64,
    /// Largest change count of any concrete path
    pub max_changes: u64,
    /// Largest consecutive numeric delta of any concrete path (0 when none)
    pub max_delta: f64,
    /// Frequency of the most active concrete path
    pub representative_frequency: UpdateFrequency,
    /// Earliest distinct change indices across the group
    pub first_change_indices: Vec<u64>,
    /// Representative first value, set for all-static groups
    pub first_value: Option<String>,
}

impl AggregatedFieldRecord {
    /// Whether the group spans array indices
    pub fn is_array_path(&self) -> bool {
        self.wildcard_path.contains(lapscope_core::WILDCARD_INDEX)
    }

    fn from_group(wildcard_path: String, group: &[&FieldChangeRecord], max_indices: usize) -> Self {
        let index_count = group.len();
        let active_count = group.iter().filter(|r| r.change_count > 0).count();
        let total_changes: u64 = group.iter().map(|r| r.change_count).sum();
        let max_changes = group.iter().map(|r| r.change_count).max().unwrap_or(0);
        let max_delta = group
            .iter()
            .filter_map(|r| r.max_delta)
            .fold(0.0_f64, f64::max);
        let representative_frequency = group
            .iter()
            .max_by_key(|r| r.change_count)
            .map_or(UpdateFrequency::Unknown, |r| r.frequency());

        let mut first_change_indices: Vec<u64> = group
            .iter()
            .flat_map(|r| r.change_indices.iter().copied())
            .collect();
        first_change_indices.sort_unstable();
        first_change_indices.dedup();
        first_change_indices.truncate(max_indices);

        let first_value = if active_count == 0 {
            group.first().map(|r| r.first_value.clone())
        } else {
            None
        };

        Self {
            wildcard_path,
            index_count,
            active_count,
            total_changes,
            avg_changes: if index_count == 0 {
                0.0
            } else {
                total_changes as f64 / index_count as f64
            },
            max_changes,
            max_delta,
            representative_frequency,
            first_change_indices,
            first_value,
        }
    }
}

/// Tracks how each leaf path changes between consecutive observations.
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    records: AHashMap<String, FieldChangeRecord>,
    limits: ScanLimits,
    hasher: RandomState,
    samples_recorded: u64,
}

impl ChangeTracker {
    /// Create an empty tracker
    pub fn new(limits: ScanLimits) -> Self {
        Self {
            records: AHashMap::new(),
            limits,
            hasher: value_hasher(),
            samples_recorded: 0,
        }
    }

    /// Flatten `sample` and update the record of every leaf path
    pub fn record(&mut self, sample: &Value, sample_index: u64) {
        self.samples_recorded += 1;
        let limits = &self.limits;
        let hasher = &self.hasher;
        let records = &mut self.records;

        visit_leaves(sample, limits.index_threshold, &mut |path, leaf| {
            let hash = hasher.hash_one(&*leaf.text);
            match records.get_mut(path) {
                Some(record) => record.observe(&leaf, hash, sample_index, limits),
                None => {
                    let mut record = FieldChangeRecord::new(path, &leaf, hash, limits);
                    record.observe(&leaf, hash, sample_index, limits);
                    records.insert(path.to_string(), record);
                }
            }
        });
    }

    /// Number of samples recorded
    pub fn samples_recorded(&self) -> u64 {
        self.samples_recorded
    }

    /// Number of concrete paths tracked
    pub fn tracked_paths(&self) -> usize {
        self.records.len()
    }

    /// Record for a concrete path
    pub fn get(&self, path: &str) -> Option<&FieldChangeRecord> {
        self.records.get(path)
    }

    /// All records, unordered
    pub fn records(&self) -> impl Iterator<Item = &FieldChangeRecord> {
        self.records.values()
    }

    /// Records that changed, most changes first, at most `limit`
    pub fn dynamic_fields(&self, limit: usize) -> Vec<&FieldChangeRecord> {
        let mut dynamic: Vec<_> = self.records().filter(|r| r.change_count > 0).collect();
        dynamic.sort_by(|a, b| {
            b.change_count
                .cmp(&a.change_count)
                .then_with(|| a.path.cmp(&b.path))
        });
        dynamic.truncate(limit);
        dynamic
    }

    /// Records that never changed, by path
    pub fn static_fields(&self) -> Vec<&FieldChangeRecord> {
        let mut fixed: Vec<_> = self.records().filter(|r| r.change_count == 0).collect();
        fixed.sort_by(|a, b| a.path.cmp(&b.path));
        fixed
    }

    /// Number of records that changed at least once
    pub fn dynamic_count(&self) -> usize {
        self.records().filter(|r| r.change_count > 0).count()
    }

    /// Records whose largest consecutive delta is at least `threshold`,
    /// largest delta first
    pub fn anomalies(&self, threshold: f64) -> Vec<&FieldChangeRecord> {
        let mut anomalies: Vec<_> = self
            .records()
            .filter(|r| r.max_delta.is_some_and(|delta| delta >= threshold))
            .collect();
        anomalies.sort_by(|a, b| {
            descending(a.max_delta.unwrap_or(0.0), b.max_delta.unwrap_or(0.0))
                .then_with(|| a.path.cmp(&b.path))
        });
        anomalies
    }

    /// Wildcard groups with at least one changing path, most total changes
    /// first, at most `limit`.
    ///
    /// A group covers every concrete path of its wildcard, so `index_count`
    /// includes the static indices and `active_count` the changing ones.
    pub fn aggregated_dynamic_fields(&self, limit: usize) -> Vec<AggregatedFieldRecord> {
        let mut groups = self.aggregate(
            |_| true,
            |group| group.iter().any(|r| r.change_count > 0),
        );
        groups.sort_by(|a, b| {
            b.total_changes
                .cmp(&a.total_changes)
                .then_with(|| a.wildcard_path.cmp(&b.wildcard_path))
        });
        groups.truncate(limit);
        groups
    }

    /// Static paths grouped by wildcard path, by path
    pub fn aggregated_static_fields(&self) -> Vec<AggregatedFieldRecord> {
        let mut groups = self.aggregate(|r| r.change_count == 0, |_| true);
        groups.sort_by(|a, b| a.wildcard_path.cmp(&b.wildcard_path));
        groups
    }

    /// Wildcard groups with at least one path whose largest delta is at
    /// least `threshold`, largest delta first
    pub fn aggregated_anomalies(&self, threshold: f64) -> Vec<AggregatedFieldRecord> {
        let mut groups = self.aggregate(
            |_| true,
            |group| {
                group
                    .iter()
                    .any(|r| r.max_delta.is_some_and(|delta| delta >= threshold))
            },
        );
        groups.sort_by(|a, b| {
            descending(a.max_delta, b.max_delta)
                .then_with(|| a.wildcard_path.cmp(&b.wildcard_path))
        });
        groups
    }

    fn aggregate<R, G>(&self, include_record: R, include_group: G) -> Vec<AggregatedFieldRecord>
    where
        R: Fn(&FieldChangeRecord) -> bool,
        G: Fn(&[&FieldChangeRecord]) -> bool,
    {
        let mut groups: AHashMap<String, Vec<&FieldChangeRecord>> = AHashMap::new();
        for record in self.records().filter(|r| include_record(*r)) {
            groups
                .entry(wildcard_path(&record.path).into_owned())
                .or_default()
                .push(record);
        }

        let max_indices = self.limits.max_aggregated_change_indices;
        groups
            .into_iter()
            .filter(|(_, group)| include_group(group.as_slice()))
            .map(|(path, mut group)| {
                group.sort_by(|a, b| a.path.cmp(&b.path));
                AggregatedFieldRecord::from_group(path, &group, max_indices)
            })
            .collect()
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new(ScanLimits::default())
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
