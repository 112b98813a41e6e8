//! Markdown schema report
//!
//! Renders the accumulated schema, change profile and category tags of one
//! analysis pass into a single Markdown document.

use ahash::AHashMap;
use chrono::Utc;
use lapscope_analysis::{is_multi_car_path, Analysis, FieldCategory, NodeId, SchemaNode, UpdateFrequency};
use lapscope_core::{truncate_chars, wildcard_path};
use lapscope_io::{AnalysisReport, AnalysisSummary, EndReason};
use serde_json::Value;
use std::fmt::{self, Write};

/// File name of the report inside the output directory
pub const REPORT_FILE_NAME: &str = "telemetry_schema_report.md";

const CATEGORY_LIST_LIMIT: usize = 50;
const PER_VEHICLE_LIMIT: usize = 50;
const MULTI_CAR_LIST_LIMIT: usize = 20;
const STATIC_ROWS: usize = 60;
const DYNAMIC_ROWS: usize = 80;
const ANOMALY_ROWS: usize = 60;
const UNCATEGORIZED_LIMIT: usize = 100;
const VEHICLE_ARRAY_NAME: &str = "vehicles";

/// Render the full report for a finished pass.
pub fn render(report: &AnalysisReport, anomaly_threshold: f64) -> Result<String, fmt::Error> {
    let renderer = Renderer::new(&report.analysis, &report.summary, anomaly_threshold);
    let mut out = String::with_capacity(64 * 1024);
    renderer.write(&mut out)?;
    Ok(out)
}

struct Renderer<'a> {
    analysis: &'a Analysis,
    summary: &'a AnalysisSummary,
    anomaly_threshold: f64,
    /// Schema leaf paths, sorted, with their category
    leaves: Vec<(String, FieldCategory)>,
    /// Wildcard path -> frequency and change count of its most active record
    change_info: AHashMap<String, (UpdateFrequency, u64)>,
}

impl<'a> Renderer<'a> {
    fn new(analysis: &'a Analysis, summary: &'a AnalysisSummary, anomaly_threshold: f64) -> Self {
        let mut leaves: Vec<(String, FieldCategory)> = analysis
            .schema
            .leaf_paths()
            .into_iter()
            .map(|path| {
                let category = FieldCategory::classify(&path);
                (path, category)
            })
            .collect();
        leaves.sort();

        let mut change_info: AHashMap<String, (UpdateFrequency, u64)> = AHashMap::new();
        for record in analysis.changes.records() {
            let info = (record.frequency(), record.change_count);
            change_info
                .entry(wildcard_path(&record.path).into_owned())
                .and_modify(|best| {
                    if info.1 > best.1 {
                        *best = info;
                    }
                })
                .or_insert(info);
        }

        Self {
            analysis,
            summary,
            anomaly_threshold,
            leaves,
            change_info,
        }
    }

    fn write(&self, out: &mut String) -> fmt::Result {
        self.write_header(out)?;
        self.write_session(out)?;
        self.write_statistics(out)?;
        self.write_schema_tree(out)?;
        self.write_categories(out)?;
        self.write_damage_fields(out)?;
        self.write_flag_fields(out)?;
        self.write_multi_car(out)?;
        self.write_static_vs_dynamic(out)?;
        self.write_anomalies(out)?;
        self.write_uncategorized(out)?;
        self.write_field_details(out)?;
        self.write_appendix(out)
    }

    fn samples(&self) -> u64 {
        self.summary.samples_analysed
    }

    fn change_info(&self, path: &str) -> (UpdateFrequency, u64) {
        self.change_info
            .get(path)
            .copied()
            .unwrap_or((UpdateFrequency::Unknown, 0))
    }

    fn node(&self, path: &str) -> Option<&SchemaNode> {
        self.analysis.schema.find(path)
    }

    fn type_of(&self, path: &str) -> String {
        self.node(path)
            .map_or_else(|| "?".to_string(), SchemaNode::type_description)
    }

    fn paths_in(&self, category: FieldCategory) -> impl Iterator<Item = &str> + '_ {
        self.leaves
            .iter()
            .filter(move |(_, c)| *c == category)
            .map(|(path, _)| path.as_str())
    }

    fn write_header(&self, out: &mut String) -> fmt::Result {
        let file_name = self
            .summary
            .input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.summary.input.display().to_string());

        writeln!(out, "# Telemetry JSON Schema Report")?;
        writeln!(out)?;
        writeln!(
            out,
            "**Generated**: {} UTC",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(out, "**Input File**: `{file_name}`")?;
        writeln!(out, "**File Size**: {}", format_bytes(self.summary.file_size))?;
        writeln!(out, "**Total Samples**: {}", group_digits(self.samples()))?;
        writeln!(out, "**Unique Fields**: {}", group_digits(self.leaves.len() as u64))?;
        writeln!(
            out,
            "**Max Nesting Depth**: {}",
            self.analysis.schema.max_depth()
        )?;
        if self.summary.end != EndReason::ArrayClosed {
            writeln!(out, "**Stream End**: {}", self.summary.end)?;
        }
        writeln!(out)?;
        writeln!(out, "---")?;
        writeln!(out)
    }

    fn write_session(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "## Session Information")?;
        writeln!(out)?;
        match &self.summary.session {
            Some(Value::Object(map)) => {
                writeln!(
                    out,
                    "Extracted from the `session` property of the root JSON object:"
                )?;
                writeln!(out)?;
                writeln!(out, "| Field | Value |")?;
                writeln!(out, "|-------|-------|")?;
                for (name, value) in map {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    writeln!(out, "| `{name}` | `{}` |", truncate(&text, 80))?;
                }
            }
            _ => writeln!(out, "*No session metadata found in root object.*")?,
        }
        writeln!(out)
    }

    fn write_statistics(&self, out: &mut String) -> fmt::Result {
        let changes = &self.analysis.changes;
        let static_paths = changes.static_fields().len() as u64;
        let static_groups = changes.aggregated_static_fields().len() as u64;
        let dynamic_paths = changes.dynamic_count() as u64;
        let dynamic_groups = changes.aggregated_dynamic_fields(usize::MAX).len() as u64;
        let multi_car = self
            .leaves
            .iter()
            .filter(|(path, _)| is_multi_car_path(path))
            .count() as u64;

        writeln!(out, "## Statistics Overview")?;
        writeln!(out)?;
        writeln!(out, "| Metric | Value |")?;
        writeln!(out, "|--------|-------|")?;
        writeln!(out, "| Total Samples | {} |", group_digits(self.samples()))?;
        writeln!(out, "| File Size | {} |", format_bytes(self.summary.file_size))?;
        writeln!(
            out,
            "| Avg Sample Size | {} |",
            format_bytes(self.summary.bytes_read / self.summary.samples_read.max(1))
        )?;
        writeln!(
            out,
            "| Unique Leaf Fields | {} |",
            group_digits(self.leaves.len() as u64)
        )?;
        writeln!(
            out,
            "| Tracked Paths (per-index) | {} |",
            group_digits(changes.tracked_paths() as u64)
        )?;
        writeln!(
            out,
            "| Static Paths | {} ({} unique) |",
            group_digits(static_paths),
            group_digits(static_groups)
        )?;
        writeln!(
            out,
            "| Dynamic Paths | {} ({} unique) |",
            group_digits(dynamic_paths),
            group_digits(dynamic_groups)
        )?;
        writeln!(out, "| Multi-Car Fields | {} |", group_digits(multi_car))?;
        writeln!(
            out,
            "| Max Nesting Depth | {} |",
            self.analysis.schema.max_depth()
        )?;
        writeln!(out)?;

        writeln!(out, "### Fields by Category")?;
        writeln!(out)?;
        writeln!(out, "| Category | Count | % |")?;
        writeln!(out, "|----------|------:|--:|")?;
        let mut counts: Vec<(FieldCategory, usize)> = FieldCategory::ALL
            .iter()
            .map(|category| (*category, self.paths_in(*category).count()))
            .filter(|(_, count)| *count > 0)
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        let total = self.leaves.len().max(1) as f64;
        for (category, count) in counts {
            writeln!(
                out,
                "| {} | {} | {:.1}% |",
                category,
                count,
                100.0 * count as f64 / total
            )?;
        }
        writeln!(out)
    }

    fn write_schema_tree(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "## Complete Schema Tree")?;
        writeln!(out)?;
        writeln!(out, "```")?;
        self.write_schema_node(out, NodeId::ROOT, "", None)?;
        writeln!(out, "```")?;
        writeln!(out)
    }

    /// `position` is `None` for the root, else whether the node is the last sibling.
    fn write_schema_node(
        &self,
        out: &mut String,
        id: NodeId,
        indent: &str,
        position: Option<bool>,
    ) -> fmt::Result {
        let schema = &self.analysis.schema;
        let node = schema.node(id);
        let connector = match position {
            None => "",
            Some(true) => "└── ",
            Some(false) => "├── ",
        };
        write!(
            out,
            "{indent}{connector}{}: {}",
            node.name(),
            node.type_description()
        )?;
        self.write_node_details(out, node)?;
        writeln!(out)?;

        let child_indent = match position {
            None => String::new(),
            Some(true) => format!("{indent}    "),
            Some(false) => format!("{indent}│   "),
        };
        let children: Vec<NodeId> = node.children().iter().copied().chain(node.element()).collect();
        for (i, child) in children.iter().enumerate() {
            self.write_schema_node(out, *child, &child_indent, Some(i + 1 == children.len()))?;
        }
        Ok(())
    }

    fn write_node_details(&self, out: &mut String, node: &SchemaNode) -> fmt::Result {
        if let Some((min, max)) = node.numeric_range() {
            write!(out, " [{}..{}]", format_number(min), format_number(max))?;
        }
        if let Some((min, max)) = node.array_length_range() {
            write!(out, " len={min}..{max}")?;
        }
        if (1..=5).contains(&node.distinct_count()) && !node.distinct_capped() {
            write!(out, " vals={{{}}}", node.distinct_values().join(","))?;
        }
        let seen = node.occurrence_count();
        if seen > 0 && seen < self.samples() {
            write!(out, " (seen in {seen}/{} samples)", self.samples())?;
        }
        Ok(())
    }

    fn write_categories(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "## Fields by Category")?;
        writeln!(out)?;

        for category in FieldCategory::ALL {
            let paths: Vec<&str> = self.paths_in(category).collect();
            if paths.is_empty() {
                continue;
            }
            writeln!(out, "### {category}")?;
            writeln!(out)?;
            if paths.len() > CATEGORY_LIST_LIMIT {
                writeln!(
                    out,
                    "*{} fields, showing first {CATEGORY_LIST_LIMIT}:*",
                    paths.len()
                )?;
                writeln!(out)?;
            }
            for path in paths.iter().take(CATEGORY_LIST_LIMIT) {
                let (frequency, _) = self.change_info(path);
                write!(out, "- `{path}`: {}", self.type_of(path))?;
                if frequency != UpdateFrequency::Unknown {
                    write!(out, " ({frequency})")?;
                }
                writeln!(out)?;
            }
            if paths.len() > CATEGORY_LIST_LIMIT {
                writeln!(out, "- ... and {} more", paths.len() - CATEGORY_LIST_LIMIT)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn write_damage_fields(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "## Damage-Related Fields")?;
        writeln!(out)?;
        writeln!(
            out,
            "Fields that may contain damage information (suspension, body, tyres, impacts):"
        )?;
        writeln!(out)?;

        let paths: Vec<&str> = self.paths_in(FieldCategory::Damage).collect();
        if paths.is_empty() {
            writeln!(
                out,
                "*No fields matching damage patterns found. Check the Uncategorized section for damage data under other names.*"
            )?;
        } else {
            writeln!(out, "| Path | Type | Range | Update Freq | Sample Values |")?;
            writeln!(out, "|------|------|-------|-------------|---------------|")?;
            for path in paths {
                let node = self.node(path);
                let (frequency, _) = self.change_info(path);
                writeln!(
                    out,
                    "| `{path}` | {} | {} | {frequency} | {} |",
                    self.type_of(path),
                    node.map_or_else(|| "-".to_string(), range_of),
                    truncate(&node.map(sample_list).unwrap_or_default(), 40)
                )?;
            }
        }
        writeln!(out)
    }

    fn write_flag_fields(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "## Flag-Related Fields")?;
        writeln!(out)?;
        writeln!(out, "Fields that may contain flag or penalty information:")?;
        writeln!(out)?;

        let paths: Vec<&str> = self.paths_in(FieldCategory::Flags).collect();
        if paths.is_empty() {
            writeln!(
                out,
                "*No fields matching flag patterns found. Check the Uncategorized section.*"
            )?;
        } else {
            writeln!(out, "| Path | Type | Sample Values | Update Freq | Changes |")?;
            writeln!(out, "|------|------|---------------|-------------|---------|")?;
            for path in paths {
                let (frequency, changes) = self.change_info(path);
                writeln!(
                    out,
                    "| `{path}` | {} | {} | {frequency} | {} |",
                    self.type_of(path),
                    truncate(&self.node(path).map(sample_list).unwrap_or_default(), 40),
                    group_digits(changes)
                )?;
            }
        }
        writeln!(out)
    }

    fn write_multi_car(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "## Multi-Car Analysis")?;
        writeln!(out)?;

        let schema = &self.analysis.schema;
        match self.find_by_name(NodeId::ROOT, VEHICLE_ARRAY_NAME) {
            Some(id) => {
                let vehicles = schema.node(id);
                writeln!(out, "**Vehicle array found**: `{}`", vehicles.path())?;
                match vehicles.array_length_range() {
                    Some((min, max)) => writeln!(out, "**Array length**: {min}..{max}")?,
                    None => writeln!(out, "**Array length**: n/a")?,
                }
                writeln!(out)?;

                if let Some(element) = vehicles.element() {
                    writeln!(out, "**Per-vehicle fields:**")?;
                    writeln!(out)?;
                    let mut fields = Vec::new();
                    self.collect_leaves(element, &mut fields);
                    for field in fields.iter().take(PER_VEHICLE_LIMIT) {
                        writeln!(out, "- `{field}`: {}", self.type_of(field))?;
                    }
                    if fields.len() > PER_VEHICLE_LIMIT {
                        writeln!(
                            out,
                            "- ... and {} more fields per vehicle",
                            fields.len() - PER_VEHICLE_LIMIT
                        )?;
                    }
                }
            }
            None => {
                let paths: Vec<&str> = self
                    .leaves
                    .iter()
                    .map(|(path, _)| path.as_str())
                    .filter(|path| is_multi_car_path(path))
                    .collect();
                writeln!(out, "**Multi-car field paths found**: {}", paths.len())?;
                if paths.is_empty() {
                    writeln!(
                        out,
                        "*No obvious multi-car data detected. Check whether vehicle data sits at root level.*"
                    )?;
                } else {
                    writeln!(out)?;
                    for path in paths.iter().take(MULTI_CAR_LIST_LIMIT) {
                        writeln!(out, "- `{path}`")?;
                    }
                    if paths.len() > MULTI_CAR_LIST_LIMIT {
                        writeln!(out, "- ... and {} more", paths.len() - MULTI_CAR_LIST_LIMIT)?;
                    }
                }
            }
        }
        writeln!(out)
    }

    fn write_static_vs_dynamic(&self, out: &mut String) -> fmt::Result {
        let changes = &self.analysis.changes;
        let statics = changes.aggregated_static_fields();
        let dynamics = changes.aggregated_dynamic_fields(DYNAMIC_ROWS);

        writeln!(out, "## Static vs Dynamic Fields")?;
        writeln!(out)?;
        writeln!(
            out,
            "### Static Fields ({} unique patterns, constant throughout the session)",
            group_digits(statics.len() as u64)
        )?;
        writeln!(out)?;
        writeln!(
            out,
            "These are good candidates for **session metadata** (store once per session):"
        )?;
        writeln!(out)?;
        writeln!(out, "| Path | Indices | Value |")?;
        writeln!(out, "|------|--------:|-------|")?;
        for field in statics.iter().take(STATIC_ROWS) {
            writeln!(
                out,
                "| `{}` | {} | `{}` |",
                field.wildcard_path,
                indices_cell(field.is_array_path(), field.index_count),
                truncate(field.first_value.as_deref().unwrap_or(""), 50)
            )?;
        }
        if statics.len() > STATIC_ROWS {
            writeln!(out)?;
            writeln!(
                out,
                "*... and {} more static field patterns*",
                statics.len() - STATIC_ROWS
            )?;
        }
        writeln!(out)?;

        writeln!(
            out,
            "### Most Dynamic Fields (top {} unique patterns)",
            dynamics.len()
        )?;
        writeln!(out)?;
        writeln!(out, "These need **time-series storage** (per-sample columns):")?;
        writeln!(out)?;
        writeln!(
            out,
            "| Path | Indices | Avg Changes | Max Changes | Frequency | Max Delta |"
        )?;
        writeln!(
            out,
            "|------|--------:|------------:|------------:|-----------|----------:|"
        )?;
        for field in &dynamics {
            let delta = if field.max_delta > 0.0 {
                format_number(field.max_delta)
            } else {
                "-".to_string()
            };
            writeln!(
                out,
                "| `{}` | {} | {:.1} | {} | {} | {} |",
                field.wildcard_path,
                indices_cell(field.is_array_path(), field.index_count),
                field.avg_changes,
                group_digits(field.max_changes),
                field.representative_frequency,
                delta
            )?;
        }
        writeln!(out)
    }

    fn write_anomalies(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "## Anomaly Detection (Potential Damage Events)")?;
        writeln!(out)?;
        writeln!(
            out,
            "Fields with large single-step value changes that may indicate collisions, damage or flag state changes:"
        )?;
        writeln!(out)?;

        let anomalies = self
            .analysis
            .changes
            .aggregated_anomalies(self.anomaly_threshold);
        if anomalies.is_empty() {
            writeln!(
                out,
                "*No large anomalies detected (threshold: delta >= {}).*",
                format_number(self.anomaly_threshold)
            )?;
        } else {
            writeln!(
                out,
                "| Path | Max Delta | Tot. Changes | Indices | Category | First Changes At |"
            )?;
            writeln!(
                out,
                "|------|----------:|-------------:|--------:|----------|-----------------|"
            )?;
            for anomaly in anomalies.iter().take(ANOMALY_ROWS) {
                let first_changes = if anomaly.first_change_indices.is_empty() {
                    "?".to_string()
                } else {
                    anomaly
                        .first_change_indices
                        .iter()
                        .map(|index| format!("#{}", group_digits(*index)))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                writeln!(
                    out,
                    "| `{}` | {} | {} | {} | {} | {} |",
                    anomaly.wildcard_path,
                    format_number(anomaly.max_delta),
                    group_digits(anomaly.total_changes),
                    indices_cell(anomaly.is_array_path(), anomaly.index_count),
                    FieldCategory::classify(&anomaly.wildcard_path),
                    first_changes
                )?;
            }
        }
        writeln!(out)
    }

    fn write_uncategorized(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "## Uncategorized Fields")?;
        writeln!(out)?;
        writeln!(
            out,
            "Fields that matched no category pattern. Review these by hand, they may hold important data under unexpected names:"
        )?;
        writeln!(out)?;

        let paths: Vec<&str> = self.paths_in(FieldCategory::Uncategorized).collect();
        if paths.is_empty() {
            writeln!(out, "*All fields categorized.*")?;
        } else {
            for path in paths.iter().take(UNCATEGORIZED_LIMIT) {
                let (frequency, _) = self.change_info(path);
                writeln!(out, "- `{path}`: {} ({frequency})", self.type_of(path))?;
            }
            if paths.len() > UNCATEGORIZED_LIMIT {
                writeln!(out)?;
                writeln!(
                    out,
                    "*... and {} more uncategorized fields*",
                    paths.len() - UNCATEGORIZED_LIMIT
                )?;
            }
        }
        writeln!(out)
    }

    fn write_field_details(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "## Complete Field Details")?;
        writeln!(out)?;
        writeln!(out, "Full table of all discovered leaf fields:")?;
        writeln!(out)?;
        writeln!(out, "| Path | Type | Range | Frequency | Category | Sample |")?;
        writeln!(out, "|------|------|-------|-----------|----------|--------|")?;
        for (path, category) in &self.leaves {
            let node = self.node(path);
            let (frequency, _) = self.change_info(path);
            let sample = node
                .and_then(|n| n.sample_values().first())
                .map(String::as_str)
                .unwrap_or("");
            writeln!(
                out,
                "| `{path}` | {} | {} | {frequency} | {category} | `{}` |",
                self.type_of(path),
                node.map_or_else(|| "-".to_string(), range_of),
                truncate(sample, 30)
            )?;
        }
        writeln!(out)
    }

    fn write_appendix(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "## Appendix")?;
        writeln!(out)?;
        writeln!(out, "### Extracted Sample Files")?;
        writeln!(out)?;
        writeln!(
            out,
            "Sample JSON objects are saved alongside this report for manual inspection:"
        )?;
        writeln!(out)?;
        writeln!(out, "- `sample_*_first_*.json`: first sample (session start)")?;
        writeln!(out, "- `sample_*_25pct_*.json`: 25% through the session")?;
        writeln!(out, "- `sample_*_50pct_*.json`: 50% through the session")?;
        writeln!(out, "- `sample_*_75pct_*.json`: 75% through the session")?;
        writeln!(out, "- `sample_*_last_*.json`: last sample (session end)")?;
        writeln!(
            out,
            "- `sample_*_interesting_*.json`: samples with the most field changes against their predecessor"
        )?;
        writeln!(out)?;
        writeln!(out, "### Update Frequency Key")?;
        writeln!(out)?;
        writeln!(out, "| Frequency | Description |")?;
        writeln!(out, "|-----------|-------------|")?;
        writeln!(out, "| Static | Never changes during the session |")?;
        writeln!(out, "| Sparse | Changes in at most 1% of samples |")?;
        writeln!(out, "| PerLap | Changes in 1-10% of samples (roughly per lap) |")?;
        writeln!(out, "| Frequent | Changes in 10-80% of samples |")?;
        writeln!(
            out,
            "| PerSample | Changes in more than 80% of samples (high-frequency telemetry) |"
        )?;
        writeln!(out)?;
        writeln!(out, "---")?;
        writeln!(out)?;
        writeln!(
            out,
            "*Report generated by lapscope {}*",
            env!("CARGO_PKG_VERSION")
        )
    }

    fn find_by_name(&self, id: NodeId, needle: &str) -> Option<NodeId> {
        let node = self.analysis.schema.node(id);
        if node.name().to_ascii_lowercase().contains(needle) {
            return Some(id);
        }
        node.children()
            .iter()
            .copied()
            .chain(node.element())
            .find_map(|child| self.find_by_name(child, needle))
    }

    fn collect_leaves(&self, id: NodeId, paths: &mut Vec<String>) {
        let node = self.analysis.schema.node(id);
        if node.is_leaf() {
            paths.push(node.path().to_string());
            return;
        }
        for child in node.children().iter().copied().chain(node.element()) {
            self.collect_leaves(child, paths);
        }
    }
}

fn range_of(node: &SchemaNode) -> String {
    node.numeric_range().map_or_else(
        || "-".to_string(),
        |(min, max)| format!("{}..{}", format_number(min), format_number(max)),
    )
}

fn sample_list(node: &SchemaNode) -> String {
    node.sample_values()
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn indices_cell(is_array: bool, count: usize) -> String {
    if is_array {
        count.to_string()
    } else {
        "-".to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    format!("{}...", truncate_chars(text, max_chars.saturating_sub(3)))
}

/// Integral values print without a fraction, others with up to 4 decimals.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let text = format!("{value:.4}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// `1234567` -> `1,234,567`
pub fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Human-readable byte size
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let value = bytes as f64;
    if value >= KIB * KIB * KIB {
        format!("{:.2} GB", value / (KIB * KIB * KIB))
    } else if value >= KIB * KIB {
        format!("{:.1} MB", value / (KIB * KIB))
    } else if value >= KIB {
        format!("{:.1} KB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}
