//! Representative sample snapshot writer

use lapscope_analysis::SampleSelector;
use lapscope_core::Result;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write every captured snapshot into `dir` as pretty-printed JSON.
///
/// Fixed-position snapshots come first in stream order, then the top-K
/// snapshots by score. File names carry a running number, the label or
/// score, and the sample index.
pub fn write_samples(selector: &SampleSelector, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for (label, captured) in selector.fixed_samples() {
        let name = format!(
            "sample_{:03}_{}_idx{}.json",
            written.len(),
            label.as_str(),
            captured.sample_index
        );
        written.push(write_pretty(dir, &name, &captured.raw_json)?);
    }

    for interesting in selector.interesting_samples() {
        let name = format!(
            "sample_{:03}_interesting_idx{}_changes{}.json",
            written.len(),
            interesting.sample.sample_index,
            interesting.score
        );
        written.push(write_pretty(dir, &name, &interesting.sample.raw_json)?);
    }

    debug!(dir = %dir.display(), files = written.len(), "Wrote representative samples");
    Ok(written)
}

fn write_pretty(dir: &Path, name: &str, raw_json: &str) -> Result<PathBuf> {
    let value: Value = serde_json::from_str(raw_json)?;
    let path = dir.join(name);
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, &value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapscope_core::ScanLimits;
    use lapscope_test_utils::TelemetryGenerator;

    #[test]
    fn writes_fixed_then_interesting() {
        let samples = TelemetryGenerator::speed_series(&[10, 10, 12, 12, 9]);
        let mut selector = SampleSelector::new(&ScanLimits::default());
        selector.set_total_estimate(5);
        for (index, sample) in samples.iter().enumerate() {
            selector.record(sample, index as u64);
        }
        selector.finish(Some((4, &samples[4])));

        let dir = tempfile::tempdir().unwrap();
        let written = write_samples(&selector, dir.path()).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            names,
            vec![
                "sample_000_first_idx0.json",
                "sample_001_25pct_idx1.json",
                "sample_002_50pct_idx2.json",
                "sample_003_75pct_idx3.json",
                "sample_004_last_idx4.json",
                "sample_005_interesting_idx4_changes1.json",
                "sample_006_interesting_idx2_changes1.json",
            ]
        );

        let reparsed: Value =
            serde_json::from_str(&fs::read_to_string(&written[2]).unwrap()).unwrap();
        assert_eq!(reparsed, samples[2]);
    }
}
