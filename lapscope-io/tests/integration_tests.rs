use lapscope_analysis::{SampleLabel, UpdateFrequency};
use lapscope_io::{
    execute_analysis, write_samples, AnalysisOptions, AnalysisRequest, AnalysisSummary, EndReason,
    Layout, NoProgress, ProgressObserver, ScanError,
};
use lapscope_test_utils::{root_array_text, Fixture, TelemetryGenerator};
use serde_json::{json, Value};
use std::path::PathBuf;

fn request(input: PathBuf) -> AnalysisRequest {
    AnalysisRequest {
        input,
        options: AnalysisOptions::default(),
    }
}

#[derive(Default)]
struct RecordingProgress {
    started: Option<u64>,
    calls: Vec<(u64, u64)>,
    finished: usize,
}

impl ProgressObserver for RecordingProgress {
    fn on_start(&mut self, file_size: u64) {
        self.started = Some(file_size);
    }

    fn on_sample(&mut self, bytes_read: u64, samples_analysed: u64) {
        self.calls.push((bytes_read, samples_analysed));
    }

    fn on_finish(&mut self, _summary: &AnalysisSummary) {
        self.finished += 1;
    }
}

#[test]
fn root_object_session_is_captured_and_merged() {
    let fixture = Fixture::new().unwrap();
    let path = fixture
        .raw(
            "sebring.json",
            r#"{"session":{"track":"Sebring"},"samples":[{"a":1},{"a":2}]}"#,
        )
        .unwrap();

    let report = execute_analysis(request(path), &mut NoProgress).expect("analysis succeeds");
    let summary = &report.summary;
    assert_eq!(summary.layout, Layout::RootObject);
    assert_eq!(summary.session, Some(json!({"track": "Sebring"})));
    assert_eq!(summary.samples_read, 2);
    assert_eq!(summary.samples_analysed, 2);
    assert_eq!(summary.end, EndReason::ArrayClosed);

    let schema = &report.analysis.schema;
    let track = schema.find("session.track").expect("session merged into schema");
    assert_eq!(track.sample_values(), ["Sebring"]);
    assert_eq!(schema.find("a").unwrap().occurrence_count(), 2);
    assert_eq!(report.analysis.changes.get("a").unwrap().change_count, 1);
}

#[test]
fn speed_series_change_profile() {
    let fixture = Fixture::new().unwrap();
    let samples = TelemetryGenerator::speed_series(&[10, 10, 12, 12, 9]);
    let path = fixture.root_array("speed.json", &samples).unwrap();

    let report = execute_analysis(request(path), &mut NoProgress).unwrap();
    let speed = report.analysis.changes.get("speed").unwrap();
    assert_eq!(speed.change_count, 2);
    assert_eq!(speed.change_indices.as_slice(), &[2, 4]);
    assert_eq!(speed.max_delta, Some(3.0));
    assert_eq!(speed.frequency(), UpdateFrequency::Frequent);
    assert_eq!(speed.first_value, "10");
    assert_eq!(speed.last_value, "9");
}

#[test]
fn stride_and_max_samples_count_analysed_samples() {
    let fixture = Fixture::new().unwrap();
    let samples = TelemetryGenerator::speed_series(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    let path = fixture.root_array("stride.json", &samples).unwrap();

    let mut req = request(path);
    req.options.stride = 2;
    req.options.max_samples = Some(3);
    let report = execute_analysis(req, &mut NoProgress).unwrap();

    assert_eq!(report.summary.samples_read, 6);
    assert_eq!(report.summary.samples_analysed, 3);
    assert_eq!(report.summary.end, EndReason::LimitReached);

    let speed = report.analysis.changes.get("speed").unwrap();
    assert_eq!(speed.total_observations, 3);
    assert_eq!(speed.first_value, "0");
    assert_eq!(speed.last_value, "4");
    assert_eq!(speed.change_indices.as_slice(), &[1, 2]);
}

#[test]
fn wildcard_aggregation_through_a_file() {
    let fixture = Fixture::new().unwrap();
    let samples = TelemetryGenerator::vehicle_grid(4, 200, 57);
    let path = fixture.root_object("grid.json", None, &samples).unwrap();

    let mut req = request(path);
    req.options.extract_samples = false;
    let report = execute_analysis(req, &mut NoProgress).unwrap();
    assert!(report.analysis.selector.is_none());

    let dynamic = report.analysis.changes.aggregated_dynamic_fields(usize::MAX);
    let x = dynamic
        .iter()
        .find(|r| r.wildcard_path == "Vehicles[*].X")
        .expect("X aggregated");
    assert_eq!(x.index_count, 200);
    assert_eq!(x.active_count, 1);
    assert_eq!(x.total_changes, 3);
}

#[test]
fn last_sample_is_refined_to_end_of_stream() {
    let fixture = Fixture::new().unwrap();
    let samples = TelemetryGenerator::player_lap(12, 6);
    let path = fixture.root_array("lap.json", &samples).unwrap();

    let report = execute_analysis(request(path), &mut NoProgress).unwrap();
    let selector = report.analysis.selector.as_ref().unwrap();
    assert_eq!(selector.total_estimate(), Some(1));

    let fixed = selector.fixed_samples();
    let (label, last) = fixed.last().unwrap();
    assert_eq!(*label, SampleLabel::Last);
    assert_eq!(last.sample_index, 11);
    let reparsed: Value = serde_json::from_str(&last.raw_json).unwrap();
    assert_eq!(reparsed, samples[11]);

    let dir = fixture.path().join("samples");
    let written = write_samples(selector, &dir).unwrap();
    assert!(written
        .iter()
        .any(|p| p.ends_with("sample_004_last_idx11.json")));
}

#[test]
fn progress_sees_every_raw_sample() {
    let fixture = Fixture::new().unwrap();
    let samples = TelemetryGenerator::speed_series(&[1, 2, 3, 4]);
    let text = root_array_text(&samples);
    let path = fixture.raw("progress.json", &text).unwrap();

    let mut progress = RecordingProgress::default();
    let mut req = request(path);
    req.options.stride = 2;
    let report = execute_analysis(req, &mut progress).unwrap();

    assert_eq!(progress.started, Some(text.len() as u64));
    assert_eq!(progress.calls.len(), 4);
    assert_eq!(
        progress.calls.iter().map(|(_, n)| *n).collect::<Vec<_>>(),
        vec![1, 1, 2, 2]
    );
    assert!(progress.calls.windows(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(progress.finished, 1);
    assert_eq!(report.summary.bytes_read, text.len() as u64);
}

#[test]
fn failure_keeps_partial_analysis() {
    let fixture = Fixture::new().unwrap();
    let samples = TelemetryGenerator::speed_series(&(0..300).collect::<Vec<i64>>());
    let text = root_array_text(&samples).replace(r#"{"speed":120}"#, r#"{"speed":}"#);
    let path = fixture.raw("broken.json", &text).unwrap();

    let mut progress = RecordingProgress::default();
    let failure = execute_analysis(request(path), &mut progress).unwrap_err();
    assert!(matches!(failure.error, ScanError::Malformed { .. }));
    assert_eq!(progress.finished, 0);

    let partial = failure.partial.expect("partial analysis");
    assert_eq!(partial.samples_analysed(), 120);
    let speed = partial.changes.get("speed").unwrap();
    assert_eq!(speed.last_value, "119");
    let selector = partial.selector.as_ref().unwrap();
    assert_eq!(
        selector.fixed_samples().last().map(|(_, c)| c.sample_index),
        Some(119)
    );
}

#[test]
fn invalid_options_are_rejected_up_front() {
    let fixture = Fixture::new().unwrap();
    let path = fixture.root_array("ok.json", &[json!(1)]).unwrap();
    let mut req = request(path);
    req.options.max_samples = Some(0);
    let failure = execute_analysis(req, &mut NoProgress).unwrap_err();
    assert!(matches!(failure.error, ScanError::InvalidConfig(_)));
    assert!(failure.partial.is_none());
}
