use lapscope_io::{EndReason, Layout, SampleReader, ScanLimits};
use lapscope_test_utils::Fixture;
use proptest::prelude::*;
use serde_json::{json, Value};

fn sample_strategy() -> impl Strategy<Value = Value> {
    (any::<i32>(), "[a-z \\\\\"\\]\\[{},:]{0,12}", any::<bool>())
        .prop_map(|(n, s, b)| json!({ "n": n, "s": s, "b": b, "nested": [n, { "s": s }] }))
}

fn render(samples: &[Value], wrapped: bool, ws: &str) -> String {
    let body = samples
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(&format!(",{ws}"));
    if wrapped {
        format!("{{{ws}\"session\":{ws}{{\"id\":1}},{ws}\"samples\":{ws}[{ws}{body}{ws}]{ws}}}")
    } else {
        format!("{ws}[{ws}{body}{ws}]{ws}")
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_sample_streams_in_order(
        samples in prop::collection::vec(sample_strategy(), 0..16),
        wrapped in any::<bool>(),
        pad in 0usize..3,
    ) {
        let text = render(&samples, wrapped, &"\n ".repeat(pad));
        let fixture = Fixture::new().unwrap();
        let path = fixture.raw("prop.json", &text).unwrap();

        let reader = SampleReader::open(&path, &ScanLimits::default()).unwrap();
        let expected_layout = if wrapped { Layout::RootObject } else { Layout::RootArray };
        prop_assert_eq!(reader.layout(), expected_layout);

        let mut stream = reader.samples(None).unwrap();
        let mut values = Vec::new();
        for item in stream.by_ref() {
            values.push(item.unwrap().value);
        }
        prop_assert_eq!(values, samples);
        prop_assert_eq!(stream.end_reason(), Some(&EndReason::ArrayClosed));
    }

    #[test]
    fn sample_offsets_end_each_element(
        samples in prop::collection::vec(sample_strategy(), 1..8),
        wrapped in any::<bool>(),
    ) {
        let text = render(&samples, wrapped, "");
        let fixture = Fixture::new().unwrap();
        let path = fixture.raw("offsets.json", &text).unwrap();

        let reader = SampleReader::open(&path, &ScanLimits::default()).unwrap();
        let stream = reader.samples(None).unwrap();
        for (item, expected) in stream.zip(samples.iter()) {
            let sample = item.unwrap();
            let end = sample.offset as usize;
            let rendered = expected.to_string();
            prop_assert_eq!(&text[end - rendered.len()..end], rendered.as_str());
        }
    }
}
