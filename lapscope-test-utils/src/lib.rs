//! Lapscope Test Utilities
//!
//! Builders for telemetry samples and writers for the two file layouts the
//! reader accepts, shared by the integration tests of every crate.

use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fluent builder for one telemetry sample (field order is preserved)
#[derive(Debug, Clone, Default)]
pub struct SampleBuilder {
    fields: Map<String, Value>,
}

impl SampleBuilder {
    /// Create an empty sample
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field with a string value
    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.fields
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a field with an integer value
    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), Value::from(value));
        self
    }

    /// Add a field with a floating point value
    pub fn float(mut self, key: &str, value: f64) -> Self {
        self.fields.insert(key.to_string(), Value::from(value));
        self
    }

    /// Add a field with a boolean value
    pub fn bool(mut self, key: &str, value: bool) -> Self {
        self.fields.insert(key.to_string(), Value::Bool(value));
        self
    }

    /// Add a field with a null value
    pub fn null(mut self, key: &str) -> Self {
        self.fields.insert(key.to_string(), Value::Null);
        self
    }

    /// Add a field with a nested object value
    pub fn object(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Add a field with an array value
    pub fn array(mut self, key: &str, value: Vec<Value>) -> Self {
        self.fields.insert(key.to_string(), Value::Array(value));
        self
    }

    /// Build the sample
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Generators for common telemetry shapes
pub struct TelemetryGenerator;

impl TelemetryGenerator {
    /// One `{"speed": v}` sample per value
    pub fn speed_series(values: &[i64]) -> Vec<Value> {
        values
            .iter()
            .map(|v| SampleBuilder::new().int("speed", *v).build())
            .collect()
    }

    /// Samples with a `Vehicles` array of `slots` entries where only
    /// `changing_slot` moves between samples
    pub fn vehicle_grid(samples: usize, slots: usize, changing_slot: usize) -> Vec<Value> {
        (0..samples)
            .map(|s| {
                let vehicles = (0..slots)
                    .map(|slot| {
                        let x = if slot == changing_slot { s as i64 } else { 0 };
                        SampleBuilder::new()
                            .int("Id", slot as i64)
                            .int("X", x)
                            .build()
                    })
                    .collect();
                SampleBuilder::new()
                    .int("Tick", s as i64)
                    .array("Vehicles", vehicles)
                    .build()
            })
            .collect()
    }

    /// Realistic-looking player samples with a damage spike at `impact_at`
    pub fn player_lap(samples: usize, impact_at: usize) -> Vec<Value> {
        (0..samples)
            .map(|s| {
                let damage = if s >= impact_at { 42 } else { 0 };
                let player = SampleBuilder::new()
                    .float("Speed", 50.0 + (s % 7) as f64)
                    .int("Gear", 3 + (s % 3) as i64)
                    .int("DentSeverity", damage)
                    .bool("InPits", false)
                    .string("Driver", "Test Driver")
                    .build();
                SampleBuilder::new()
                    .int("Tick", s as i64)
                    .object("Player", player)
                    .build()
            })
            .collect()
    }
}

/// Serialize samples as a root-array document
pub fn root_array_text(samples: &[Value]) -> String {
    let body: Vec<String> = samples.iter().map(Value::to_string).collect();
    format!("[{}]", body.join(","))
}

/// Serialize samples as a `{"session": ..., "samples": [...]}` document
pub fn root_object_text(session: Option<&Value>, samples: &[Value]) -> String {
    match session {
        Some(session) => format!(
            "{{\"session\":{},\"samples\":{}}}",
            session,
            root_array_text(samples)
        ),
        None => format!("{{\"samples\":{}}}", root_array_text(samples)),
    }
}

/// Write a root-array fixture file
pub fn write_root_array(path: &Path, samples: &[Value]) -> io::Result<()> {
    fs::write(path, root_array_text(samples))
}

/// Write a root-object fixture file
pub fn write_root_object(path: &Path, session: Option<&Value>, samples: &[Value]) -> io::Result<()> {
    fs::write(path, root_object_text(session, samples))
}

/// Temporary directory holding fixture files
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// Create an empty fixture directory
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// Directory path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write raw text to `name` and return its path
    pub fn raw(&self, name: &str, text: &str) -> io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, text)?;
        Ok(path)
    }

    /// Write a root-array file and return its path
    pub fn root_array(&self, name: &str, samples: &[Value]) -> io::Result<PathBuf> {
        self.raw(name, &root_array_text(samples))
    }

    /// Write a root-object file and return its path
    pub fn root_object(
        &self,
        name: &str,
        session: Option<&Value>,
        samples: &[Value],
    ) -> io::Result<PathBuf> {
        self.raw(name, &root_object_text(session, samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_preserves_field_order() {
        let sample = SampleBuilder::new().int("b", 1).string("a", "x").build();
        assert_eq!(sample.to_string(), r#"{"b":1,"a":"x"}"#);
    }

    #[test]
    fn root_object_text_is_valid_json() {
        let samples = TelemetryGenerator::speed_series(&[1, 2]);
        let text = root_object_text(Some(&json!({"track": "Spa"})), &samples);
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["samples"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["session"]["track"], "Spa");
    }

    #[test]
    fn vehicle_grid_moves_one_slot() {
        let grid = TelemetryGenerator::vehicle_grid(3, 4, 2);
        assert_eq!(grid[2]["Vehicles"][2]["X"], 2);
        assert_eq!(grid[2]["Vehicles"][1]["X"], 0);
    }
}
