//! Field category tagging for report grouping
//!
//! Rules are ordered and the first match wins. Each rule is one
//! case-insensitive regular expression, compiled once on first use.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Display category of a field path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FieldCategory {
    /// No rule matched
    Uncategorized,
    /// Damage and impacts
    Damage,
    /// Flags and penalties
    Flags,
    /// General telemetry
    Telemetry,
    /// Timing and lap data
    Timing,
    /// Session metadata
    Session,
    /// Position and GPS
    Position,
    /// Weather and environment
    Weather,
    /// Per-vehicle data
    MultiCar,
    /// Driver inputs
    Controls,
    /// Engine and drivetrain
    Engine,
    /// Tyres and wheels
    Tyres,
    /// Aero and suspension
    Aero,
    /// Electronics and assists
    Electronics,
}

const RULE_PATTERNS: [(FieldCategory, &str); 12] = [
    (
        FieldCategory::Damage,
        r"damage|dent|detach|broken|flat|impact|collision|lastimpact|overheating|wheelsdetached",
    ),
    (
        FieldCategory::Flags,
        r"flag|yellow|blue|caution|safety|penalty|sector\d*flag|fullcourse|local.*yellow|vsc",
    ),
    (
        FieldCategory::Timing,
        r"laptime|lap.*time|sector\d|best.*time|last.*time|current.*time|behind|ahead|gap|interval|position\b",
    ),
    (
        FieldCategory::Tyres,
        r"tyre|tire|compound|carcass|rubber|rim.*temp|tread|wear|wheel.*speed|surface.*type",
    ),
    (
        FieldCategory::Engine,
        r"engine|rpm|oil.*temp|water.*temp|turbo|boost|clutch|exhaust|fuel.*mix|regen|soc|virtual.*energy",
    ),
    (
        FieldCategory::Aero,
        r"aero|wing|flap|ride.*height|suspension|susp|spring|damper|deflection|downforce|drag",
    ),
    (
        FieldCategory::Electronics,
        r"tc\b|traction|abs\b|anti.*stall|launch.*control|speed.*limiter|ers|drs|ffb|brake.*bias|brake.*migration",
    ),
    (
        FieldCategory::Controls,
        r"throttle|brake.*pos|steering|gear\b|pedal|torque|force.*feedback",
    ),
    (
        FieldCategory::Position,
        r"gps|latitude|longitude|position|dist|path.*lateral|track.*edge|coord|location|heading",
    ),
    (
        FieldCategory::Telemetry,
        r"speed|fuel|temp|g.*force|accel|velocity|pressure",
    ),
    (
        FieldCategory::Weather,
        r"weather|ambient|track.*temp|cloud|wetness|rain|wind|humidity",
    ),
    (
        FieldCategory::Session,
        r"session|track.*name|car.*name|driver|class|layout|recording|event|num.*vehicle",
    ),
];

const MULTI_CAR_PATTERN: &str = r"vehicle|veh\[|car\[|driver\[|scoring.*\[\*\]|participant";

static RULES: Lazy<Vec<(FieldCategory, Regex)>> = Lazy::new(|| {
    RULE_PATTERNS
        .iter()
        .filter_map(|(category, pattern)| compile(pattern).map(|regex| (*category, regex)))
        .collect()
});

static MULTI_CAR: Lazy<Option<Regex>> = Lazy::new(|| compile(MULTI_CAR_PATTERN));

/// Patterns are constants covered by tests, so a failed build only drops the rule.
fn compile(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!(pattern, error = %err, "Skipping invalid category pattern");
            None
        }
    }
}

impl FieldCategory {
    /// Every category in report order
    pub const ALL: [FieldCategory; 14] = [
        FieldCategory::Damage,
        FieldCategory::Flags,
        FieldCategory::Timing,
        FieldCategory::Tyres,
        FieldCategory::Engine,
        FieldCategory::Aero,
        FieldCategory::Electronics,
        FieldCategory::Controls,
        FieldCategory::Position,
        FieldCategory::Telemetry,
        FieldCategory::Weather,
        FieldCategory::Session,
        FieldCategory::MultiCar,
        FieldCategory::Uncategorized,
    ];

    /// Category of `path`: the first rule with a matching alternative
    pub fn classify(path: &str) -> Self {
        RULES
            .iter()
            .find(|(_, regex)| regex.is_match(path))
            .map_or(FieldCategory::Uncategorized, |(category, _)| *category)
    }

    /// Human-readable name for reports
    pub fn display_name(self) -> &'static str {
        match self {
            FieldCategory::Damage => "Damage / Impact",
            FieldCategory::Flags => "Flags / Penalties",
            FieldCategory::Telemetry => "General Telemetry",
            FieldCategory::Timing => "Timing / Lap Data",
            FieldCategory::Session => "Session / Metadata",
            FieldCategory::Position => "Position / GPS",
            FieldCategory::Weather => "Weather / Environment",
            FieldCategory::MultiCar => "Multi-Car Data",
            FieldCategory::Controls => "Driver Controls",
            FieldCategory::Engine => "Engine / Drivetrain",
            FieldCategory::Tyres => "Tyres / Wheels",
            FieldCategory::Aero => "Aero / Suspension",
            FieldCategory::Electronics => "Electronics / Assists",
            FieldCategory::Uncategorized => "Uncategorized",
        }
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Classify every path, keeping input order
pub fn classify_all<'a, I>(paths: I) -> Vec<(&'a str, FieldCategory)>
where
    I: IntoIterator<Item = &'a str>,
{
    paths
        .into_iter()
        .map(|path| (path, FieldCategory::classify(path)))
        .collect()
}

/// Whether the path lives under a per-vehicle array
pub fn is_multi_car_path(path: &str) -> bool {
    MULTI_CAR
        .as_ref()
        .map_or(false, |regex| regex.is_match(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        assert_eq!(FieldCategory::classify("Vehicles[3].DentSeverity"), FieldCategory::Damage);
        assert_eq!(FieldCategory::classify("Scoring.YellowFlagState"), FieldCategory::Flags);
        assert_eq!(FieldCategory::classify("Player.LapTime"), FieldCategory::Timing);
        assert_eq!(FieldCategory::classify("Player.BestLapTime"), FieldCategory::Timing);
        assert_eq!(FieldCategory::classify("Wheels[0].TyreWear"), FieldCategory::Tyres);
        assert_eq!(FieldCategory::classify("Player.EngineRPM"), FieldCategory::Engine);
        assert_eq!(FieldCategory::classify("Player.RideHeightFront"), FieldCategory::Aero);
        assert_eq!(FieldCategory::classify("Player.Throttle"), FieldCategory::Controls);
        assert_eq!(FieldCategory::classify("Player.Latitude"), FieldCategory::Position);
        assert_eq!(FieldCategory::classify("Player.Speed"), FieldCategory::Telemetry);
        assert_eq!(FieldCategory::classify("Env.Humidity"), FieldCategory::Weather);
        assert_eq!(FieldCategory::classify("session.recording"), FieldCategory::Session);
        assert_eq!(FieldCategory::classify("Misc.Unknown"), FieldCategory::Uncategorized);
    }

    #[test]
    fn word_boundary_alternatives() {
        assert_eq!(FieldCategory::classify("Player.Position"), FieldCategory::Timing);
        assert_eq!(FieldCategory::classify("Player.PositionX"), FieldCategory::Position);
        assert_eq!(FieldCategory::classify("Assists.TC"), FieldCategory::Electronics);
        assert_eq!(FieldCategory::classify("Player.Gear"), FieldCategory::Controls);
        assert_eq!(FieldCategory::classify("Scoring.Sector2"), FieldCategory::Timing);
    }

    #[test]
    fn every_pattern_compiles() {
        assert_eq!(RULES.len(), RULE_PATTERNS.len());
        assert!(MULTI_CAR.is_some());
    }

    #[test]
    fn regex_syntax_is_honoured() {
        assert_eq!(FieldCategory::classify("Player.Lap_Best_Time"), FieldCategory::Timing);
        assert_eq!(FieldCategory::classify("Scoring.Sector3"), FieldCategory::Timing);
        assert_eq!(FieldCategory::classify("Scoring.Sector12Flag"), FieldCategory::Flags);
        assert_eq!(FieldCategory::classify("Scoring.LocalYellow"), FieldCategory::Flags);
        assert_eq!(FieldCategory::classify("Player.WheelsDetached"), FieldCategory::Damage);
        assert_eq!(FieldCategory::classify("tcx"), FieldCategory::Uncategorized);
        assert_eq!(FieldCategory::classify("TC.Level"), FieldCategory::Electronics);
    }

    #[test]
    fn multi_car_paths() {
        assert!(is_multi_car_path("Vehicles[12].Speed"));
        assert!(is_multi_car_path("Scoring.Entries[*].Place"));
        assert!(is_multi_car_path("Veh[3].Speed"));
        assert!(is_multi_car_path("DRIVER[0].Name"));
        assert!(!is_multi_car_path("Scoring.Entries[3].Place"));
        assert!(!is_multi_car_path("Player.Speed"));
    }

    #[test]
    fn classify_all_keeps_order() {
        let tagged = classify_all(["Player.Speed", "Misc.Thing"]);
        assert_eq!(
            tagged,
            vec![
                ("Player.Speed", FieldCategory::Telemetry),
                ("Misc.Thing", FieldCategory::Uncategorized)
            ]
        );
    }
}
