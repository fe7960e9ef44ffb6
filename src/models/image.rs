use std::fmt;

use crate::models::document::{Field, ParameterDocument};

/// Default iris level used by [`ExposureMode::PIrisManual`] when none is
/// given.
pub const DEFAULT_IRIS_LEVEL: u32 = 40;

/// Exposure configurations accepted by `set_exposure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureMode {
    /// Fully manual exposure.
    Manual,
    /// P-Iris lens with automatic iris.
    PIrisAuto,
    /// P-Iris lens with a fixed iris level. `None` means
    /// [`DEFAULT_IRIS_LEVEL`].
    PIrisManual { iris_level: Option<u32> },
}

impl ExposureMode {
    /// The iris level that will be sent, if any.
    pub fn iris_level(&self) -> Option<u32> {
        match self {
            ExposureMode::PIrisManual { iris_level } => {
                Some(iris_level.unwrap_or(DEFAULT_IRIS_LEVEL))
            }
            _ => None,
        }
    }

    pub(crate) fn to_document(self) -> ParameterDocument {
        let mut doc = ParameterDocument::new("Exposure");
        match self {
            ExposureMode::Manual => {
                doc.set("ExposureType", "manual");
            }
            ExposureMode::PIrisAuto => {
                doc.set("ExposureType", "pIris-General")
                    .group("PIrisGeneral", vec![Field::text("pIrisType", "auto")]);
            }
            ExposureMode::PIrisManual { .. } => {
                let level = self.iris_level().unwrap_or(DEFAULT_IRIS_LEVEL);
                doc.set("ExposureType", "pIris-General").group(
                    "PIrisGeneral",
                    vec![Field::text("pIrisType", "MANUAL"), Field::text("irisLevel", level)],
                );
            }
        }
        doc
    }
}

impl fmt::Display for ExposureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExposureMode::Manual => f.write_str("manual"),
            ExposureMode::PIrisAuto => f.write_str("p-iris-auto"),
            ExposureMode::PIrisManual { .. } => f.write_str("p-iris-manual"),
        }
    }
}

/// IR-cut filter modes. The device matches the values case sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcutFilterType {
    Auto,
    Day,
    Night,
    Schedule,
    EventTrigger,
    /// A model specific value sent as-is.
    Other(String),
}

impl IrcutFilterType {
    pub fn as_str(&self) -> &str {
        match self {
            IrcutFilterType::Auto => "auto",
            IrcutFilterType::Day => "day",
            IrcutFilterType::Night => "night",
            IrcutFilterType::Schedule => "schedule",
            IrcutFilterType::EventTrigger => "eventTrigger",
            IrcutFilterType::Other(value) => value,
        }
    }
}

impl fmt::Display for IrcutFilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for IrcutFilterType {
    fn from(value: &str) -> Self {
        match value {
            "auto" => IrcutFilterType::Auto,
            "day" => IrcutFilterType::Day,
            "night" => IrcutFilterType::Night,
            "schedule" => IrcutFilterType::Schedule,
            "eventTrigger" => IrcutFilterType::EventTrigger,
            other => IrcutFilterType::Other(other.to_string()),
        }
    }
}

/// Timing of a series of snapshot captures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotRate {
    /// Captures that completed with HTTP 200.
    pub samples: usize,
    /// Rate implied by the slowest capture.
    pub min_fps: f64,
    /// Rate implied by the fastest capture.
    pub max_fps: f64,
    /// Rate implied by the mean capture time.
    pub mean_fps: f64,
}

impl SnapshotRate {
    pub(crate) fn from_durations(durations: &[std::time::Duration]) -> Option<Self> {
        if durations.is_empty() {
            return None;
        }
        let secs: Vec<f64> = durations.iter().map(|d| d.as_secs_f64()).collect();
        let slowest = secs.iter().cloned().fold(f64::MIN, f64::max);
        let fastest = secs.iter().cloned().fold(f64::MAX, f64::min);
        let mean = secs.iter().sum::<f64>() / secs.len() as f64;
        Some(Self {
            samples: secs.len(),
            min_fps: 1.0 / slowest,
            max_fps: 1.0 / fastest,
            mean_fps: 1.0 / mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn manual_iris_defaults_to_forty() {
        let mode = ExposureMode::PIrisManual { iris_level: None };
        assert_eq!(mode.iris_level(), Some(40));
        assert!(mode.to_document().render().contains("<irisLevel>40</irisLevel>"));
        assert_eq!(ExposureMode::Manual.iris_level(), None);
    }

    #[test]
    fn exposure_documents_per_mode() {
        let manual = ExposureMode::Manual.to_document().render();
        assert!(manual.contains("<ExposureType>manual</ExposureType>"));
        assert!(!manual.contains("PIrisGeneral"));

        let auto = ExposureMode::PIrisAuto.to_document().render();
        assert!(auto.contains("<ExposureType>pIris-General</ExposureType>"));
        assert!(auto.contains("<PIrisGeneral><pIrisType>auto</pIrisType></PIrisGeneral>"));
        assert!(!auto.contains("irisLevel"));
    }

    #[test]
    fn ircut_round_trips_known_names() {
        assert_eq!(IrcutFilterType::from("eventTrigger"), IrcutFilterType::EventTrigger);
        assert_eq!(IrcutFilterType::from("Day").as_str(), "Day");
    }

    #[test]
    fn snapshot_rate_from_durations() {
        let rate = SnapshotRate::from_durations(&[
            Duration::from_millis(100),
            Duration::from_millis(250),
            Duration::from_millis(150),
        ])
        .unwrap();
        assert_eq!(rate.samples, 3);
        assert!((rate.min_fps - 4.0).abs() < 1e-9);
        assert!((rate.max_fps - 10.0).abs() < 1e-9);
        assert!((rate.mean_fps - 6.0).abs() < 1e-9);
        assert!(SnapshotRate::from_durations(&[]).is_none());
    }
}
