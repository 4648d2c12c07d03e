use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Accuracy {
    Lowest,
    Low,
    #[default]
    Balanced,
    High,
    Highest,
    BestForNavigation,
}

impl Display for Accuracy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for Accuracy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lowest" => Ok(Accuracy::Lowest),
            "low" => Ok(Accuracy::Low),
            "balanced" => Ok(Accuracy::Balanced),
            "high" => Ok(Accuracy::High),
            "highest" => Ok(Accuracy::Highest),
            "bestfornavigation" | "best_for_navigation" => Ok(Accuracy::BestForNavigation),
            other => Err(format!("unknown accuracy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundService {
    pub notification_title: String,
    pub notification_body: String,
}

impl Default for ForegroundService {
    fn default() -> Self {
        Self {
            notification_title: "Tracking location".to_string(),
            notification_body: "Your location is being recorded.".to_string(),
        }
    }
}

/// How the location source should report fixes while tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingOptions {
    pub accuracy: Accuracy,
    /// Minimum movement in metres between two reported fixes.
    pub distance_interval: f64,
    /// Also drives the periodic flush of the queue.
    pub deferred_updates_interval: Duration,
    pub pauses_updates_automatically: bool,
    pub foreground_service: ForegroundService,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::Balanced,
            distance_interval: 50.0,
            deferred_updates_interval: Duration::from_millis(60_000),
            pauses_updates_automatically: false,
            foreground_service: ForegroundService::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_accuracy_case_insensitively() {
        assert_eq!("HIGH".parse::<Accuracy>().unwrap(), Accuracy::High);
        assert_eq!("best_for_navigation".parse::<Accuracy>().unwrap(), Accuracy::BestForNavigation);
        assert!("precise".parse::<Accuracy>().is_err());
    }
}
