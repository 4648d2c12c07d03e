use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::handlers::tracking::StaticPermissions;
use crate::models::options::{Accuracy, TrackingOptions};

pub static CONFIG: once_cell::sync::Lazy<Config> = once_cell::sync::Lazy::new(Config::from_env);

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend; batches go to `{api_url}/api/location`.
    pub api_url: String,
    /// Directory of the file store. `None` keeps the queue in memory.
    pub queue_dir: Option<PathBuf>,
    pub http_timeout: Duration,
    pub permissions: StaticPermissions,
    pub tracking: TrackingOptions,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = TrackingOptions::default();
        let tracking = TrackingOptions {
            accuracy: parse_or(&lookup, "LOCATION_ACCURACY", Accuracy::default()),
            distance_interval: parse_or(&lookup, "LOCATION_DISTANCE_INTERVAL", defaults.distance_interval),
            deferred_updates_interval: match parse_or(
                &lookup,
                "LOCATION_DEFERRED_INTERVAL_MS",
                defaults.deferred_updates_interval.as_millis() as u64,
            ) {
                0 => {
                    warn!("ignoring LOCATION_DEFERRED_INTERVAL_MS=0, the flush timer needs a non-zero period");
                    defaults.deferred_updates_interval
                }
                ms => Duration::from_millis(ms),
            },
            ..defaults
        };

        Self {
            api_url: lookup("LOCATION_API_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
            queue_dir: match lookup("LOCATION_QUEUE_DIR") {
                Some(dir) if dir == ":memory:" => None,
                Some(dir) => Some(PathBuf::from(dir)),
                None => Some(PathBuf::from(".location-queue")),
            },
            http_timeout: Duration::from_millis(parse_or(&lookup, "LOCATION_HTTP_TIMEOUT_MS", 10_000)),
            permissions: parse_or(&lookup, "LOCATION_PERMISSION", StaticPermissions::granted()),
            tracking,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("ignoring invalid {}={}", key, raw);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::handlers::tracking::PermissionStatus;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]);
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.queue_dir, Some(PathBuf::from(".location-queue")));
        assert_eq!(config.tracking, TrackingOptions::default());
        assert_eq!(config.permissions.background, PermissionStatus::Granted);
    }

    #[test]
    fn overrides_and_invalid_values() {
        let config = config(&[
            ("LOCATION_QUEUE_DIR", ":memory:"),
            ("LOCATION_DISTANCE_INTERVAL", "10"),
            ("LOCATION_DEFERRED_INTERVAL_MS", "soon"),
            ("LOCATION_ACCURACY", "high"),
            ("LOCATION_PERMISSION", "denied"),
        ]);
        assert_eq!(config.queue_dir, None);
        assert_eq!(config.tracking.distance_interval, 10.0);
        assert_eq!(config.tracking.deferred_updates_interval, Duration::from_millis(60_000));
        assert_eq!(config.tracking.accuracy, Accuracy::High);
        assert_eq!(config.permissions.foreground, PermissionStatus::Denied);
    }

    #[test]
    fn zero_deferred_interval_keeps_default() {
        let config = config(&[("LOCATION_DEFERRED_INTERVAL_MS", "0")]);
        assert_eq!(config.tracking.deferred_updates_interval, Duration::from_millis(60_000));

        let config = self::config(&[("LOCATION_DEFERRED_INTERVAL_MS", "1500")]);
        assert_eq!(config.tracking.deferred_updates_interval, Duration::from_millis(1_500));
    }
}
