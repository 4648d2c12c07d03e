use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::location_point::LocationPoint;
use crate::models::options::TrackingOptions;
use crate::models::position::Position;

/// What the platform hands to the background task: a batch of fixes or an error.
pub type LocationEvent = Result<Vec<LocationPoint>, String>;

#[async_trait]
pub trait LocationSource: Send {
    /// Reports fixes into `tx` until the source ends or the receiver is dropped.
    async fn run(&mut self, options: TrackingOptions, tx: mpsc::Sender<LocationEvent>);
}

/// Drops fixes closer than `interval` metres to the last accepted one.
pub struct DistanceFilter {
    interval: f64,
    last: Option<Position>,
}

impl DistanceFilter {
    pub fn new(interval: f64) -> Self {
        Self { interval, last: None }
    }

    pub fn accept(&mut self, point: &LocationPoint) -> bool {
        let position = point.position();
        if let Some(last) = &self.last {
            if self.interval > 0.0 && last.distance_to(&position).meters < self.interval {
                return false;
            }
        }
        self.last = Some(position);
        true
    }
}

#[derive(Deserialize)]
struct RawFix {
    latitude: f64,
    longitude: f64,
    timestamp: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLine {
    One(RawFix),
    Many(Vec<RawFix>),
}

impl RawFix {
    fn into_point(self) -> Result<LocationPoint, String> {
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("fix out of range: {}, {}", self.latitude, self.longitude));
        }
        Ok(match self.timestamp {
            Some(ts) => LocationPoint::new(self.latitude, self.longitude, ts),
            None => LocationPoint::now(self.latitude, self.longitude),
        })
    }
}

/// Reads fixes as newline-delimited JSON. Each line is a fix object or an
/// array of them; a fix without `timestamp` is stamped on arrival.
pub struct JsonLinesSource<R> {
    reader: Option<R>,
}

impl<R> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader: Some(reader) }
    }
}

fn parse_line(line: &str, filter: &mut DistanceFilter) -> LocationEvent {
    let fixes = match serde_json::from_str::<RawLine>(line) {
        Ok(RawLine::One(fix)) => vec![fix],
        Ok(RawLine::Many(fixes)) => fixes,
        Err(e) => return Err(format!("unreadable fix: {}", e)),
    };

    let mut valid = Vec::with_capacity(fixes.len());
    let mut last_error = None;
    for fix in fixes {
        match fix.into_point() {
            Ok(point) => valid.push(point),
            Err(e) => {
                warn!("dropping fix: {}", e);
                last_error = Some(e);
            }
        }
    }

    // Only valid fixes move the distance filter.
    if valid.is_empty() {
        if let Some(e) = last_error {
            return Err(e);
        }
    }
    Ok(valid.into_iter().filter(|point| filter.accept(point)).collect())
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LocationSource for JsonLinesSource<R> {
    async fn run(&mut self, options: TrackingOptions, tx: mpsc::Sender<LocationEvent>) {
        let Some(reader) = self.reader.take() else {
            return;
        };
        info!(accuracy = %options.accuracy, distance_interval = options.distance_interval, "location source started");

        let mut filter = DistanceFilter::new(options.distance_interval);
        let mut lines = reader.lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.send(Err(format!("location source read error: {}", e))).await;
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let event = parse_line(&line, &mut filter);
            if matches!(&event, Ok(points) if points.is_empty()) {
                debug!("fix filtered by distance interval");
                continue;
            }
            if tx.send(event).await.is_err() {
                break;
            }
        }
        info!("location source ended");
    }
}
