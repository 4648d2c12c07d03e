use serde::{Deserialize, Serialize};

use crate::models::position::Position;

/// A single GPS fix as stored in the queue and sent to the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Epoch millis.
    pub timestamp: i64,
}

impl LocationPoint {
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self { latitude, longitude, timestamp }
    }

    pub fn now(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, chrono::Utc::now().timestamp_millis())
    }

    pub fn position(&self) -> Position {
        Position { lat: self.latitude, lon: self.longitude }
    }
}

/// Request body of `POST /api/location`.
#[derive(Serialize)]
pub struct LocationBatch<'a> {
    pub points: &'a [LocationPoint],
}
