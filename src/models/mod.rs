pub mod error;
pub mod location_point;
pub mod options;
pub mod position;
