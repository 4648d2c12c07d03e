pub mod identity;
pub mod location_sink;
pub mod location_source;
pub mod location_task;
pub mod queue;
pub mod tracking;
