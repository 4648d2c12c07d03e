//! Durable, offline-tolerant delivery of GPS fixes.
//!
//! Fixes reported by a [`LocationSource`](handlers::location_source::LocationSource)
//! are appended to a [`DurableQueue`](handlers::queue::DurableQueue) and the whole
//! queue is flushed to `POST /api/location`. A failed flush leaves the batch in
//! place for the next attempt.

pub mod config;
pub mod handlers;
pub mod models;
pub mod storage;
