//! Repository implementations for the events domain

pub mod log;

pub use log::{EventLogRepository, EventPage};
