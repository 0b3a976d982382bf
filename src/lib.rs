//! Heroes Core - units, deferred actions and timestamped outcomes

pub mod actions;
pub mod core;
pub mod data;
pub mod schedule;
pub mod unit;
