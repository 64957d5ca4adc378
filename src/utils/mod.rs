//! Common utility functions for the PURE-IT core

pub mod time;

pub use time::{seconds_to_duration, Deadline, MockTimeProvider, MonotonicTimeProvider, TimeProvider};
