// src/processing/mod.rs
//! Signal processing for EMG conditioning and flex-session windowing

pub mod conditioning;
pub mod filters;
pub mod pipeline;
pub mod windowing;

pub use conditioning::{ConditionedBatch, EmgConditioner};
pub use filters::{BandType, FilterSpec, SosFilter};
pub use pipeline::{EmgPipeline, PerformanceMetrics, SessionData, SessionSummary};
pub use windowing::{condition_counts, Condition, ProtocolInterval, ProtocolSchedule, WindowRecord};
