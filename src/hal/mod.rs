// src/hal/mod.rs
//! Hardware abstraction layer: the collaborators the core talks through

pub mod devices;
pub mod simulation;
pub mod traits;
pub mod types;

pub use devices::{
    open_serial_port, LoggingRelay, ReaderLineSource, RecordingSurface, ReplayEmgSource, SerialLineSource,
};
pub use traits::*;
pub use types::*;
