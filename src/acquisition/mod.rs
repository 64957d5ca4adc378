// src/acquisition/mod.rs
//! Signal acquisition and buffering components

pub mod display_buffer;
pub mod flex;

pub use display_buffer::DisplayBuffer;
pub use flex::{parse_flex_line, FlexRecorder, FlexRecording, FlexSample};
