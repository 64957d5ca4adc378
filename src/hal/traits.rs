// src/hal/traits.rs
//! Collaborator traits the core pipelines are driven through
//!
//! The core never touches hardware directly. Each session receives the
//! collaborators it needs, so the same code runs against the glove, a replay
//! file or a simulator.

use crate::classification::VerdictSummary;
use crate::error::{PureItError, PureItResult};
use crate::hal::types::{DeviceRow, RelayState};

/// Newline-delimited byte stream, such as the flex glove's serial link
pub trait LineSource {
    /// Next raw line without its terminator.
    ///
    /// `Ok(None)` means the read timed out with nothing to deliver; the caller
    /// treats it as a transient condition and polls again.
    fn read_line(&mut self) -> PureItResult<Option<Vec<u8>>>;

    /// Discard anything buffered so far
    fn flush_input(&mut self) -> PureItResult<()> {
        Ok(())
    }

    /// No more lines will ever arrive, as with a finished replay file
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Release the underlying link
    fn close(&mut self) -> PureItResult<()> {
        Ok(())
    }
}

/// Device link delivering multi-column EMG rows
pub trait EmgBatchSource {
    /// Rows buffered since the previous poll, possibly none
    fn poll_rows(&mut self) -> PureItResult<Vec<DeviceRow>>;
}

/// On/off actuation request for the rehabilitation relay
pub trait RelayActuator {
    fn set_state(&mut self, state: RelayState) -> PureItResult<()>;

    fn state(&self) -> RelayState;
}

/// Character display or any other operator-facing output
pub trait OperatorSurface {
    fn show_status(&mut self, message: &str);

    fn show_verdict(&mut self, summary: &VerdictSummary);

    fn report_error(&mut self, error: &PureItError) {
        self.show_status(&format!("Error: {}", error.operator_message()));
    }
}

impl<T: LineSource + ?Sized> LineSource for Box<T> {
    fn read_line(&mut self) -> PureItResult<Option<Vec<u8>>> {
        (**self).read_line()
    }

    fn flush_input(&mut self) -> PureItResult<()> {
        (**self).flush_input()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }

    fn close(&mut self) -> PureItResult<()> {
        (**self).close()
    }
}

impl<T: EmgBatchSource + ?Sized> EmgBatchSource for Box<T> {
    fn poll_rows(&mut self) -> PureItResult<Vec<DeviceRow>> {
        (**self).poll_rows()
    }
}
