// src/error.rs
//! Unified error handling for the PURE-IT core
//!
//! Every fallible operation in the crate reports a [`PureItError`]. Errors carry
//! an [`ErrorContext`] naming the component and operation that failed so the
//! operator surface and the logs can tell a missing model apart from a bad
//! calibration file without string matching.

use crate::calibration::Finger;
use crate::processing::filters::FilterError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

/// Unified error type for the entire PURE-IT core
#[derive(Debug, Clone, Error)]
pub enum PureItError {
    /// Configuration and setup errors
    #[error("[CONFIG] Configuration error in {component}: {reason} ({})", .context.operation)]
    Configuration {
        component: String,
        reason: String,
        context: ErrorContext,
    },

    /// A finger calibration whose extremes are not strictly ordered
    #[error("[CALIBRATION] Invalid calibration for {finger}: adc_max ({adc_max}) must be greater than adc_min ({adc_min})")]
    Calibration {
        finger: Finger,
        adc_min: i32,
        adc_max: i32,
    },

    /// Filter design errors
    #[error("[FILTER] {0}")]
    Filter(#[from] FilterError),

    /// Signal processing errors
    #[error("[PROCESSING] {stage:?} stage error: {reason} ({})", .context.operation)]
    Processing {
        stage: ProcessingStage,
        reason: String,
        context: ErrorContext,
    },

    /// Invalid input data errors
    #[error("[DATA] Invalid {data_type}: {reason} ({})", .context.operation)]
    InvalidData {
        data_type: String,
        reason: String,
        context: ErrorContext,
    },

    /// Not enough rows or samples to carry out an operation
    #[error("[DATA] Insufficient data for {operation}: {reason}")]
    InsufficientData { operation: String, reason: String },

    /// Communication and connection errors
    #[error("[COMM] {protocol:?} communication error during {operation}: {reason}")]
    Communication {
        protocol: CommunicationProtocol,
        operation: String,
        reason: String,
        context: ErrorContext,
    },

    /// The classifier artifact does not exist
    #[error("[MODEL] Model not found: {}", .path.display())]
    ModelNotFound { path: PathBuf },

    /// The classifier artifact exists but cannot be used
    #[error("[MODEL] Invalid model: {reason}")]
    Model { reason: String },

    /// File system errors
    #[error("[IO] {operation} failed: {source}")]
    Io {
        operation: String,
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Pipeline stages for error tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    Acquisition,
    DcRemoval,
    Bandpass,
    Envelope,
}

/// Links the core talks over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunicationProtocol {
    Serial,
    File,
    Gpio,
}

/// Error context for debugging and analysis
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

impl PureItError {
    /// Errors the operator has to see before the current run returns to idle.
    ///
    /// Everything else is either recovered locally (transient I/O, malformed
    /// records) or dropped per batch after logging.
    pub fn is_operator_reportable(&self) -> bool {
        matches!(
            self,
            PureItError::Configuration { .. }
                | PureItError::Calibration { .. }
                | PureItError::Communication { .. }
                | PureItError::ModelNotFound { .. }
                | PureItError::Model { .. }
                | PureItError::InsufficientData { .. }
        )
    }

    /// Short message for a character display
    pub fn operator_message(&self) -> String {
        match self {
            PureItError::ModelNotFound { .. } => "model not found".to_string(),
            PureItError::Model { .. } => "model invalid".to_string(),
            PureItError::Communication { operation, .. } => format!("cannot {}", operation),
            PureItError::Calibration { finger, .. } => format!("bad calibration: {}", finger),
            PureItError::Configuration { component, .. } => format!("config error: {}", component),
            PureItError::InsufficientData { .. } => "no data recorded".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for PureItError {
    fn from(err: std::io::Error) -> Self {
        PureItError::Io {
            operation: "io".to_string(),
            source: Arc::new(err),
        }
    }
}

/// Result type alias for PURE-IT operations
pub type PureItResult<T> = Result<T, PureItError>;

/// Result of pushing one batch through a live pipeline.
///
/// Callers decide retry vs. abort from the variant instead of relying on a
/// catch-all around the whole step.
#[derive(Debug)]
pub enum BatchOutcome<T> {
    /// The batch was processed
    Processed(T),
    /// Nothing was done this tick; the pipeline keeps its previous state
    SkippedTransient(String),
    /// The pipeline cannot continue
    Fatal(PureItError),
}

impl<T> BatchOutcome<T> {
    pub fn is_processed(&self) -> bool {
        matches!(self, BatchOutcome::Processed(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, BatchOutcome::Fatal(_))
    }

    /// Processed value, if any
    pub fn processed(self) -> Option<T> {
        match self {
            BatchOutcome::Processed(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> BatchOutcome<U> {
        match self {
            BatchOutcome::Processed(value) => BatchOutcome::Processed(f(value)),
            BatchOutcome::SkippedTransient(reason) => BatchOutcome::SkippedTransient(reason),
            BatchOutcome::Fatal(err) => BatchOutcome::Fatal(err),
        }
    }
}

/// Error builder for convenient error construction
pub struct PureItErrorBuilder {
    component: String,
    operation: String,
}

impl PureItErrorBuilder {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn configuration(self, reason: &str) -> PureItError {
        let context = ErrorContext::new(&self.component, &self.operation);
        PureItError::Configuration {
            component: self.component,
            reason: reason.to_string(),
            context,
        }
    }

    pub fn processing(self, stage: ProcessingStage, reason: &str) -> PureItError {
        PureItError::Processing {
            stage,
            reason: reason.to_string(),
            context: ErrorContext::new(&self.component, &self.operation),
        }
    }

    pub fn invalid_data(self, data_type: &str, reason: &str) -> PureItError {
        PureItError::InvalidData {
            data_type: data_type.to_string(),
            reason: reason.to_string(),
            context: ErrorContext::new(&self.component, &self.operation),
        }
    }

    pub fn communication(self, protocol: CommunicationProtocol, reason: &str) -> PureItError {
        PureItError::Communication {
            protocol,
            operation: self.operation.clone(),
            reason: reason.to_string(),
            context: ErrorContext::new(&self.component, &self.operation),
        }
    }
}
