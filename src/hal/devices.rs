// src/hal/devices.rs
//! Stock collaborator implementations for desktop runs and tests

use crate::classification::VerdictSummary;
use crate::config::{EmgConfig, FlexConfig};
use crate::error::{CommunicationProtocol, PureItError, PureItErrorBuilder, PureItResult};
use crate::hal::traits::{EmgBatchSource, LineSource, OperatorSurface, RelayActuator};
use crate::hal::types::{DeviceRow, RelayState};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use std::time::Duration;
use tokio_serial::SerialPort;
use tracing::{debug, info, warn};

/// Line source over any buffered reader: a serial port, a replay file or
/// an in-memory buffer in tests.
///
/// A read that times out returns `None`. Bytes received before the timeout
/// are kept and completed by the next read.
pub struct ReaderLineSource<R> {
    name: String,
    reader: Option<R>,
    pending: Vec<u8>,
    exhausted: bool,
}

impl<R: BufRead> ReaderLineSource<R> {
    pub fn new(name: &str, reader: R) -> Self {
        Self {
            name: name.to_string(),
            reader: Some(reader),
            pending: Vec::new(),
            exhausted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

impl<R: BufRead> LineSource for ReaderLineSource<R> {
    fn read_line(&mut self) -> PureItResult<Option<Vec<u8>>> {
        let reader = self.reader.as_mut().ok_or_else(|| {
            PureItErrorBuilder::new("line_source", "read")
                .communication(CommunicationProtocol::Serial, "link already closed")
        })?;
        if self.exhausted {
            return Ok(None);
        }

        match reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => {
                self.exhausted = true;
                Ok(None)
            }
            Ok(_) => {
                let mut line = std::mem::take(&mut self.pending);
                while matches!(line.last(), Some(b'\n') | Some(b'\r')) {
                    line.pop();
                }
                Ok(Some(line))
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(None)
            }
            Err(e) => Err(PureItErrorBuilder::new("line_source", "read")
                .communication(CommunicationProtocol::Serial, &e.to_string())),
        }
    }

    fn flush_input(&mut self) -> PureItResult<()> {
        if let Some(reader) = self.reader.as_mut() {
            let buffered = reader.fill_buf().map(|buf| buf.len()).unwrap_or(0);
            reader.consume(buffered);
            self.pending.clear();
            debug!("Flushed {} buffered bytes from {}", buffered, self.name);
        }
        Ok(())
    }

    /// The reader hit end of input; further reads return `None`
    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn close(&mut self) -> PureItResult<()> {
        if self.reader.take().is_some() {
            debug!("Closed {}", self.name);
        }
        Ok(())
    }
}

/// Line source over the glove's serial port
pub type SerialLineSource = ReaderLineSource<BufReader<Box<dyn SerialPort>>>;

/// Open the glove's serial port at the configured baud rate.
///
/// Reads give up after `read_timeout_ms`, so a silent glove never holds the
/// recording loop past its deadline. Failure to open is a reportable
/// communication error.
pub fn open_serial_port(config: &FlexConfig) -> PureItResult<SerialLineSource> {
    let port = tokio_serial::new(config.port.as_str(), config.baud_rate)
        .timeout(Duration::from_millis(config.read_timeout_ms))
        .open()
        .map_err(|e| {
            PureItErrorBuilder::new("flex_link", &format!("open {}", config.port))
                .communication(CommunicationProtocol::Serial, &e.to_string())
        })?;
    info!(
        "Opened {} at {} baud, {} ms read timeout",
        config.port, config.baud_rate, config.read_timeout_ms
    );
    Ok(ReaderLineSource::new(&config.port, BufReader::new(port)))
}

/// Replays recorded device rows, a fixed number per poll
pub struct ReplayEmgSource {
    rows: VecDeque<DeviceRow>,
    rows_per_poll: usize,
}

impl ReplayEmgSource {
    pub fn from_rows(rows: Vec<DeviceRow>, rows_per_poll: usize) -> Self {
        Self {
            rows: rows.into(),
            rows_per_poll: rows_per_poll.max(1),
        }
    }

    /// Load a header-less CSV of numeric device rows; non-numeric rows are skipped
    pub fn from_csv<P: AsRef<Path>>(path: P, rows_per_poll: usize) -> PureItResult<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| {
                PureItErrorBuilder::new("replay", &format!("open {}", path.display()))
                    .communication(CommunicationProtocol::File, &e.to_string())
            })?;

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for record in reader.records() {
            let parsed = record.ok().and_then(|record| {
                record
                    .iter()
                    .map(|field| field.parse::<f64>().ok())
                    .collect::<Option<DeviceRow>>()
            });
            match parsed {
                Some(row) => rows.push(row),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!("Skipped {} malformed rows in {}", skipped, path.display());
        }

        info!("Loaded {} device rows from {}", rows.len(), path.display());
        Ok(Self::from_rows(rows, rows_per_poll))
    }

    /// Replay polled in batches of the configured `batch_size`
    pub fn for_session<P: AsRef<Path>>(path: P, config: &EmgConfig) -> PureItResult<Self> {
        Self::from_csv(path, config.batch_size)
    }

    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl EmgBatchSource for ReplayEmgSource {
    fn poll_rows(&mut self) -> PureItResult<Vec<DeviceRow>> {
        let take = self.rows_per_poll.min(self.rows.len());
        Ok(self.rows.drain(..take).collect())
    }
}

/// Relay stand-in that logs every transition and keeps their history
#[derive(Debug)]
pub struct LoggingRelay {
    pin: u8,
    active_low: bool,
    state: RelayState,
    history: Vec<RelayState>,
}

impl LoggingRelay {
    pub fn new(pin: u8, active_low: bool) -> Self {
        Self {
            pin,
            active_low,
            state: RelayState::Off,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[RelayState] {
        &self.history
    }
}

impl RelayActuator for LoggingRelay {
    fn set_state(&mut self, state: RelayState) -> PureItResult<()> {
        info!(
            "Relay on pin {} -> {} (output {})",
            self.pin,
            state,
            if state.output_level(self.active_low) { "high" } else { "low" }
        );
        self.state = state;
        self.history.push(state);
        Ok(())
    }

    fn state(&self) -> RelayState {
        self.state
    }
}

/// Operator surface that logs and keeps everything it was asked to show
#[derive(Debug, Default)]
pub struct RecordingSurface {
    messages: Vec<String>,
    verdicts: Vec<VerdictSummary>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn verdicts(&self) -> &[VerdictSummary] {
        &self.verdicts
    }

    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }
}

impl OperatorSurface for RecordingSurface {
    fn show_status(&mut self, message: &str) {
        info!("{}", message);
        self.messages.push(message.to_string());
    }

    fn show_verdict(&mut self, summary: &VerdictSummary) {
        info!("Detection result: {}", summary);
        self.verdicts.push(summary.clone());
    }

    fn report_error(&mut self, error: &PureItError) {
        warn!("{}", error);
        self.show_status(&format!("Error: {}", error.operator_message()));
    }
}
