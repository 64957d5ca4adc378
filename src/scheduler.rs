// src/scheduler.rs
//! Tick dispatch for the live EMG session
//!
//! Each tick polls the device link once and hands whatever arrived to the
//! pipeline. Elapsed time is counted in ticks, so the same schedule runs at
//! display rate under a timer or as fast as possible against a replay.

use crate::config::EmgConfig;
use crate::error::{BatchOutcome, PureItResult};
use crate::hal::traits::EmgBatchSource;
use crate::processing::pipeline::{EmgPipeline, SessionSummary};
use crate::utils::time::seconds_to_duration;
use std::time::Duration;
use tracing::{info, warn};

/// Whether the session wants more ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Continue,
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: u64,
    pub processed: u64,
    pub skipped: u64,
    pub poll_errors: u64,
}

/// Drives an [`EmgPipeline`] from an [`EmgBatchSource`] one tick at a time
pub struct EmgScheduler<S: EmgBatchSource> {
    source: S,
    pipeline: EmgPipeline,
    tick_interval: Duration,
    session_duration: Duration,
    stats: TickStats,
}

impl<S: EmgBatchSource> EmgScheduler<S> {
    pub fn new(source: S, pipeline: EmgPipeline, config: &EmgConfig) -> Self {
        Self {
            source,
            pipeline,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            session_duration: seconds_to_duration(config.session_duration_s),
            stats: TickStats::default(),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Session time covered by the ticks run so far
    pub fn elapsed(&self) -> Duration {
        self.tick_interval
            .checked_mul(self.stats.ticks.min(u32::MAX as u64) as u32)
            .unwrap_or(Duration::MAX)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed() >= self.session_duration
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    pub fn pipeline(&self) -> &EmgPipeline {
        &self.pipeline
    }

    /// Poll once and dispatch to the pipeline.
    ///
    /// A failed poll or a skipped batch only costs this tick. A fatal batch
    /// outcome ends the session with its error.
    pub fn tick(&mut self) -> PureItResult<TickStatus> {
        if self.is_finished() {
            return Ok(TickStatus::Finished);
        }
        self.stats.ticks += 1;

        match self.source.poll_rows() {
            Ok(rows) => match self.pipeline.process_rows(&rows) {
                BatchOutcome::Processed(_) => self.stats.processed += 1,
                BatchOutcome::SkippedTransient(_) => self.stats.skipped += 1,
                BatchOutcome::Fatal(e) => return Err(e),
            },
            Err(e) => {
                self.stats.poll_errors += 1;
                warn!("EMG poll failed on tick {}: {}", self.stats.ticks, e);
            }
        }

        Ok(if self.is_finished() {
            TickStatus::Finished
        } else {
            TickStatus::Continue
        })
    }

    /// Tick without waiting until the session duration is covered
    pub fn run_to_completion(&mut self) -> PureItResult<()> {
        while self.tick()? == TickStatus::Continue {}
        Ok(())
    }

    /// Flush the pipeline and summarise the session
    pub fn finish(self) -> PureItResult<SessionSummary> {
        info!(
            "EMG acquisition stopped after {} ticks ({} processed, {} skipped, {} poll errors)",
            self.stats.ticks, self.stats.processed, self.stats.skipped, self.stats.poll_errors
        );
        self.pipeline.finish()
    }
}
