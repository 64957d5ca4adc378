//! PURE-IT core: EMG conditioning and flex-sensor CTS screening
//!
//! This library holds the signal logic of the PURE-IT wearable:
//!
//! - Live EMG conditioning (DC removal, band-pass, rectification, envelope)
//!   with bounded display buffers, full-session arrays and a CSV artifact
//! - Flex-glove recording, per-finger angle calibration and protocol windowing
//! - Classification of the windowed angles and majority-vote screening verdict
//! - Tick-driven rehabilitation relay control
//!
//! Hardware is reached only through the traits in [`hal`], so every session
//! runs the same against the real devices, replay files or the simulators.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pureit_core::config::SystemConfig;
//! use pureit_core::hal::simulation::{EmgSimulationConfig, SyntheticEmgSource};
//! use pureit_core::processing::EmgPipeline;
//! use pureit_core::scheduler::EmgScheduler;
//! use pureit_core::utils::MonotonicTimeProvider;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SystemConfig::default();
//!     let source = SyntheticEmgSource::new(EmgSimulationConfig::default())?;
//!     let pipeline = EmgPipeline::new(&config.emg, Arc::new(MonotonicTimeProvider::new()))?;
//!
//!     let mut scheduler = EmgScheduler::new(source, pipeline, &config.emg);
//!     scheduler.run_to_completion()?;
//!     println!("{:?}", scheduler.finish()?);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod calibration;
pub mod classification;
pub mod config;
pub mod error;
pub mod hal;
pub mod processing;
pub mod rehab;
pub mod scheduler;
pub mod sink;
pub mod utils;

// Re-export commonly used types for convenience
pub use calibration::{adc_to_angle, Finger, HandCalibration};
pub use classification::{Detector, Verdict, VerdictSummary};
pub use config::SystemConfig;
pub use error::{BatchOutcome, PureItError, PureItResult};
pub use processing::{EmgConditioner, EmgPipeline};
pub use utils::time::TimeProvider;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "EMG conditioning and flex-sensor CTS screening core".to_string(),
        features: vec![
            "EMG conditioning pipeline".to_string(),
            "Flex-sensor calibration and windowing".to_string(),
            "CTS screening verdict".to_string(),
            "Rehabilitation relay control".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert!(!info.features.is_empty());
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "pureit-core");
    }
}
