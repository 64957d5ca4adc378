//! Synthetic device emulation for demos, benches and tests
//! Location: src/hal/simulation/mod.rs

pub mod emg;
pub mod flex;

pub use emg::{ActivationPattern, EmgSimulationConfig, SyntheticEmgSource};
pub use flex::{FlexSimulationConfig, SyntheticFlexSource};
