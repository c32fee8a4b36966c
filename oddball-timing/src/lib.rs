mod simulated;
mod timer;

pub use simulated::SimulatedTimer;
pub use timer::{CalibrationStats, HighPrecisionTimer, Timer};
