pub mod gaze;
pub mod input;
pub mod phase;
pub mod stimulus;
pub mod trial;
pub mod trigger;

pub use gaze::{GazeMonitor, GazePoint, GazeStatus};
pub use input::Key;
pub use phase::{CalibrationSlide, ManipulationStep, Phase};
pub use stimulus::{Color, Scene, StimulusType};
pub use trial::{Level, ParseError, TrialKind, TrialSpec};
pub use trigger::{line_states, TriggerTable, TriggerTableError};
