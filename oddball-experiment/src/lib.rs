pub mod config;
pub mod control;
pub mod error;
pub mod presenter;
pub mod record;
pub mod sequence;
pub mod sim;
pub mod state;
pub mod trigger;
pub mod waiter;

pub use config::{ConfigError, ExperimentConfig, Modality};
pub use control::{ControlSignal, PauseAbortHandler};
pub use error::ExperimentError;
pub use presenter::{Cue, StimulusTable, ToneAssignment};
pub use record::{
    output_paths, CsvSink, Group, MemorySink, Participant, RecordError, RecordSink, SessionInfo,
    TrialRecord,
};
pub use sim::{run_headless, HeadlessReport, ParticipantProfile, SimulatedParticipant};
pub use state::{ExperimentStateMachine, FrameInput, PlannedPhase, PlannedStep, RunStatus, Tick};
pub use trigger::{DummyTriggerPort, SerialTriggerPort, TriggerEncoder, TriggerPort};
pub use waiter::{GazeContingentWait, WaitOutcome};
