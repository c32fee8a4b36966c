use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use oddball_experiment::{
    ExperimentConfig, ExperimentStateMachine, Participant, RecordSink, SessionInfo, TriggerPort,
};
use oddball_timing::Timer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;

/// Everything decided before the display is known.
pub struct SessionSetup {
    pub config: ExperimentConfig,
    pub participant: Participant,
    pub sink: Box<dyn RecordSink>,
    pub port: Box<dyn TriggerPort>,
    pub seed: u64,
    pub started_at: DateTime<Local>,
    pub info_path: PathBuf,
}

impl SessionSetup {
    /// Builds the state machine on `timer` and writes the session sidecar.
    /// `frame_period` overrides the configured refresh period when measured.
    pub fn start<T: Timer>(
        self,
        timer: T,
        frame_period: Option<Duration>,
    ) -> Result<ExperimentStateMachine<T, StdRng>> {
        let mut machine = ExperimentStateMachine::new(
            self.config,
            self.participant,
            timer,
            StdRng::seed_from_u64(self.seed),
        )
        .context("setting up the experiment")?
        .with_trigger_port(self.port)
        .with_sink(self.sink);
        if let Some(period) = frame_period {
            machine = machine.with_frame_period(period);
        }

        SessionInfo {
            participant: machine.participant(),
            task: &machine.config().task_name,
            started_at: self.started_at,
            tones: machine.tone_assignment(),
            frame_period_s: machine.frame_period().as_secs_f64(),
            config: machine.config(),
        }
        .write_json(&self.info_path)
        .with_context(|| format!("writing {}", self.info_path.display()))?;

        Ok(machine)
    }
}
