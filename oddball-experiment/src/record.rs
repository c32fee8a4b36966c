use crate::config::ExperimentConfig;
use crate::presenter::ToneAssignment;
use crate::waiter::WaitOutcome;
use chrono::{DateTime, Local, Utc};
use oddball_core::{ManipulationStep, Phase, TrialSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Asd,
    Td,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asd => "asd",
            Self::Td => "td",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: u32,
    pub group: Group,
}

/// Fields every row shares, filled by the sequencer.
#[derive(Debug, Clone)]
pub struct RowContext<'a> {
    pub participant: Participant,
    pub task: &'a str,
    pub phase: Phase,
    pub block_counter: u32,
    /// Experiment clock at the time the row is written.
    pub now: Duration,
}

fn round3(d: Duration) -> f64 {
    (d.as_secs_f64() * 1000.0).round() / 1000.0
}

/// One output row. Every kind of row shares this column set; columns a kind
/// does not use stay empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub timestamp: f64,
    pub timestamp_exp: f64,
    pub id: u32,
    pub group: Group,
    pub task: String,
    pub phase: String,
    pub block_counter: u32,
    pub trial: String,
    pub oddball_trial_counter: Option<u32>,
    pub manipulation_trial_counter: Option<u32>,
    pub baseline_trial_counter: Option<u32>,
    pub trial_kind: Option<String>,
    pub utility: Option<String>,
    pub salience: Option<String>,
    pub tone_hz: Option<f32>,
    pub stimulus_duration: Option<f64>,
    pub target_duration: Option<f64>,
    pub actual_duration: Option<f64>,
    pub offset_duration: Option<f64>,
    pub nodata_duration: Option<f64>,
    pub pause_duration: Option<f64>,
    pub restarts: Option<u32>,
    pub response_count: Option<u32>,
    /// Semicolon separated reaction times in seconds, empty where no
    /// onset was known. Aligned with `response_timestamps`.
    pub response_times: Option<String>,
    /// Semicolon separated key press times on the experiment clock.
    pub response_timestamps: Option<String>,
    pub first_response_time: Option<f64>,
    pub response_speed: Option<String>,
    pub rt_threshold: Option<f64>,
}

impl TrialRecord {
    fn base(ctx: &RowContext<'_>, trial: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
            timestamp_exp: round3(ctx.now),
            id: ctx.participant.id,
            group: ctx.participant.group,
            task: ctx.task.to_string(),
            phase: ctx.phase.to_string(),
            block_counter: ctx.block_counter,
            trial: trial.into(),
            oddball_trial_counter: None,
            manipulation_trial_counter: None,
            baseline_trial_counter: None,
            trial_kind: None,
            utility: None,
            salience: None,
            tone_hz: None,
            stimulus_duration: None,
            target_duration: None,
            actual_duration: None,
            offset_duration: None,
            nodata_duration: None,
            pause_duration: None,
            restarts: None,
            response_count: None,
            response_times: None,
            response_timestamps: None,
            first_response_time: None,
            response_speed: None,
            rt_threshold: None,
        }
    }

    pub fn instruction(ctx: &RowContext<'_>, slide: usize, shown_for: Duration) -> Self {
        Self {
            actual_duration: Some(round3(shown_for)),
            ..Self::base(ctx, format!("instruction{slide}"))
        }
    }

    /// Baseline fixation, including the calibration slides.
    pub fn fixation(ctx: &RowContext<'_>, label: &str, baseline_counter: Option<u32>) -> Self {
        Self {
            baseline_trial_counter: baseline_counter,
            ..Self::base(ctx, label)
        }
    }

    pub fn oddball(ctx: &RowContext<'_>, counter: u32, trial: &TrialSpec) -> Self {
        Self {
            oddball_trial_counter: Some(counter),
            trial_kind: Some(trial.kind.as_str().to_string()),
            utility: trial.utility.map(|l| l.as_str().to_string()),
            salience: trial.salience.map(|l| l.as_str().to_string()),
            ..Self::base(ctx, trial.label.as_str())
        }
    }

    pub fn manipulation(ctx: &RowContext<'_>, counter: u32, step: ManipulationStep) -> Self {
        Self {
            manipulation_trial_counter: Some(counter),
            ..Self::base(ctx, step.label())
        }
    }

    pub fn with_wait(mut self, wait: &WaitOutcome) -> Self {
        self.target_duration = Some(round3(wait.target));
        self.actual_duration = Some(round3(wait.actual));
        self.offset_duration = Some(round3(wait.offset));
        self.nodata_duration = Some(round3(wait.nodata));
        self.pause_duration = Some(round3(wait.pause));
        self.restarts = Some(wait.restarts);
        self
    }

    pub fn with_responses(mut self, wait: &WaitOutcome, threshold: Option<Duration>) -> Self {
        let responses = &wait.responses;
        let seconds = |d: Duration| format!("{:.3}", d.as_secs_f64());
        self.response_count = Some(responses.len() as u32);
        if responses.iter().any(|r| r.reaction_time.is_some()) {
            let times: Vec<String> = responses
                .iter()
                .map(|r| r.reaction_time.map(seconds).unwrap_or_default())
                .collect();
            self.response_times = Some(times.join(";"));
        }
        if !responses.is_empty() {
            let stamps: Vec<String> = responses.iter().map(|r| seconds(r.timestamp)).collect();
            self.response_timestamps = Some(stamps.join(";"));
        }
        self.first_response_time = wait.first_reaction_time().map(round3);
        self.response_speed = wait.first_speed.map(|s| s.as_str().to_string());
        self.rt_threshold = threshold.map(round3);
        self
    }

    pub fn with_stimulus(mut self, shown_for: Duration, tone_hz: Option<f32>) -> Self {
        self.stimulus_duration = Some(round3(shown_for));
        self.tone_hz = tone_hz;
        self
    }
}

/// Destination of output rows. Each row must be durable once `write` returns.
pub trait RecordSink: Send {
    fn write(&mut self, record: &TrialRecord) -> Result<(), RecordError>;
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn write(&mut self, record: &TrialRecord) -> Result<(), RecordError> {
        (**self).write(record)
    }
}

pub struct CsvSink<W: io::Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl<W: io::Write> CsvSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    pub fn into_inner(self) -> Result<W, RecordError> {
        self.writer
            .into_inner()
            .map_err(|e| RecordError::Io(e.into_error()))
    }
}

impl<W: io::Write + Send> RecordSink for CsvSink<W> {
    fn write(&mut self, record: &TrialRecord) -> Result<(), RecordError> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps rows in memory; clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    rows: Arc<Mutex<Vec<TrialRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<TrialRecord> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl RecordSink for MemorySink {
    fn write(&mut self, record: &TrialRecord) -> Result<(), RecordError> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

/// Settings of one session, stored next to the table.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo<'a> {
    pub participant: Participant,
    pub task: &'a str,
    pub started_at: DateTime<Local>,
    pub tones: ToneAssignment,
    pub frame_period_s: f64,
    pub config: &'a ExperimentConfig,
}

impl SessionInfo<'_> {
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// `<id>_<YYYY-mm-dd-HHMM>`
pub fn output_stem(id: u32, at: &DateTime<Local>) -> String {
    format!("{}_{}", id, at.format("%Y-%m-%d-%H%M"))
}

/// Table and sidecar paths for a session started at `at`.
pub fn output_paths(dir: &Path, id: u32, at: &DateTime<Local>) -> (PathBuf, PathBuf) {
    let stem = output_stem(id, at);
    (dir.join(format!("{stem}.csv")), dir.join(format!("{stem}.json")))
}
