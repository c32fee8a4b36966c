use oddball_core::{Color, Phase, TrialSpec, TriggerTable, TriggerTableError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("phase list is empty")]
    NoPhases,
    #[error("ISI range {0}..={1} ms is inverted")]
    InvertedIsiRange(u64, u64),
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    #[error("trial sequence `{0}` is empty")]
    EmptySequence(&'static str),
    #[error("bad trial label in `{field}`: {source}")]
    TrialLabel {
        field: &'static str,
        source: oddball_core::ParseError,
    },
    #[error("phase {0} has no instruction text")]
    MissingInstruction(Phase),
    #[error(transparent)]
    Triggers(#[from] TriggerTableError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Auditory,
    Visual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub first_hz: f32,
    pub second_hz: f32,
    /// Randomly assign which tone is the standard, balanced across participants.
    pub balance: bool,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            first_hz: 500.0,
            second_hz: 750.0,
            balance: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallConfig {
    pub color: Color,
    /// Oddball radius relative to the fixation cross for high / low salience.
    pub high_salience_scale: f32,
    pub low_salience_scale: f32,
    pub squeeze_color: Color,
    pub relax_color: Color,
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            color: Color::PURPLE,
            high_salience_scale: 0.5,
            low_salience_scale: 0.91,
            squeeze_color: Color::YELLOW,
            relax_color: Color::BLUE,
        }
    }
}

/// Everything that distinguishes one task variant from another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub task_name: String,
    pub modality: Modality,
    pub phases: Vec<Phase>,
    pub oddball_sequence: Vec<String>,
    pub reversed_sequence: Vec<String>,
    pub practice_sequence: Vec<String>,
    pub trials_per_block: usize,
    pub practice_trials: usize,
    pub isi_range_ms: (u64, u64),
    pub stimulus_duration_s: f64,
    pub baseline_duration_s: f64,
    pub squeeze_duration_s: f64,
    pub relax_duration_s: f64,
    pub manipulation_repetitions: usize,
    pub calibration_repetitions: usize,
    pub fixation_cross_px: f32,
    pub gaze_cutoff_factor: f32,
    pub no_data_warning_s: f64,
    /// Used when the host cannot measure the display refresh period.
    pub frame_period_s: f64,
    pub pulse_width_ms: u64,
    pub trigger_names: Vec<String>,
    /// Trigger sent at stimulus onset instead of the trial label.
    pub stimulus_trigger: Option<String>,
    pub tones: ToneConfig,
    pub balls: BallConfig,
    pub background: Color,
    pub collect_responses: bool,
    pub feedback_duration_s: f64,
    pub instructions: Vec<String>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::auditory()
    }
}

impl ExperimentConfig {
    pub fn auditory() -> Self {
        Self {
            task_name: "auditory_oddball".into(),
            modality: Modality::Auditory,
            phases: vec![
                Phase::Instruction(1),
                Phase::BaselineCalibration,
                Phase::OddballBlock,
                Phase::Baseline,
                Phase::OddballBlockReversed,
                Phase::Baseline,
                Phase::Instruction(2),
                Phase::ManipulationBlock,
                Phase::Baseline,
                Phase::OddballBlock,
                Phase::Baseline,
                Phase::OddballBlockReversed,
                Phase::Baseline,
                Phase::Instruction(3),
            ],
            oddball_sequence: labels(&["standard", "standard", "standard", "standard", "oddball"]),
            reversed_sequence: labels(&[
                "standard_rev",
                "standard_rev",
                "standard_rev",
                "standard_rev",
                "oddball_rev",
            ]),
            practice_sequence: labels(&["standard", "standard", "oddball"]),
            trials_per_block: 10,
            practice_trials: 15,
            isi_range_ms: (1800, 2000),
            stimulus_duration_s: 0.1,
            baseline_duration_s: 5.0,
            squeeze_duration_s: 6.0,
            relax_duration_s: 10.0,
            manipulation_repetitions: 1,
            calibration_repetitions: 1,
            fixation_cross_px: 60.0,
            gaze_cutoff_factor: 3.0,
            no_data_warning_s: 0.5,
            frame_period_s: 1.0 / 60.0,
            pulse_width_ms: 10,
            trigger_names: labels(&[
                "PLACEHOLDER",
                "trial",
                "standard",
                "standard_rev",
                "oddball",
                "oddball_rev",
                "ISI",
                "baseline",
                "manipulation_squeeze",
                "manipulation_relax",
                "experiment_start",
                "experiment_end",
                "pause_initiated",
                "pause_ended",
                "experiment_aborted",
                "baseline_calibration",
                "baseline_whiteslide",
                "baseline_blackslide",
                "oddball_block",
                "manipulation_block",
            ]),
            stimulus_trigger: None,
            tones: ToneConfig::default(),
            balls: BallConfig::default(),
            background: Color::GREY,
            collect_responses: false,
            feedback_duration_s: 0.5,
            instructions: labels(&[
                "Das Experiment beginnt jetzt.\nBitte bleibe still sitzen und\nschaue auf das Kreuz in der Mitte.\n\nWeiter mit der Leertaste.",
                "Gleich wirst du einen gelben Kreis sehen.\nBitte drücke dann fest das Kraftmessgerät.\n\nMit der Leertaste geht es weiter.",
                "Das Experiment ist jetzt beendet.\nBitte bleibe noch still sitzen.",
            ]),
        }
    }

    pub fn visual() -> Self {
        Self {
            task_name: "visual_oddball".into(),
            modality: Modality::Visual,
            phases: vec![Phase::Baseline, Phase::Practice],
            practice_trials: 15,
            stimulus_duration_s: 2.0,
            baseline_duration_s: 1.0,
            fixation_cross_px: 132.0,
            gaze_cutoff_factor: 2.0,
            trigger_names: labels(&[
                "PLACEHOLDER",
                "trial",
                "stimulus",
                "ISI",
                "baseline",
                "experiment_start",
                "experiment_end",
                "pause_initiated",
                "pause_ended",
                "experiment_aborted",
                "practice_trials",
            ]),
            stimulus_trigger: Some("stimulus".into()),
            collect_responses: true,
            instructions: Vec::new(),
            ..Self::auditory()
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::NoPhases);
        }
        let (lo, hi) = self.isi_range_ms;
        if lo > hi {
            return Err(ConfigError::InvertedIsiRange(lo, hi));
        }
        for (name, value) in [
            ("frame_period_s", self.frame_period_s),
            ("fixation_cross_px", self.fixation_cross_px as f64),
            ("gaze_cutoff_factor", self.gaze_cutoff_factor as f64),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive(name));
            }
        }
        for phase in &self.phases {
            match phase {
                Phase::OddballBlock => check_sequence("oddball_sequence", &self.oddball_sequence)?,
                Phase::OddballBlockReversed => {
                    check_sequence("reversed_sequence", &self.reversed_sequence)?
                }
                Phase::Practice => check_sequence("practice_sequence", &self.practice_sequence)?,
                Phase::Instruction(n) if *n > self.instructions.len() => {
                    return Err(ConfigError::MissingInstruction(*phase));
                }
                _ => {}
            }
        }
        self.trigger_table()?;
        Ok(())
    }

    pub fn trigger_table(&self) -> Result<TriggerTable, TriggerTableError> {
        TriggerTable::new(self.trigger_names.iter().cloned())
    }

    pub fn gaze_cutoff_px(&self) -> f32 {
        self.gaze_cutoff_factor * self.fixation_cross_px
    }

    pub fn stimulus_duration(&self) -> Duration {
        secs(self.stimulus_duration_s)
    }

    pub fn baseline_duration(&self) -> Duration {
        secs(self.baseline_duration_s)
    }

    pub fn squeeze_duration(&self) -> Duration {
        secs(self.squeeze_duration_s)
    }

    pub fn relax_duration(&self) -> Duration {
        secs(self.relax_duration_s)
    }

    pub fn no_data_warning(&self) -> Duration {
        secs(self.no_data_warning_s)
    }

    pub fn feedback_duration(&self) -> Duration {
        secs(self.feedback_duration_s)
    }

    pub fn frame_period(&self) -> Duration {
        secs(self.frame_period_s)
    }

    pub fn pulse_width(&self) -> Duration {
        Duration::from_millis(self.pulse_width_ms)
    }

    pub fn instruction_text(&self, slide: usize) -> Option<&str> {
        slide
            .checked_sub(1)
            .and_then(|i| self.instructions.get(i))
            .map(String::as_str)
    }
}

/// Negative and NaN values clamp to zero.
pub(crate) fn secs(s: f64) -> Duration {
    Duration::try_from_secs_f64(s).unwrap_or(Duration::ZERO)
}

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn check_sequence(field: &'static str, sequence: &[String]) -> Result<(), ConfigError> {
    if sequence.is_empty() {
        return Err(ConfigError::EmptySequence(field));
    }
    for label in sequence {
        label
            .parse::<TrialSpec>()
            .map_err(|source| ConfigError::TrialLabel { field, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        ExperimentConfig::auditory().validate().unwrap();
        ExperimentConfig::visual().validate().unwrap();
    }

    #[test]
    fn auditory_preset_matches_task_parameters() {
        let config = ExperimentConfig::auditory();
        assert_eq!(config.phases.len(), 14);
        assert_eq!(config.phases[0], Phase::Instruction(1));
        assert_eq!(config.phases[13], Phase::Instruction(3));
        assert_eq!(config.gaze_cutoff_px(), 180.0);
        assert_eq!(config.trigger_names.len(), 20);
        assert_eq!(config.instruction_text(2).map(|t| t.starts_with("Gleich")), Some(true));
        assert_eq!(config.instruction_text(0), None);
    }

    #[test]
    fn auditory_phase_order_matches_the_task_script() {
        let names: Vec<String> = ExperimentConfig::auditory()
            .phases
            .iter()
            .map(Phase::to_string)
            .collect();
        assert_eq!(
            names,
            [
                "instruction1",
                "baseline_calibration",
                "oddball_block",
                "baseline",
                "oddball_block_rev",
                "baseline",
                "instruction2",
                "manipulation_block",
                "baseline",
                "oddball_block",
                "baseline",
                "oddball_block_rev",
                "baseline",
                "instruction3",
            ]
        );
    }

    #[test]
    fn json_round_trip_keeps_phase_names() {
        let config = ExperimentConfig::visual();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"practice_trials\""));
        let back: ExperimentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{"phases": ["baseline", "oddball_block"], "trials_per_block": 20}"#)
                .unwrap();
        assert_eq!(config.phases, vec![Phase::Baseline, Phase::OddballBlock]);
        assert_eq!(config.trials_per_block, 20);
        assert_eq!(config.isi_range_ms, (1800, 2000));
        config.validate().unwrap();
    }

    #[test]
    fn validation_catches_bad_configs() {
        let mut config = ExperimentConfig::auditory();
        config.isi_range_ms = (2000, 1800);
        assert!(matches!(config.validate(), Err(ConfigError::InvertedIsiRange(2000, 1800))));

        let mut config = ExperimentConfig::auditory();
        config.oddball_sequence = vec!["standard".into(), "target".into()];
        assert!(matches!(config.validate(), Err(ConfigError::TrialLabel { .. })));

        let mut config = ExperimentConfig::auditory();
        config.instructions.truncate(2);
        assert!(matches!(config.validate(), Err(ConfigError::MissingInstruction(_))));

        let mut config = ExperimentConfig::auditory();
        config.frame_period_s = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::NonPositive("frame_period_s"))));

        let mut config = ExperimentConfig::auditory();
        config.trigger_names.push("trial".into());
        assert!(matches!(config.validate(), Err(ConfigError::Triggers(_))));

        let mut config = ExperimentConfig::auditory();
        config.phases.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoPhases)));
    }
}
