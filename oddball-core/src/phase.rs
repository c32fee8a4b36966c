use crate::trial::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named segment of the experiment, visited once in the configured order.
///
/// The string form is what appears in configuration files, in the output
/// table's `phase` column and as the trigger name sent on phase entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Phase {
    /// Instruction slide, numbered from 1 like the slide texts.
    Instruction(usize),
    Baseline,
    BaselineCalibration,
    OddballBlock,
    OddballBlockReversed,
    ManipulationBlock,
    Practice,
}

impl Phase {
    /// Phases that run an inner trial list.
    pub fn has_trials(&self) -> bool {
        matches!(
            self,
            Self::BaselineCalibration
                | Self::OddballBlock
                | Self::OddballBlockReversed
                | Self::ManipulationBlock
                | Self::Practice
        )
    }

    pub fn is_instruction(&self) -> bool {
        matches!(self, Self::Instruction(_))
    }

    pub fn is_practice(&self) -> bool {
        matches!(self, Self::Practice)
    }

    pub fn is_oddball(&self) -> bool {
        matches!(self, Self::OddballBlock | Self::OddballBlockReversed | Self::Practice)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instruction(n) => write!(f, "instruction{n}"),
            Self::Baseline => f.write_str("baseline"),
            Self::BaselineCalibration => f.write_str("baseline_calibration"),
            Self::OddballBlock => f.write_str("oddball_block"),
            Self::OddballBlockReversed => f.write_str("oddball_block_rev"),
            Self::ManipulationBlock => f.write_str("manipulation_block"),
            Self::Practice => f.write_str("practice_trials"),
        }
    }
}

impl FromStr for Phase {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "baseline" => Self::Baseline,
            "baseline_calibration" => Self::BaselineCalibration,
            "oddball_block" => Self::OddballBlock,
            "oddball_block_rev" => Self::OddballBlockReversed,
            "manipulation_block" => Self::ManipulationBlock,
            "practice_trials" => Self::Practice,
            other => {
                let slide = other
                    .strip_prefix("instruction")
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ParseError::UnknownPhase(other.to_string()))?;
                Self::Instruction(slide)
            }
        })
    }
}

impl TryFrom<String> for Phase {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        phase.to_string()
    }
}

/// Steps of the manipulation block, run sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManipulationStep {
    Baseline,
    Squeeze,
    Relax,
}

impl ManipulationStep {
    pub const SEQUENCE: [ManipulationStep; 4] = [
        ManipulationStep::Baseline,
        ManipulationStep::Squeeze,
        ManipulationStep::Baseline,
        ManipulationStep::Relax,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Squeeze => "squeeze",
            Self::Relax => "relax",
        }
    }

    pub fn trigger_name(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Squeeze => "manipulation_squeeze",
            Self::Relax => "manipulation_relax",
        }
    }
}

/// Slides of the pupil calibration phase: neutral, maximal constriction
/// (white) and maximal dilation (black).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationSlide {
    Baseline,
    WhiteSlide,
    BlackSlide,
}

impl CalibrationSlide {
    pub const SEQUENCE: [CalibrationSlide; 3] = [
        CalibrationSlide::Baseline,
        CalibrationSlide::WhiteSlide,
        CalibrationSlide::BlackSlide,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::WhiteSlide => "baseline_whiteslide",
            Self::BlackSlide => "baseline_blackslide",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_names_round_trip_through_strings() {
        for name in [
            "instruction1",
            "instruction3",
            "baseline",
            "baseline_calibration",
            "oddball_block",
            "oddball_block_rev",
            "manipulation_block",
            "practice_trials",
        ] {
            let phase: Phase = name.parse().unwrap();
            assert_eq!(phase.to_string(), name);
        }
    }

    #[test]
    fn rejects_unknown_phase_names() {
        assert!("instruction".parse::<Phase>().is_err());
        assert!("instruction0".parse::<Phase>().is_err());
        assert!("warmup".parse::<Phase>().is_err());
    }
}
