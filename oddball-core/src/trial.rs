use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown trial type `{0}`")]
    UnknownTrialKind(String),
    #[error("invalid level `{0}`, expected `+`, `-`, `high` or `low`")]
    InvalidLevel(String),
    #[error("too many parameters in trial label `{0}`")]
    TooManyParts(String),
    #[error("unknown phase `{0}`")]
    UnknownPhase(String),
}

/// Separator between the base label and its sub-parameters.
pub const LABEL_SEPARATOR: char = ':';

/// Trial types of the oddball blocks. The `_rev` variants swap the two
/// stimuli of the standard/oddball pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialKind {
    Standard,
    Oddball,
    #[serde(rename = "standard_rev")]
    StandardReversed,
    #[serde(rename = "oddball_rev")]
    OddballReversed,
}

impl TrialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Oddball => "oddball",
            Self::StandardReversed => "standard_rev",
            Self::OddballReversed => "oddball_rev",
        }
    }

    pub fn is_oddball(&self) -> bool {
        matches!(self, Self::Oddball | Self::OddballReversed)
    }

    pub fn is_reversed(&self) -> bool {
        matches!(self, Self::StandardReversed | Self::OddballReversed)
    }
}

impl FromStr for TrialKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "oddball" => Ok(Self::Oddball),
            "standard_rev" => Ok(Self::StandardReversed),
            "oddball_rev" => Ok(Self::OddballReversed),
            other => Err(ParseError::UnknownTrialKind(other.to_string())),
        }
    }
}

/// Binary sub-condition level (utility or salience).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
        }
    }
}

impl FromStr for Level {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" | "high" => Ok(Self::High),
            "-" | "low" => Ok(Self::Low),
            other => Err(ParseError::InvalidLevel(other.to_string())),
        }
    }
}

/// One entry of an inner trial list, e.g. `oddball:-:+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrialSpec {
    pub label: String,
    pub kind: TrialKind,
    pub utility: Option<Level>,
    pub salience: Option<Level>,
}

impl TrialSpec {
    pub fn new(kind: TrialKind) -> Self {
        Self {
            label: kind.as_str().to_string(),
            kind,
            utility: None,
            salience: None,
        }
    }

    /// Trigger name of the stimulus onset; the base label without parameters.
    pub fn trigger_name(&self) -> &'static str {
        self.kind.as_str()
    }
}

impl FromStr for TrialSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(LABEL_SEPARATOR).map(str::trim);
        let kind = parts.next().unwrap_or_default().parse::<TrialKind>()?;
        let utility = parts.next().map(str::parse::<Level>).transpose()?;
        let salience = parts.next().map(str::parse::<Level>).transpose()?;
        if parts.next().is_some() {
            return Err(ParseError::TooManyParts(s.to_string()));
        }
        Ok(Self {
            label: s.to_string(),
            kind,
            utility,
            salience,
        })
    }
}

impl fmt::Display for TrialSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_labels() {
        let spec: TrialSpec = "oddball_rev".parse().unwrap();
        assert_eq!(spec.kind, TrialKind::OddballReversed);
        assert_eq!(spec.utility, None);
        assert_eq!(spec.salience, None);
        assert!(spec.kind.is_oddball() && spec.kind.is_reversed());
    }

    #[test]
    fn parses_utility_and_salience() {
        let spec: TrialSpec = "oddball:-:+".parse().unwrap();
        assert_eq!(spec.kind, TrialKind::Oddball);
        assert_eq!(spec.utility, Some(Level::Low));
        assert_eq!(spec.salience, Some(Level::High));
        assert_eq!(spec.to_string(), "oddball:-:+");
        assert_eq!(spec.trigger_name(), "oddball");

        let spec: TrialSpec = "standard:high".parse().unwrap();
        assert_eq!(spec.utility, Some(Level::High));
        assert_eq!(spec.salience, None);
    }

    #[test]
    fn rejects_malformed_labels() {
        assert_eq!(
            "target".parse::<TrialSpec>(),
            Err(ParseError::UnknownTrialKind("target".into()))
        );
        assert_eq!(
            "oddball:?".parse::<TrialSpec>(),
            Err(ParseError::InvalidLevel("?".into()))
        );
        assert!(matches!(
            "oddball:+:+:+".parse::<TrialSpec>(),
            Err(ParseError::TooManyParts(_))
        ));
    }
}
