use crate::config::ConfigError;
use crate::record::RecordError;
use oddball_core::TriggerTableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("could not write trial data: {0}")]
    Record(#[from] RecordError),
    #[error("invalid trigger table: {0}")]
    Triggers(#[from] TriggerTableError),
}
