use crate::types::TeamId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TpgError {
    #[error("No valid action at team {team}: every path revisits {visited:?}")]
    StructuralCycle { team: TeamId, visited: Vec<TeamId> },

    #[error("Team {team} has no outcome for task '{task}'")]
    MissingOutcome { team: TeamId, task: String },

    #[error("Unknown team: {0}")]
    UnknownTeam(TeamId),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TpgError>;
