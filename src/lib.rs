//! Tangled program graphs: teams of bidding register-machine learners,
//! wired into a graph and evolved generation by generation.

pub mod config;
pub mod engines;
pub mod error;
pub mod types;

pub use engines::evolution::{Agent, AgentQuery, AgentScore, GenerationSummary, ScoringMode, Trainer};
pub use error::{Result, TpgError};
pub use types::{ActionCode, ActionSet, LearnerId, TeamId};
