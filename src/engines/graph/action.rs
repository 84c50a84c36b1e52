use super::context::ExecutionContext;
use super::population::Population;
use crate::error::{Result, TpgError};
use crate::types::{ActionCode, TeamId};
use serde::{Deserialize, Serialize};

/// What a learner does when it wins a bid.
///
/// A `Team` action is a counted reference: the target lists the holder in
/// its `in_learners`. Only `Population` changes actions, so the count stays
/// in step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Atomic(ActionCode),
    Team(TeamId),
}

impl Action {
    pub fn is_atomic(&self) -> bool {
        matches!(self, Action::Atomic(_))
    }

    pub fn target_team(&self) -> Option<TeamId> {
        match self {
            Action::Atomic(_) => None,
            Action::Team(id) => Some(*id),
        }
    }

    pub fn resolve(
        &self,
        population: &Population,
        state: &[f64],
        visited: &mut Vec<TeamId>,
        context: &mut ExecutionContext,
    ) -> Result<ActionCode> {
        match self {
            Action::Atomic(code) => Ok(code.clone()),
            Action::Team(id) => population
                .team(*id)
                .ok_or(TpgError::UnknownTeam(*id))?
                .act(population, state, visited, context),
        }
    }
}
