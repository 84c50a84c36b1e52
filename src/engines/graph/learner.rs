use super::action::Action;
use super::context::ExecutionContext;
use super::population::Population;
use super::variation::Variation;
use crate::engines::program::Program;
use crate::error::Result;
use crate::types::{ActionCode, LearnerId, TeamId};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A program paired with the action it proposes.
///
/// Learners are shared: any number of teams may list the same learner, and
/// `in_teams` records which ones do. A learner leaves the population once that
/// list is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    pub(super) id: LearnerId,
    pub(super) program: Program,
    pub(super) action: Action,
    pub(super) generation: u64,
    pub(super) in_teams: Vec<TeamId>,
}

impl Learner {
    pub fn new(id: LearnerId, program: Program, action: Action, generation: u64) -> Self {
        Self {
            id,
            program,
            action,
            generation,
            in_teams: Vec::new(),
        }
    }

    pub fn id(&self) -> LearnerId {
        self.id
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn is_atomic(&self) -> bool {
        self.action.is_atomic()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_teams(&self) -> &[TeamId] {
        &self.in_teams
    }

    pub fn num_teams_referencing(&self) -> usize {
        self.in_teams.len()
    }

    /// Program output for `state`, computed at most once per frame.
    pub fn bid(&self, state: &[f64], context: &mut ExecutionContext) -> f64 {
        if let Some(bid) = context.cached_bid(self.id) {
            return bid;
        }
        let bid = context.run_program(self.id, &self.program, state);
        context.store_bid(self.id, bid);
        bid
    }

    pub fn get_action(
        &self,
        population: &Population,
        state: &[f64],
        visited: &mut Vec<TeamId>,
        context: &mut ExecutionContext,
    ) -> Result<ActionCode> {
        self.action.resolve(population, state, visited, context)
    }
}

impl Population {
    /// Mutate the program and/or the action of `learner` until at least one
    /// of them changed. `parent` is the team the learner is about to join and
    /// is never chosen as a target.
    pub fn mutate_learner<R: Rng>(
        &mut self,
        learner: LearnerId,
        parent: TeamId,
        team_pool: &[TeamId],
        force_atomic: bool,
        v: &mut Variation<'_, R>,
    ) -> bool {
        let mut changed = false;
        while !changed {
            if v.rng.gen::<f64>() < v.mutation.p_program_mutate {
                let entry = self.learner_mut(learner);
                entry
                    .program
                    .mutate(v.ids, v.instruction_set, v.program, v.mutation, v.rng);
                changed = true;
            }

            if v.rng.gen::<f64>() < v.mutation.p_action_mutate {
                changed |= self.mutate_action(learner, parent, team_pool, force_atomic, v);
            }
        }
        changed
    }

    /// Swap in a different atomic code or team target. Returns false when no
    /// alternative exists, leaving the action as it was.
    fn mutate_action<R: Rng>(
        &mut self,
        learner: LearnerId,
        parent: TeamId,
        team_pool: &[TeamId],
        force_atomic: bool,
        v: &mut Variation<'_, R>,
    ) -> bool {
        let current = self.learner_ref(learner).action.clone();

        let atomic = force_atomic || v.rng.gen::<f64>() < v.mutation.p_action_atomic;
        let target = if atomic {
            None
        } else {
            let options: Vec<TeamId> = team_pool
                .iter()
                .copied()
                .filter(|t| *t != parent && Some(*t) != current.target_team() && self.contains_team(*t))
                .collect();
            options.choose(v.rng).copied()
        };

        let action = match target {
            Some(team) => Action::Team(team),
            None => {
                let code = match &current {
                    Action::Atomic(code) => v.actions.sample_excluding(code, v.rng),
                    Action::Team(_) => Some(v.actions.sample(v.rng)),
                };
                match code {
                    Some(code) => Action::Atomic(code),
                    None => return false,
                }
            }
        };
        if action == current {
            return false;
        }
        self.set_learner_action(learner, action);
        true
    }
}
