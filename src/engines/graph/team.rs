use super::context::ExecutionContext;
use super::learner::Learner;
use super::population::Population;
use super::variation::Variation;
use crate::error::{Result, TpgError};
use crate::types::{ActionCode, LearnerId, TeamId};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A node of the policy graph: a set of learners that bid for the right to
/// act.
///
/// Teams reference learners, they do not own them. `in_learners` lists the
/// learners whose action points at this team; a team with none is a root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub(super) id: TeamId,
    pub(super) learners: Vec<LearnerId>,
    pub(super) outcomes: HashMap<String, f64>,
    pub(super) fitness: Option<f64>,
    pub(super) generation: u64,
    pub(super) in_learners: Vec<LearnerId>,
}

impl Team {
    pub fn new(id: TeamId, generation: u64) -> Self {
        Self {
            id,
            learners: Vec::new(),
            outcomes: HashMap::new(),
            fitness: None,
            generation,
            in_learners: Vec::new(),
        }
    }

    pub fn id(&self) -> TeamId {
        self.id
    }

    pub fn learners(&self) -> &[LearnerId] {
        &self.learners
    }

    pub fn outcomes(&self) -> &HashMap<String, f64> {
        &self.outcomes
    }

    pub fn outcome(&self, task: &str) -> Option<f64> {
        self.outcomes.get(task).copied()
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_learners(&self) -> &[LearnerId] {
        &self.in_learners
    }

    pub fn num_learners_referencing(&self) -> usize {
        self.in_learners.len()
    }

    pub fn is_root(&self) -> bool {
        self.in_learners.is_empty()
    }

    /// Walk the graph from this team to an atomic action.
    ///
    /// Each team on the path is pushed onto `visited`; learners pointing at a
    /// visited team are skipped. Reaching a visited team, or a team whose
    /// every learner is skipped, is a `StructuralCycle`.
    pub fn act(
        &self,
        population: &Population,
        state: &[f64],
        visited: &mut Vec<TeamId>,
        context: &mut ExecutionContext,
    ) -> Result<ActionCode> {
        if visited.contains(&self.id) {
            return Err(TpgError::StructuralCycle {
                team: self.id,
                visited: visited.clone(),
            });
        }
        visited.push(self.id);

        let mut winner: Option<(&Learner, f64)> = None;
        for id in &self.learners {
            let learner = population.learner_ref(*id);
            let eligible = match learner.action.target_team() {
                None => true,
                Some(target) => !visited.contains(&target),
            };
            if !eligible {
                continue;
            }

            let bid = learner.bid(state, context);
            if winner.map_or(true, |(_, best)| bid > best) {
                winner = Some((learner, bid));
            }
        }

        let (learner, _) = winner.ok_or_else(|| TpgError::StructuralCycle {
            team: self.id,
            visited: visited.clone(),
        })?;
        learner.get_action(population, state, visited, context)
    }
}

impl Population {
    /// Team-level variation: geometric deletion, geometric addition, then
    /// replacement of individual learners by mutated clones. Repeated per the
    /// rampant schedule. Panics if the result breaks a team invariant.
    pub fn mutate_team<R: Rng>(
        &mut self,
        team: TeamId,
        learner_pool: &[LearnerId],
        team_pool: &[TeamId],
        v: &mut Variation<'_, R>,
    ) {
        let repetitions = v.mutation.rampant_repetitions(v.generation, v.rng);
        for _ in 0..repetitions {
            self.delete_learners(team, v);
            self.add_learners(team, learner_pool, v);
            self.mutate_learners(team, team_pool, v);
        }
        self.assert_team_invariants(team);
    }

    fn delete_learners<R: Rng>(&mut self, team: TeamId, v: &mut Variation<'_, R>) {
        let base = v.mutation.p_learner_delete;
        let mut probability = base;

        while v.rng.gen::<f64>() < probability {
            let members = self.team_ref(team).learners.clone();
            if members.len() <= 2 {
                break;
            }

            let sole_atomic = self.atomic_count(team) == 1;
            let candidates: Vec<LearnerId> = members
                .into_iter()
                .filter(|l| !(sole_atomic && self.learner_ref(*l).is_atomic()))
                .collect();
            let Some(&victim) = candidates.choose(v.rng) else {
                break;
            };

            self.remove_learner_from_team(team, victim);
            probability *= base;
        }
    }

    fn add_learners<R: Rng>(
        &mut self,
        team: TeamId,
        learner_pool: &[LearnerId],
        v: &mut Variation<'_, R>,
    ) {
        let base = v.mutation.p_learner_add;
        let mut probability = base;

        while v.rng.gen::<f64>() < probability {
            let members = &self.team_ref(team).learners;
            if v.mutation.max_team_size > 0 && members.len() >= v.mutation.max_team_size {
                break;
            }

            let candidates: Vec<LearnerId> = learner_pool
                .iter()
                .copied()
                .filter(|l| {
                    !members.contains(l)
                        && self
                            .learner(*l)
                            .is_some_and(|learner| learner.action.target_team() != Some(team))
                })
                .collect();
            let Some(&recruit) = candidates.choose(v.rng) else {
                break;
            };

            self.add_learner_to_team(team, recruit);
            probability *= base;
        }
    }

    fn mutate_learners<R: Rng>(
        &mut self,
        team: TeamId,
        team_pool: &[TeamId],
        v: &mut Variation<'_, R>,
    ) {
        let members = self.team_ref(team).learners.clone();
        for original in members {
            if v.rng.gen::<f64>() >= v.mutation.p_learner_mutate {
                continue;
            }

            let force_atomic =
                self.atomic_count(team) == 1 && self.learner_ref(original).is_atomic();

            // Shared learners are never edited in place; the team swaps in a
            // mutated copy instead.
            self.remove_learner_from_team(team, original);
            let clone = self.clone_learner(original, v.ids, v.generation);
            self.mutate_learner(clone, team, team_pool, force_atomic, v);
            self.add_learner_to_team(team, clone);
        }
    }
}
