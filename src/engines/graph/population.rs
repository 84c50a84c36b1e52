use super::action::Action;
use super::context::ExecutionContext;
use super::learner::Learner;
use super::team::Team;
use crate::engines::program::Program;
use crate::error::{Result, TpgError};
use crate::types::{ActionCode, IdAllocator, LearnerId, TeamId};
use std::collections::{BTreeMap, HashSet};

/// Arena holding every team and learner of a population.
///
/// All edges are ids. Membership (team -> learner) is mirrored by
/// `Learner::in_teams`, action references (learner -> team) by
/// `Team::in_learners`. Every structural edit goes through this type so both
/// directions change together.
#[derive(Debug, Clone, Default)]
pub struct Population {
    teams: BTreeMap<TeamId, Team>,
    learners: BTreeMap<LearnerId, Learner>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from checkpointed parts, rejecting inconsistent bookkeeping
    /// and malformed teams.
    pub fn from_parts(teams: Vec<Team>, learners: Vec<Learner>) -> Result<Self> {
        let population = Self {
            teams: teams.into_iter().map(|t| (t.id, t)).collect(),
            learners: learners.into_iter().map(|l| (l.id, l)).collect(),
        };
        let problems = population.audit();
        if !problems.is_empty() {
            return Err(TpgError::Checkpoint(problems.join("; ")));
        }
        let problems: Vec<String> = population
            .teams
            .keys()
            .flat_map(|team| population.team_violations(*team))
            .collect();
        if !problems.is_empty() {
            return Err(TpgError::Checkpoint(problems.join("; ")));
        }
        Ok(population)
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id)
    }

    pub fn learner(&self, id: LearnerId) -> Option<&Learner> {
        self.learners.get(&id)
    }

    pub fn contains_team(&self, id: TeamId) -> bool {
        self.teams.contains_key(&id)
    }

    pub fn contains_learner(&self, id: LearnerId) -> bool {
        self.learners.contains_key(&id)
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn learners(&self) -> impl Iterator<Item = &Learner> {
        self.learners.values()
    }

    pub fn team_ids(&self) -> Vec<TeamId> {
        self.teams.keys().copied().collect()
    }

    pub fn learner_ids(&self) -> Vec<LearnerId> {
        self.learners.keys().copied().collect()
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn learner_count(&self) -> usize {
        self.learners.len()
    }

    /// Teams no learner points at
    pub fn roots(&self) -> Vec<TeamId> {
        self.teams
            .values()
            .filter(|t| t.is_root())
            .map(|t| t.id)
            .collect()
    }

    pub fn root_count(&self) -> usize {
        self.teams.values().filter(|t| t.is_root()).count()
    }

    pub fn atomic_count(&self, team: TeamId) -> usize {
        self.team_ref(team)
            .learners
            .iter()
            .filter(|l| self.learner_ref(**l).is_atomic())
            .count()
    }

    /// Resolve one decision for `team`, starting a fresh frame in `context`.
    pub fn act(&self, team: TeamId, state: &[f64], context: &mut ExecutionContext) -> Result<ActionCode> {
        let root = self.team(team).ok_or(TpgError::UnknownTeam(team))?;
        context.begin_frame();
        let mut visited = Vec::new();
        root.act(self, state, &mut visited, context)
    }

    pub fn create_team(&mut self, ids: &mut IdAllocator, generation: u64) -> TeamId {
        let id = ids.team();
        self.teams.insert(id, Team::new(id, generation));
        id
    }

    /// Add a learner that no team holds yet; a team action takes a
    /// reference on its target.
    pub fn create_learner(
        &mut self,
        ids: &mut IdAllocator,
        program: Program,
        action: Action,
        generation: u64,
    ) -> LearnerId {
        let id = ids.learner();
        if let Some(target) = action.target_team() {
            self.team_mut(target).in_learners.push(id);
        }
        self.learners.insert(id, Learner::new(id, program, action, generation));
        id
    }

    /// New learner with a copy of `source`'s program and action
    pub fn clone_learner(&mut self, source: LearnerId, ids: &mut IdAllocator, generation: u64) -> LearnerId {
        let original = self.learner_ref(source);
        let program = original.program.duplicate(ids);
        let action = original.action.clone();
        self.create_learner(ids, program, action, generation)
    }

    pub fn add_learner_to_team(&mut self, team: TeamId, learner: LearnerId) {
        let entry = self.team_mut(team);
        if entry.learners.contains(&learner) {
            panic!("Invariant violated: {} is already on {}", learner, team);
        }
        entry.learners.push(learner);
        self.learner_mut(learner).in_teams.push(team);
    }

    /// Detach `learner` from `team`. The learner stays in the arena even if
    /// no team holds it any more; see `prune_orphans`.
    pub fn remove_learner_from_team(&mut self, team: TeamId, learner: LearnerId) {
        let entry = self.team_mut(team);
        let Some(pos) = entry.learners.iter().position(|l| *l == learner) else {
            panic!("Invariant violated: {} is not on {}", learner, team);
        };
        entry.learners.remove(pos);
        self.learner_mut(learner).in_teams.retain(|t| *t != team);
    }

    /// Replace a learner's action, moving its reference to the new target.
    pub fn set_learner_action(&mut self, learner: LearnerId, action: Action) {
        if let Some(target) = action.target_team() {
            if self.learner_ref(learner).in_teams.contains(&target) {
                panic!("Invariant violated: {} would point at its own team {}", learner, target);
            }
        }
        let old = std::mem::replace(&mut self.learner_mut(learner).action, action);
        if let Some(previous) = old.target_team() {
            self.release_reference(previous, learner);
        }
        if let Some(target) = self.learner_ref(learner).action.target_team() {
            self.team_mut(target).in_learners.push(learner);
        }
    }

    /// Delete a learner that no team holds, dropping its reference.
    pub fn remove_learner(&mut self, learner: LearnerId) -> Learner {
        let removed = self
            .learners
            .remove(&learner)
            .unwrap_or_else(|| panic!("Invariant violated: unknown {}", learner));
        if !removed.in_teams.is_empty() {
            panic!("Invariant violated: {} removed while on {:?}", learner, removed.in_teams);
        }
        if let Some(target) = removed.action.target_team() {
            self.release_reference(target, learner);
        }
        removed
    }

    /// Delete a root team. Learners left without any team are deleted too,
    /// which releases whatever teams they pointed at. Returns the deleted
    /// learner ids.
    pub fn remove_team(&mut self, team: TeamId) -> Vec<LearnerId> {
        let Some(removed) = self.teams.get(&team) else {
            panic!("Invariant violated: unknown {}", team);
        };
        if !removed.in_learners.is_empty() {
            panic!(
                "Invariant violated: {} deleted while referenced by {:?}",
                team, removed.in_learners
            );
        }

        let members = removed.learners.clone();
        let mut deleted = Vec::new();
        for learner in members {
            self.remove_learner_from_team(team, learner);
            if self.learner_ref(learner).in_teams.is_empty() {
                self.remove_learner(learner);
                deleted.push(learner);
            }
        }
        self.teams.remove(&team);
        deleted
    }

    /// Delete every learner no team holds
    pub fn prune_orphans(&mut self) -> Vec<LearnerId> {
        let orphans: Vec<LearnerId> = self
            .learners
            .values()
            .filter(|l| l.in_teams.is_empty())
            .map(|l| l.id)
            .collect();
        for learner in &orphans {
            self.remove_learner(*learner);
        }
        orphans
    }

    pub fn set_outcome(&mut self, team: TeamId, task: &str, value: f64) -> Result<()> {
        let entry = self.teams.get_mut(&team).ok_or(TpgError::UnknownTeam(team))?;
        entry.outcomes.insert(task.to_string(), value);
        Ok(())
    }

    pub fn set_fitness(&mut self, team: TeamId, fitness: f64) {
        self.team_mut(team).fitness = Some(fitness);
    }

    /// Drop outcomes of every task not in `keep`
    pub fn retain_outcomes(&mut self, keep: &[String]) {
        for team in self.teams.values_mut() {
            team.outcomes.retain(|task, _| keep.contains(task));
        }
    }

    /// Panics unless `team` has at least two distinct learners, one of
    /// them atomic, and none pointing back at it.
    pub fn assert_team_invariants(&self, team: TeamId) {
        if let Some(problem) = self.team_violations(team).first() {
            panic!("Invariant violated: {}", problem);
        }
    }

    /// Structural rules `team` breaks; empty for a well-formed team.
    pub fn team_violations(&self, team: TeamId) -> Vec<String> {
        let entry = self.team_ref(team);
        let mut problems = Vec::new();
        if entry.learners.len() < 2 {
            problems.push(format!("{} has {} learners", team, entry.learners.len()));
        }
        if self.atomic_count(team) == 0 {
            problems.push(format!("{} has no atomic learner", team));
        }
        let distinct: HashSet<_> = entry.learners.iter().collect();
        if distinct.len() != entry.learners.len() {
            problems.push(format!("{} lists a learner twice", team));
        }
        for learner in &entry.learners {
            if self.learner_ref(*learner).action.target_team() == Some(team) {
                problems.push(format!("{} points at its own team {}", learner, team));
            }
        }
        problems
    }

    /// Bookkeeping problems, empty when both edge directions agree and every
    /// id resolves.
    pub fn audit(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for team in self.teams.values() {
            for learner in &team.learners {
                match self.learners.get(learner) {
                    None => problems.push(format!("{} lists missing {}", team.id, learner)),
                    Some(l) if !l.in_teams.contains(&team.id) => {
                        problems.push(format!("{} lists {} but not vice versa", team.id, learner))
                    }
                    _ => {}
                }
            }
            for learner in &team.in_learners {
                match self.learners.get(learner) {
                    Some(l) if l.action.target_team() == Some(team.id) => {}
                    _ => problems.push(format!("{} counts stale reference {}", team.id, learner)),
                }
            }
        }

        for learner in self.learners.values() {
            for team in &learner.in_teams {
                match self.teams.get(team) {
                    Some(t) if t.learners.contains(&learner.id) => {}
                    _ => problems.push(format!("{} claims membership of {}", learner.id, team)),
                }
            }
            if let Some(target) = learner.action.target_team() {
                match self.teams.get(&target) {
                    Some(t) if t.in_learners.contains(&learner.id) => {}
                    _ => problems.push(format!("{} points at uncounted {}", learner.id, target)),
                }
            }
        }

        problems
    }

    pub(crate) fn team_ref(&self, id: TeamId) -> &Team {
        self.teams
            .get(&id)
            .unwrap_or_else(|| panic!("Invariant violated: unknown {}", id))
    }

    pub(crate) fn learner_ref(&self, id: LearnerId) -> &Learner {
        self.learners
            .get(&id)
            .unwrap_or_else(|| panic!("Invariant violated: unknown {}", id))
    }

    pub(super) fn team_mut(&mut self, id: TeamId) -> &mut Team {
        self.teams
            .get_mut(&id)
            .unwrap_or_else(|| panic!("Invariant violated: unknown {}", id))
    }

    pub(super) fn learner_mut(&mut self, id: LearnerId) -> &mut Learner {
        self.learners
            .get_mut(&id)
            .unwrap_or_else(|| panic!("Invariant violated: unknown {}", id))
    }

    fn release_reference(&mut self, target: TeamId, learner: LearnerId) {
        let entry = self.team_mut(target);
        match entry.in_learners.iter().position(|l| *l == learner) {
            Some(pos) => {
                entry.in_learners.remove(pos);
            }
            None => panic!("Invariant violated: {} holds no reference on {}", learner, target),
        }
    }

    pub fn into_parts(self) -> (Vec<Team>, Vec<Learner>) {
        (
            self.teams.into_values().collect(),
            self.learners.into_values().collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::program::{Instruction, Mode, Operation};

    fn program(ids: &mut IdAllocator) -> Program {
        Program::new(ids, vec![Instruction::new(Mode::Input, Operation::Add, 0, 0)])
    }

    fn atomic(code: i64) -> Action {
        Action::Atomic(ActionCode::Discrete(code))
    }

    #[test]
    fn test_membership_is_mirrored() {
        let mut ids = IdAllocator::new();
        let mut pop = Population::new();
        let team = pop.create_team(&mut ids, 0);
        let p = program(&mut ids);
        let learner = pop.create_learner(&mut ids, p, atomic(1), 0);

        pop.add_learner_to_team(team, learner);
        assert_eq!(pop.learner(learner).unwrap().in_teams(), &[team]);
        assert!(pop.audit().is_empty());

        pop.remove_learner_from_team(team, learner);
        assert!(pop.learner(learner).unwrap().in_teams().is_empty());
        assert_eq!(pop.prune_orphans(), vec![learner]);
        assert!(!pop.contains_learner(learner));
    }

    #[test]
    #[should_panic(expected = "already on")]
    fn test_duplicate_membership_panics() {
        let mut ids = IdAllocator::new();
        let mut pop = Population::new();
        let team = pop.create_team(&mut ids, 0);
        let p = program(&mut ids);
        let learner = pop.create_learner(&mut ids, p, atomic(1), 0);
        pop.add_learner_to_team(team, learner);
        pop.add_learner_to_team(team, learner);
    }

    #[test]
    #[should_panic(expected = "is not on")]
    fn test_removing_absent_learner_panics() {
        let mut ids = IdAllocator::new();
        let mut pop = Population::new();
        let team = pop.create_team(&mut ids, 0);
        let p = program(&mut ids);
        let learner = pop.create_learner(&mut ids, p, atomic(1), 0);
        pop.remove_learner_from_team(team, learner);
    }

    #[test]
    fn test_action_swap_moves_reference() {
        let mut ids = IdAllocator::new();
        let mut pop = Population::new();
        let a = pop.create_team(&mut ids, 0);
        let b = pop.create_team(&mut ids, 0);
        let p = program(&mut ids);
        let learner = pop.create_learner(&mut ids, p, Action::Team(a), 0);
        assert_eq!(pop.team(a).unwrap().num_learners_referencing(), 1);
        assert_eq!(pop.roots(), vec![b]);

        pop.set_learner_action(learner, Action::Team(b));
        assert_eq!(pop.team(a).unwrap().num_learners_referencing(), 0);
        assert_eq!(pop.team(b).unwrap().in_learners(), &[learner]);

        pop.set_learner_action(learner, atomic(0));
        assert_eq!(pop.root_count(), 2);
        assert!(pop.audit().is_empty());
    }

    #[test]
    fn test_clone_takes_its_own_reference() {
        let mut ids = IdAllocator::new();
        let mut pop = Population::new();
        let target = pop.create_team(&mut ids, 0);
        let p = program(&mut ids);
        let learner = pop.create_learner(&mut ids, p, Action::Team(target), 0);
        let copy = pop.clone_learner(learner, &mut ids, 1);

        assert_ne!(copy, learner);
        assert_eq!(pop.learner(copy).unwrap().program(), pop.learner(learner).unwrap().program());
        assert_eq!(pop.team(target).unwrap().num_learners_referencing(), 2);
    }
}
