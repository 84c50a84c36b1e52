use super::agent::{Agent, AgentScore, TaskRegistry};
use super::progress::ProgressCallback;
use super::scoring::{self, ScoringMode};
use crate::config::AppConfig;
use crate::engines::graph::{Action, ExecutionContext, Population, Variation};
use crate::engines::program::{InstructionSet, Program, SharedMemory};
use crate::error::{Result, TpgError};
use crate::types::{IdAllocator, TeamId};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Which root teams `get_agents` hands out, and in what order
#[derive(Debug, Clone, Default)]
pub struct AgentQuery {
    /// Best fitness from the last scoring first
    pub ranked: bool,
    /// Leave out teams that already have an outcome for every one of these
    pub skip_tasks: Vec<String>,
}

/// What one call to `evolve` did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: u64,
    pub best_fitness: f64,
    pub scored: usize,
    pub deleted_teams: usize,
    pub removed_learners: usize,
    pub created_teams: usize,
    pub pruned_learners: usize,
    pub teams: usize,
    pub learners: usize,
    pub roots: usize,
}

/// Owns a population of teams and learners and runs the generational loop:
/// hand out root teams as agents, collect their outcomes, then `evolve`.
pub struct Trainer {
    pub(super) config: AppConfig,
    pub(super) instruction_set: InstructionSet,
    pub(super) population: Population,
    pub(super) ids: IdAllocator,
    pub(super) roots: Vec<TeamId>,
    pub(super) elites: Vec<TeamId>,
    pub(super) generation: u64,
    pub(super) tasks: TaskRegistry,
    pub(super) memory: Option<Arc<SharedMemory>>,
    pub(super) rng: StdRng,
    pub(super) seed_base: u64,
}

impl Trainer {
    /// Validate `config` and seed the initial population.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = Self::make_rng(config.trainer.seed, 0);
        let seed_base = config.trainer.seed.unwrap_or_else(|| rng.gen());
        let instruction_set = InstructionSet::new(config.program.instruction_set);
        let memory = instruction_set
            .uses_memory()
            .then(|| Arc::new(SharedMemory::new(config.program.memory_rows, config.program.memory_cols)));

        let mut trainer = Self {
            config,
            instruction_set,
            population: Population::new(),
            ids: IdAllocator::new(),
            roots: Vec::new(),
            elites: Vec::new(),
            generation: 0,
            tasks: TaskRegistry::new(),
            memory,
            rng,
            seed_base,
        };
        trainer.initialize_population();

        log::info!(
            "Initialized {} teams with {} learners",
            trainer.population.team_count(),
            trainer.population.learner_count()
        );
        Ok(trainer)
    }

    pub(super) fn make_rng(seed: Option<u64>, generation: u64) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(generation)),
            None => StdRng::from_entropy(),
        }
    }

    /// Every team starts with two learners on distinct codes (when the set
    /// has two) plus up to `init_max_team_size - 2` more, all atomic.
    fn initialize_population(&mut self) {
        let actions = self.config.trainer.actions.clone();

        for _ in 0..self.config.trainer.team_pop_size {
            let team = self.population.create_team(&mut self.ids, 0);

            let mut codes = if actions.len() >= 2 {
                index::sample(&mut self.rng, actions.len(), 2)
                    .into_iter()
                    .filter_map(|i| actions.get(i))
                    .collect::<Vec<_>>()
            } else {
                vec![actions.sample(&mut self.rng), actions.sample(&mut self.rng)]
            };
            let extra = self
                .rng
                .gen_range(0..=self.config.mutation.init_max_team_size - 2);
            for _ in 0..extra {
                codes.push(actions.sample(&mut self.rng));
            }

            for code in codes {
                let program = Program::random(
                    &mut self.ids,
                    &self.instruction_set,
                    &self.config.program,
                    &mut self.rng,
                );
                let learner =
                    self.population
                        .create_learner(&mut self.ids, program, Action::Atomic(code), 0);
                self.population.add_learner_to_team(team, learner);
            }
        }

        self.roots = self.population.roots();
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn roots(&self) -> &[TeamId] {
        &self.roots
    }

    pub fn elites(&self) -> &[TeamId] {
        &self.elites
    }

    pub fn memory(&self) -> Option<&SharedMemory> {
        self.memory.as_deref()
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.names()
    }

    pub fn agents(&self) -> Vec<Agent<'_>> {
        self.get_agents(&AgentQuery::default())
    }

    pub fn get_agents(&self, query: &AgentQuery) -> Vec<Agent<'_>> {
        let mut teams: Vec<TeamId> = self
            .roots
            .iter()
            .copied()
            .filter(|id| {
                let Some(team) = self.population.team(*id) else {
                    return false;
                };
                query.skip_tasks.is_empty()
                    || !query.skip_tasks.iter().all(|task| team.outcome(task).is_some())
            })
            .collect();

        if query.ranked {
            let fitness = |id: &TeamId| {
                self.population
                    .team(*id)
                    .and_then(|t| t.fitness())
                    .unwrap_or(f64::NEG_INFINITY)
            };
            teams.sort_by(|a, b| fitness(b).partial_cmp(&fitness(a)).unwrap_or(Ordering::Equal));
        }

        teams
            .into_iter()
            .map(|team| {
                let context = ExecutionContext::new(
                    self.config.program.register_count,
                    self.config.program.persistent_registers,
                    self.memory.clone(),
                    self.seed_base ^ (self.generation << 32) ^ team.0,
                );
                Agent::new(team, &self.population, &self.tasks, context)
            })
            .collect()
    }

    /// Overwrite the stored outcome of `task` for `team`.
    pub fn report_outcome(&mut self, team: TeamId, task: &str, value: f64) -> Result<()> {
        self.population.set_outcome(team, task, value)?;
        self.tasks.register(task);
        Ok(())
    }

    /// Merge outcomes gathered by agents, possibly in another process.
    pub fn apply_scores<I>(&mut self, scores: I) -> Result<()>
    where
        I: IntoIterator<Item = AgentScore>,
    {
        for score in scores {
            for (task, value) in &score.outcomes {
                self.report_outcome(score.team, task, *value)?;
            }
        }
        Ok(())
    }

    /// Run `evaluate` on every selected agent across the rayon pool and
    /// merge the rewards. Returns the number of agents evaluated.
    pub fn evaluate_parallel<F>(&mut self, query: &AgentQuery, evaluate: F) -> Result<usize>
    where
        F: Fn(&mut Agent<'_>) -> Result<()> + Sync,
    {
        let scores: Vec<AgentScore> = {
            let mut agents = self.get_agents(query);
            agents.par_iter_mut().try_for_each(|agent| evaluate(agent))?;
            agents.into_iter().map(Agent::into_score).collect()
        };
        let count = scores.len();
        self.apply_scores(scores)?;
        Ok(count)
    }

    /// Score, select, reproduce and roll over to the next generation.
    ///
    /// An empty `tasks` slice means every task reported this generation.
    /// Fails without touching the population if a root team lacks an
    /// outcome for one of the tasks.
    pub fn evolve(&mut self, tasks: &[String], mode: ScoringMode) -> Result<GenerationSummary> {
        let tasks: Vec<String> = if tasks.is_empty() {
            self.tasks.names()
        } else {
            tasks.to_vec()
        };
        if tasks.is_empty() {
            return Err(TpgError::Configuration(
                "evolve needs at least one task".to_string()
            ));
        }
        if mode == ScoringMode::Single && tasks.len() > 1 {
            log::warn!("Single scoring uses only '{}' of {} tasks", tasks[0], tasks.len());
        }

        let roots = self.roots.clone();
        let outcomes = self.outcome_matrix(&roots, &tasks)?;
        let fitness = scoring::score(&outcomes, mode, &mut self.rng);
        for (team, value) in roots.iter().zip(&fitness) {
            self.population.set_fitness(*team, *value);
        }
        self.elites = if self.config.trainer.elitist {
            scoring::elites(&outcomes).into_iter().map(|i| roots[i]).collect()
        } else {
            Vec::new()
        };
        log::debug!(
            "Scored {} root teams on {:?} with {:?}, {} elites",
            roots.len(),
            tasks,
            mode,
            self.elites.len()
        );

        let (deleted_teams, removed_learners) = self.select(&roots, &fitness);
        let created_teams = self.generate();
        let pruned_learners = self.next_epoch();

        let summary = GenerationSummary {
            generation: self.generation - 1,
            best_fitness: fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            scored: roots.len(),
            deleted_teams,
            removed_learners,
            created_teams,
            pruned_learners,
            teams: self.population.team_count(),
            learners: self.population.learner_count(),
            roots: self.roots.len(),
        };
        log::info!(
            "Generation {}: best {:.4}, -{} teams, +{} teams, {} teams / {} learners / {} roots",
            summary.generation,
            summary.best_fitness,
            summary.deleted_teams,
            summary.created_teams,
            summary.teams,
            summary.learners,
            summary.roots
        );
        Ok(summary)
    }

    /// Evaluate and evolve for `generations` rounds, reporting through
    /// `callback`. Stops at the first error.
    pub fn run<F, C>(
        &mut self,
        generations: usize,
        query: &AgentQuery,
        tasks: &[String],
        mode: ScoringMode,
        evaluate: F,
        mut callback: C,
    ) -> Result<Vec<GenerationSummary>>
    where
        F: Fn(&mut Agent<'_>) -> Result<()> + Sync,
        C: ProgressCallback,
    {
        let mut summaries = Vec::with_capacity(generations);
        for _ in 0..generations {
            callback.on_generation_start(self.generation);
            let evaluated = self.evaluate_parallel(query, &evaluate)?;
            callback.on_agents_evaluated(self.generation, evaluated);
            let summary = self.evolve(tasks, mode)?;
            callback.on_generation_complete(&summary);
            summaries.push(summary);
        }
        Ok(summaries)
    }

    fn outcome_matrix(&self, roots: &[TeamId], tasks: &[String]) -> Result<Vec<Vec<f64>>> {
        roots
            .iter()
            .map(|id| {
                let team = self.population.team(*id).ok_or(TpgError::UnknownTeam(*id))?;
                tasks
                    .iter()
                    .map(|task| {
                        team.outcome(task).ok_or_else(|| TpgError::MissingOutcome {
                            team: *id,
                            task: task.clone(),
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// Delete the worst `gap` fraction of the scored roots, sparing elites.
    fn select(&mut self, roots: &[TeamId], fitness: &[f64]) -> (usize, usize) {
        let mut ranked: Vec<(TeamId, f64)> = roots.iter().copied().zip(fitness.iter().copied()).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let keep = ranked.len() - (ranked.len() as f64 * self.config.trainer.gap) as usize;
        let mut deleted_teams = 0;
        let mut removed_learners = 0;
        for (team, _) in &ranked[keep..] {
            if self.elites.contains(team) {
                continue;
            }
            removed_learners += self.population.remove_team(*team).len();
            deleted_teams += 1;
        }

        self.roots.retain(|t| self.population.contains_team(*t));
        log::debug!(
            "Selection removed {} teams and {} learners",
            deleted_teams,
            removed_learners
        );
        (deleted_teams, removed_learners)
    }

    fn below_quota(&self) -> bool {
        let target = self.config.trainer.team_pop_size;
        if self.config.trainer.root_based_population {
            self.population.root_count() < target
        } else {
            self.population.team_count() < target
        }
    }

    /// Refill the population with mutated copies of surviving roots.
    ///
    /// Learners added to children come from the pre-reproduction pool and
    /// new team references only target pre-reproduction teams, never elites,
    /// so every child is a root and elites stay roots.
    fn generate(&mut self) -> usize {
        let parents = self.roots.clone();
        let learner_pool = self.population.learner_ids();
        let team_pool: Vec<TeamId> = self
            .population
            .team_ids()
            .into_iter()
            .filter(|t| !self.elites.contains(t))
            .collect();
        let generation = self.generation;

        let mut created = 0;
        while self.below_quota() {
            let Some(&parent) = parents.choose(&mut self.rng) else {
                log::warn!("No surviving root team to reproduce from");
                break;
            };

            let child = self.population.create_team(&mut self.ids, generation);
            let members = self.population.team_ref(parent).learners().to_vec();
            for learner in members {
                self.population.add_learner_to_team(child, learner);
            }

            let mut variation = Variation {
                ids: &mut self.ids,
                rng: &mut self.rng,
                instruction_set: &self.instruction_set,
                program: &self.config.program,
                mutation: &self.config.mutation,
                actions: &self.config.trainer.actions,
                generation,
            };
            self.population
                .mutate_team(child, &learner_pool, &team_pool, &mut variation);
            created += 1;
        }
        created
    }

    fn next_epoch(&mut self) -> usize {
        let pruned = self.population.prune_orphans().len();
        self.roots = self.population.roots();
        self.population
            .retain_outcomes(&self.config.trainer.retained_tasks);
        self.tasks.clear();
        self.generation += 1;
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionSet;

    fn small_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.trainer.team_pop_size = 20;
        config.trainer.seed = Some(9);
        config.trainer.actions = ActionSet::Discrete(vec![0, 1, 2]);
        config.program.input_size = 4;
        config
    }

    #[test]
    fn test_initial_population_is_all_roots() {
        let trainer = Trainer::new(small_config()).unwrap();
        assert_eq!(trainer.roots().len(), 20);
        assert_eq!(trainer.population().team_count(), 20);
        for team in trainer.population().team_ids() {
            trainer.population().assert_team_invariants(team);
        }
    }

    #[test]
    fn test_evolve_without_outcomes_fails_cleanly() {
        let mut trainer = Trainer::new(small_config()).unwrap();
        let before = trainer.population().team_ids();
        let result = trainer.evolve(&["reach".to_string()], ScoringMode::Single);
        assert!(matches!(result, Err(TpgError::MissingOutcome { .. })));
        assert_eq!(trainer.population().team_ids(), before);
        assert_eq!(trainer.generation(), 0);
    }

    #[test]
    fn test_evolve_without_any_task_is_rejected() {
        let mut trainer = Trainer::new(small_config()).unwrap();
        assert!(matches!(
            trainer.evolve(&[], ScoringMode::Average),
            Err(TpgError::Configuration(_))
        ));
    }

    #[test]
    fn test_skip_tasks_filters_done_agents() {
        let mut trainer = Trainer::new(small_config()).unwrap();
        let first = trainer.roots()[0];
        trainer.report_outcome(first, "reach", 1.0).unwrap();
        let query = AgentQuery {
            skip_tasks: vec!["reach".to_string()],
            ..Default::default()
        };
        let agents = trainer.get_agents(&query);
        assert_eq!(agents.len(), 19);
        assert!(agents.iter().all(|a| a.team_id() != first));
    }
}
