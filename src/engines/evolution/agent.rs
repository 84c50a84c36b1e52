use crate::engines::graph::{ExecutionContext, Population};
use crate::error::Result;
use crate::types::{ActionCode, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

/// Task names reported during the current generation.
///
/// Agents evaluated on worker threads register into it concurrently, hence
/// the lock.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    names: Mutex<BTreeSet<String>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I: IntoIterator<Item = String>>(names: I) -> Self {
        Self {
            names: Mutex::new(names.into_iter().collect()),
        }
    }

    pub fn register(&self, task: &str) {
        let mut names = self.names.lock().unwrap_or_else(|e| e.into_inner());
        if !names.contains(task) {
            names.insert(task.to_string());
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.names.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// Outcomes gathered by one agent, ready to merge back into the trainer.
/// Serializable so evaluation can happen in another process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentScore {
    pub team: TeamId,
    pub outcomes: HashMap<String, f64>,
}

/// A root team handed to an environment driver.
///
/// Borrows the population read-only; rewards are kept on the agent until
/// the trainer merges them with `Trainer::apply_scores`.
pub struct Agent<'a> {
    team: TeamId,
    population: &'a Population,
    tasks: &'a TaskRegistry,
    previous: HashMap<String, f64>,
    reported: HashMap<String, f64>,
    context: ExecutionContext,
}

impl<'a> Agent<'a> {
    pub(crate) fn new(
        team: TeamId,
        population: &'a Population,
        tasks: &'a TaskRegistry,
        context: ExecutionContext,
    ) -> Self {
        let previous = population
            .team(team)
            .map(|t| t.outcomes().clone())
            .unwrap_or_default();
        Self {
            team,
            population,
            tasks,
            previous,
            reported: HashMap::new(),
            context,
        }
    }

    pub fn team_id(&self) -> TeamId {
        self.team
    }

    pub fn act(&mut self, state: &[f64]) -> Result<ActionCode> {
        self.population.act(self.team, state, &mut self.context)
    }

    /// Record (overwrite) the outcome for `task`
    pub fn reward(&mut self, task: &str, value: f64) {
        self.tasks.register(task);
        self.reported.insert(task.to_string(), value);
    }

    /// True when an outcome for `task` is already known, from this
    /// evaluation or retained from an earlier generation
    pub fn is_task_done(&self, task: &str) -> bool {
        self.reported.contains_key(task) || self.previous.contains_key(task)
    }

    /// Zero register files between episodes
    pub fn reset(&mut self) {
        self.context.reset();
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn into_score(self) -> AgentScore {
        AgentScore {
            team: self.team,
            outcomes: self.reported,
        }
    }
}
