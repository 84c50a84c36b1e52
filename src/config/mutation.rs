use super::traits::{check_probability, ConfigSection};
use crate::error::TpgError;
use serde::{Deserialize, Serialize};

/// Probabilities for the team, learner and program variation operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    pub p_learner_delete: f64,
    pub p_learner_add: f64,
    pub p_learner_mutate: f64,
    pub p_program_mutate: f64,
    pub p_action_mutate: f64,
    /// Chance a replaced action is atomic rather than a team reference
    pub p_action_atomic: f64,
    pub p_inst_delete: f64,
    pub p_inst_add: f64,
    pub p_inst_swap: f64,
    pub p_inst_mutate: f64,
    /// Every `rampant_gen` generations the team operator repeats; 0 disables
    pub rampant_gen: usize,
    pub rampant_min: usize,
    pub rampant_max: usize,
    /// 0 means unbounded
    pub max_team_size: usize,
    pub init_max_team_size: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            p_learner_delete: 0.7,
            p_learner_add: 0.6,
            p_learner_mutate: 0.2,
            p_program_mutate: 0.1,
            p_action_mutate: 0.1,
            p_action_atomic: 0.95,
            p_inst_delete: 0.5,
            p_inst_add: 0.5,
            p_inst_swap: 0.5,
            p_inst_mutate: 0.9,
            rampant_gen: 0,
            rampant_min: 1,
            rampant_max: 1,
            max_team_size: 0,
            init_max_team_size: 5,
        }
    }
}

impl MutationConfig {
    /// Number of times the team operator runs in `generation`
    pub fn rampant_repetitions<R: rand::Rng>(&self, generation: u64, rng: &mut R) -> usize {
        if self.rampant_gen > 0 && generation > 0 && generation % self.rampant_gen as u64 == 0 {
            rng.gen_range(self.rampant_min..=self.rampant_max)
        } else {
            1
        }
    }
}

impl ConfigSection for MutationConfig {
    fn section_name() -> &'static str {
        "mutation"
    }

    fn validate(&self) -> Result<(), TpgError> {
        let section = Self::section_name();
        for (name, value) in [
            ("p_learner_delete", self.p_learner_delete),
            ("p_learner_add", self.p_learner_add),
            ("p_learner_mutate", self.p_learner_mutate),
            ("p_program_mutate", self.p_program_mutate),
            ("p_action_mutate", self.p_action_mutate),
            ("p_action_atomic", self.p_action_atomic),
            ("p_inst_delete", self.p_inst_delete),
            ("p_inst_add", self.p_inst_add),
            ("p_inst_swap", self.p_inst_swap),
            ("p_inst_mutate", self.p_inst_mutate),
        ] {
            check_probability(section, name, value)?;
        }
        // Both mutation loops repeat until something changes.
        if self.p_program_mutate == 0.0 && self.p_action_mutate == 0.0 {
            return Err(TpgError::Configuration(
                "One of p_program_mutate or p_action_mutate must be positive".to_string()
            ));
        }
        if self.p_inst_mutate == 0.0 {
            return Err(TpgError::Configuration(
                "p_inst_mutate must be positive".to_string()
            ));
        }
        if self.rampant_gen > 0 && (self.rampant_min == 0 || self.rampant_min > self.rampant_max) {
            return Err(TpgError::Configuration(format!(
                "Rampant range must satisfy 1 <= min ({}) <= max ({})",
                self.rampant_min, self.rampant_max
            )));
        }
        if self.init_max_team_size < 2 {
            return Err(TpgError::Configuration(
                "Initial team size must allow at least 2 learners".to_string()
            ));
        }
        if self.max_team_size != 0 && self.max_team_size < 2 {
            return Err(TpgError::Configuration(
                "Maximum team size must be 0 (unbounded) or at least 2".to_string()
            ));
        }
        Ok(())
    }
}
