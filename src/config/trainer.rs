use super::traits::{check_probability, ConfigSection};
use crate::error::TpgError;
use crate::types::ActionSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Target number of teams (or root teams, see `root_based_population`)
    pub team_pop_size: usize,
    /// Fraction of root teams deleted each generation
    pub gap: f64,
    /// Protect the best root team of every task from deletion
    pub elitist: bool,
    pub root_based_population: bool,
    /// Outcomes for these tasks survive the epoch rollover
    pub retained_tasks: Vec<String>,
    pub seed: Option<u64>,
    pub actions: ActionSet,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            team_pop_size: 360,
            gap: 0.5,
            elitist: true,
            root_based_population: true,
            retained_tasks: Vec::new(),
            seed: None,
            actions: ActionSet::default(),
        }
    }
}

impl ConfigSection for TrainerConfig {
    fn section_name() -> &'static str {
        "trainer"
    }

    fn validate(&self) -> Result<(), TpgError> {
        if self.team_pop_size == 0 {
            return Err(TpgError::Configuration(
                "Team population size must be positive".to_string()
            ));
        }
        if self.actions.is_empty() {
            return Err(TpgError::Configuration(
                "Action set must contain at least one code".to_string()
            ));
        }
        if let ActionSet::Real(codes) = &self.actions {
            let width = codes[0].len();
            if width == 0 || codes.iter().any(|c| c.len() != width) {
                return Err(TpgError::Configuration(
                    "Real action codes must share a non-zero width".to_string()
                ));
            }
        }
        check_probability(Self::section_name(), "gap", self.gap)?;
        Ok(())
    }
}
