use super::{
    mutation::MutationConfig,
    program::ProgramConfig,
    trainer::TrainerConfig,
    traits::ConfigSection,
};
use crate::error::TpgError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub trainer: TrainerConfig,
    pub program: ProgramConfig,
    pub mutation: MutationConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), TpgError> {
        self.trainer.validate()?;
        self.program.validate()?;
        self.mutation.validate()?;
        // Learner mutation repeats until something changes; with one code and
        // no program mutation an atomic learner may have nothing left to change.
        if self.mutation.p_program_mutate == 0.0 && self.trainer.actions.len() < 2 {
            return Err(TpgError::Configuration(
                "p_program_mutate must be positive when the action set has a single code".to_string()
            ));
        }
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Layer a TOML/JSON file under `TPG__SECTION__FIELD` environment overrides.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TpgError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("TPG").separator("__"))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        log::debug!("Loaded configuration from {}", path.as_ref().display());
        *self.write_lock()? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TpgError> {
        let config = self.get()?;
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| TpgError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn get(&self) -> Result<AppConfig, TpgError> {
        self.config
            .read()
            .map(|c| c.clone())
            .map_err(|_| TpgError::Configuration("Config lock poisoned".to_string()))
    }

    pub fn update<F>(&self, f: F) -> Result<(), TpgError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.write_lock()?;
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, AppConfig>, TpgError> {
        self.config
            .write()
            .map_err(|_| TpgError::Configuration("Config lock poisoned".to_string()))
    }
}
