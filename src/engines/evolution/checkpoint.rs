use super::agent::TaskRegistry;
use super::trainer::Trainer;
use crate::config::AppConfig;
use crate::engines::graph::{Learner, Population, Team};
use crate::engines::program::{InstructionSet, MemorySnapshot, SharedMemory};
use crate::error::{Result, TpgError};
use crate::types::{IdAllocator, TeamId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Everything needed to resume a trainer. The rng is not stored; a restored
/// trainer reseeds from the configured seed and the generation counter.
#[derive(Debug, Serialize, Deserialize)]
struct Checkpoint {
    config: AppConfig,
    generation: u64,
    ids: IdAllocator,
    teams: Vec<Team>,
    learners: Vec<Learner>,
    roots: Vec<TeamId>,
    elites: Vec<TeamId>,
    tasks: Vec<String>,
    memory: Option<MemorySnapshot>,
}

impl Trainer {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let (teams, learners) = self.population.clone().into_parts();
        let checkpoint = Checkpoint {
            config: self.config.clone(),
            generation: self.generation,
            ids: self.ids.clone(),
            teams,
            learners,
            roots: self.roots.clone(),
            elites: self.elites.clone(),
            tasks: self.tasks.names(),
            memory: self.memory.as_ref().map(|m| m.snapshot()),
        };

        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(&mut writer, &checkpoint)?;
        writer.flush()?;
        log::info!(
            "Saved generation {} ({} teams) to {}",
            self.generation,
            self.population.team_count(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let checkpoint: Checkpoint = serde_json::from_reader(reader)?;
        checkpoint.config.validate()?;

        let population = Population::from_parts(checkpoint.teams, checkpoint.learners)?;
        let stored: BTreeSet<TeamId> = checkpoint.roots.iter().copied().collect();
        let actual: BTreeSet<TeamId> = population.roots().into_iter().collect();
        if stored != actual {
            return Err(TpgError::Checkpoint(format!(
                "stored root set {:?} does not match graph roots {:?}",
                stored, actual
            )));
        }

        let instruction_set = InstructionSet::new(checkpoint.config.program.instruction_set);
        let memory = match checkpoint.memory {
            Some(snapshot) => Some(Arc::new(SharedMemory::from_snapshot(snapshot))),
            None if instruction_set.uses_memory() => Some(Arc::new(SharedMemory::new(
                checkpoint.config.program.memory_rows,
                checkpoint.config.program.memory_cols,
            ))),
            None => None,
        };

        let mut rng = Trainer::make_rng(checkpoint.config.trainer.seed, checkpoint.generation);
        let seed_base = checkpoint.config.trainer.seed.unwrap_or_else(|| rng.gen());

        log::info!(
            "Loaded generation {} ({} teams) from {}",
            checkpoint.generation,
            population.team_count(),
            path.as_ref().display()
        );
        Ok(Trainer {
            config: checkpoint.config,
            instruction_set,
            population,
            ids: checkpoint.ids,
            roots: checkpoint.roots,
            elites: checkpoint.elites,
            generation: checkpoint.generation,
            tasks: TaskRegistry::from_names(checkpoint.tasks),
            memory,
            rng,
            seed_base,
        })
    }
}
