use crate::config::{MutationConfig, ProgramConfig};
use crate::engines::program::InstructionSet;
use crate::types::{ActionSet, IdAllocator};
use rand::Rng;

/// Everything the learner and team operators need from the trainer,
/// borrowed for the length of one reproduction step.
pub struct Variation<'a, R: Rng> {
    pub ids: &'a mut IdAllocator,
    pub rng: &'a mut R,
    pub instruction_set: &'a InstructionSet,
    pub program: &'a ProgramConfig,
    pub mutation: &'a MutationConfig,
    pub actions: &'a ActionSet,
    pub generation: u64,
}
