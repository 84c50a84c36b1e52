use super::instruction::{Instruction, InstructionSet};
use super::interpreter;
use super::memory::SharedMemory;
use crate::config::{MutationConfig, ProgramConfig};
use crate::types::{IdAllocator, ProgramId};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Linear register-machine program.
///
/// Equality compares instructions only; `id` changes whenever the
/// instructions do, so two equal programs may carry different ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    id: ProgramId,
    instructions: Vec<Instruction>,
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.instructions == other.instructions
    }
}

impl Program {
    pub fn new(ids: &mut IdAllocator, instructions: Vec<Instruction>) -> Self {
        Self {
            id: ids.program(),
            instructions,
        }
    }

    pub fn random<R: Rng>(
        ids: &mut IdAllocator,
        set: &InstructionSet,
        config: &ProgramConfig,
        rng: &mut R,
    ) -> Self {
        let len = rng.gen_range(1..=config.init_max_program_size);
        let instructions = (0..len)
            .map(|_| set.random_instruction(config, rng))
            .collect();
        Self::new(ids, instructions)
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Same instructions under a fresh identity
    pub fn duplicate(&self, ids: &mut IdAllocator) -> Self {
        Self::new(ids, self.instructions.clone())
    }

    pub fn execute<R: Rng>(
        &self,
        input: &[f64],
        registers: &mut [f64],
        memory: Option<&SharedMemory>,
        rng: &mut R,
    ) -> f64 {
        interpreter::execute(&self.instructions, input, registers, memory, rng)
    }

    /// Apply delete/insert/flip/swap until the instructions differ from
    /// their state on entry, then take a new id.
    pub fn mutate<R: Rng>(
        &mut self,
        ids: &mut IdAllocator,
        set: &InstructionSet,
        program: &ProgramConfig,
        mutation: &MutationConfig,
        rng: &mut R,
    ) {
        let original = self.instructions.clone();

        loop {
            if self.instructions.len() > 1 && rng.gen::<f64>() < mutation.p_inst_delete {
                let idx = rng.gen_range(0..self.instructions.len());
                self.instructions.remove(idx);
            }

            if self.instructions.len() < program.max_program_size
                && rng.gen::<f64>() < mutation.p_inst_add
            {
                let idx = rng.gen_range(0..=self.instructions.len());
                let inst = set.random_instruction(program, rng);
                self.instructions.insert(idx, inst);
            }

            if !self.instructions.is_empty() && rng.gen::<f64>() < mutation.p_inst_mutate {
                let idx = rng.gen_range(0..self.instructions.len());
                set.flip_field(&mut self.instructions[idx], program, rng);
            }

            if self.instructions.len() > 1 && rng.gen::<f64>() < mutation.p_inst_swap {
                let a = rng.gen_range(0..self.instructions.len());
                let b = rng.gen_range(0..self.instructions.len());
                self.instructions.swap(a, b);
            }

            if self.instructions != original {
                break;
            }
        }

        self.id = ids.program();
    }
}
