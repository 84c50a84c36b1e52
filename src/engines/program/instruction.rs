use crate::config::{InstructionSetKind, ProgramConfig};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Where an instruction reads its source operand from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Register,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Sub,
    Double,
    Half,
    /// -x when x < y, otherwise x
    ConditionalNegate,
    Cos,
    /// ln(y) when y > 0, otherwise x
    Log,
    Exp,
    MemoryRead,
    MemoryWrite,
}

const MINIMAL: &[Operation] = &[
    Operation::Add,
    Operation::Sub,
    Operation::Double,
    Operation::Half,
    Operation::ConditionalNegate,
];

const FULL: &[Operation] = &[
    Operation::Add,
    Operation::Sub,
    Operation::Double,
    Operation::Half,
    Operation::ConditionalNegate,
    Operation::Cos,
    Operation::Log,
    Operation::Exp,
];

const MEMORY: &[Operation] = &[
    Operation::Add,
    Operation::Sub,
    Operation::Double,
    Operation::Half,
    Operation::ConditionalNegate,
    Operation::Cos,
    Operation::Log,
    Operation::Exp,
    Operation::MemoryRead,
    Operation::MemoryWrite,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub mode: Mode,
    pub op: Operation,
    pub dest: usize,
    pub src: usize,
}

impl Instruction {
    pub fn new(mode: Mode, op: Operation, dest: usize, src: usize) -> Self {
        Self { mode, op, dest, src }
    }
}

/// Operations available to every program of one population
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionSet {
    kind: InstructionSetKind,
}

impl InstructionSet {
    pub fn new(kind: InstructionSetKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> InstructionSetKind {
        self.kind
    }

    pub fn operations(&self) -> &'static [Operation] {
        match self.kind {
            InstructionSetKind::Minimal => MINIMAL,
            InstructionSetKind::Full => FULL,
            InstructionSetKind::Memory => MEMORY,
        }
    }

    pub fn uses_memory(&self) -> bool {
        self.kind == InstructionSetKind::Memory
    }

    pub fn random_operation<R: Rng>(&self, rng: &mut R) -> Operation {
        *self
            .operations()
            .choose(rng)
            .unwrap_or(&Operation::Add)
    }

    pub fn random_instruction<R: Rng>(&self, config: &ProgramConfig, rng: &mut R) -> Instruction {
        let mode = if rng.gen::<bool>() { Mode::Register } else { Mode::Input };
        Instruction {
            mode,
            op: self.random_operation(rng),
            dest: rng.gen_range(0..config.register_count),
            src: rng.gen_range(0..source_range(config)),
        }
    }

    /// Rewrite one randomly chosen field of `instruction`.
    pub fn flip_field<R: Rng>(&self, instruction: &mut Instruction, config: &ProgramConfig, rng: &mut R) {
        match rng.gen_range(0..4) {
            0 => {
                instruction.mode = match instruction.mode {
                    Mode::Register => Mode::Input,
                    Mode::Input => Mode::Register,
                }
            }
            1 => instruction.op = self.random_operation(rng),
            2 => instruction.dest = rng.gen_range(0..config.register_count),
            _ => instruction.src = rng.gen_range(0..source_range(config)),
        }
    }
}

fn source_range(config: &ProgramConfig) -> usize {
    config.input_size.max(config.register_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sets_are_nested() {
        let minimal = InstructionSet::new(InstructionSetKind::Minimal);
        let memory = InstructionSet::new(InstructionSetKind::Memory);
        assert_eq!(minimal.operations().len(), 5);
        assert!(minimal.operations().iter().all(|op| memory.operations().contains(op)));
        assert!(memory.uses_memory());
        assert!(!minimal.uses_memory());
    }

    #[test]
    fn test_random_instruction_respects_set_and_ranges() {
        let set = InstructionSet::new(InstructionSetKind::Minimal);
        let config = ProgramConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let inst = set.random_instruction(&config, &mut rng);
            assert!(set.operations().contains(&inst.op));
            assert!(inst.dest < config.register_count);
            assert!(inst.src < config.input_size);
        }
    }
}
