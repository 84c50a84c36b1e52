use super::traits::ConfigSection;
use crate::error::TpgError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    pub instruction_set: InstructionSetKind,
    pub register_count: usize,
    /// Upper bound for generated source indices; usually the observation length
    pub input_size: usize,
    pub init_max_program_size: usize,
    pub max_program_size: usize,
    /// Keep register contents between frames (recurrent policies)
    pub persistent_registers: bool,
    pub memory_rows: usize,
    pub memory_cols: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionSetKind {
    Minimal,
    Full,
    Memory,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            instruction_set: InstructionSetKind::Minimal,
            register_count: 8,
            input_size: 64,
            init_max_program_size: 10,
            max_program_size: 96,
            persistent_registers: true,
            memory_rows: 100,
            memory_cols: 8,
        }
    }
}

impl ConfigSection for ProgramConfig {
    fn section_name() -> &'static str {
        "program"
    }

    fn validate(&self) -> Result<(), TpgError> {
        if self.register_count == 0 {
            return Err(TpgError::Configuration(
                "Register count must be positive".to_string()
            ));
        }
        if self.input_size == 0 {
            return Err(TpgError::Configuration(
                "Input size must be positive".to_string()
            ));
        }
        if self.init_max_program_size == 0 || self.max_program_size < self.init_max_program_size {
            return Err(TpgError::Configuration(format!(
                "Program sizes must satisfy 1 <= init ({}) <= max ({})",
                self.init_max_program_size, self.max_program_size
            )));
        }
        if self.instruction_set == InstructionSetKind::Memory
            && (self.memory_rows == 0 || self.memory_cols == 0)
        {
            return Err(TpgError::Configuration(
                "Memory instruction set needs a non-empty memory matrix".to_string()
            ));
        }
        Ok(())
    }
}
