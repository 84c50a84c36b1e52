pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod program;

pub use instruction::{Instruction, InstructionSet, Mode, Operation};
pub use interpreter::{clamp, execute};
pub use memory::{MemorySnapshot, SharedMemory};
pub use program::Program;
