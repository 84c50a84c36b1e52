pub mod traits;
pub mod trainer;
pub mod program;
pub mod mutation;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use trainer::TrainerConfig;
pub use program::{ProgramConfig, InstructionSetKind};
pub use mutation::MutationConfig;
