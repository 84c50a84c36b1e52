pub mod agent;
pub mod checkpoint;
pub mod progress;
pub mod scoring;
pub mod trainer;

pub use agent::{Agent, AgentScore, TaskRegistry};
pub use progress::{ConsoleProgressCallback, ProgressCallback, SilentProgressCallback};
pub use scoring::ScoringMode;
pub use trainer::{AgentQuery, GenerationSummary, Trainer};
