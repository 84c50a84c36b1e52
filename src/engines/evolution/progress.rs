use super::trainer::GenerationSummary;

/// Hooks called by `Trainer::run` around each generation
pub trait ProgressCallback {
    fn on_generation_start(&mut self, generation: u64);
    fn on_agents_evaluated(&mut self, generation: u64, agents: usize);
    fn on_generation_complete(&mut self, summary: &GenerationSummary);
}

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: u64) {
        println!("Generation {} starting...", generation);
    }

    fn on_agents_evaluated(&mut self, _generation: u64, agents: usize) {
        println!("  Evaluated {} agents", agents);
    }

    fn on_generation_complete(&mut self, summary: &GenerationSummary) {
        println!(
            "Generation {} complete. Best fitness: {:.4}, teams: {}, learners: {}, roots: {}",
            summary.generation, summary.best_fitness, summary.teams, summary.learners, summary.roots
        );
    }
}

/// Discards every event
pub struct SilentProgressCallback;

impl ProgressCallback for SilentProgressCallback {
    fn on_generation_start(&mut self, _generation: u64) {}
    fn on_agents_evaluated(&mut self, _generation: u64, _agents: usize) {}
    fn on_generation_complete(&mut self, _summary: &GenerationSummary) {}
}
