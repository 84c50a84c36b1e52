pub mod evolution;
pub mod graph;
pub mod program;
