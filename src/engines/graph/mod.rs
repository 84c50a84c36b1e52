pub mod action;
pub mod context;
pub mod learner;
pub mod population;
pub mod team;
pub mod variation;

pub use action::Action;
pub use context::ExecutionContext;
pub use learner::Learner;
pub use population::Population;
pub use team::Team;
pub use variation::Variation;
