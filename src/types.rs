use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable arena key of a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u64);

/// Stable arena key of a learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LearnerId(pub u64);

/// Identity of one program version; changes on every mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub u64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Terminal decision value handed back to the environment driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionCode {
    Discrete(i64),
    Real(Vec<f64>),
}

impl ActionCode {
    pub fn as_discrete(&self) -> Option<i64> {
        match self {
            ActionCode::Discrete(code) => Some(*code),
            ActionCode::Real(_) => None,
        }
    }
}

/// The atomic codes a population may emit, fixed at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSet {
    Discrete(Vec<i64>),
    Real(Vec<Vec<f64>>),
}

impl ActionSet {
    pub fn len(&self) -> usize {
        match self {
            ActionSet::Discrete(codes) => codes.len(),
            ActionSet::Real(codes) => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<ActionCode> {
        match self {
            ActionSet::Discrete(codes) => codes.get(index).copied().map(ActionCode::Discrete),
            ActionSet::Real(codes) => codes.get(index).cloned().map(ActionCode::Real),
        }
    }

    /// Uniformly pick one code. Panics on an empty set, which construction rejects.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ActionCode {
        let index = rng.gen_range(0..self.len());
        self.get(index).expect("index drawn from set length")
    }

    /// Uniformly pick a code other than `current`, if the set has one
    pub fn sample_excluding<R: Rng>(&self, current: &ActionCode, rng: &mut R) -> Option<ActionCode> {
        let others: Vec<ActionCode> = (0..self.len())
            .filter_map(|i| self.get(i))
            .filter(|code| code != current)
            .collect();
        others.choose(rng).cloned()
    }
}

impl Default for ActionSet {
    fn default() -> Self {
        ActionSet::Discrete(vec![0, 1])
    }
}

/// Hands out fresh ids for every arena object.
///
/// Owned by the trainer and threaded into every constructor, so two trainers
/// in one process never share a counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next_team: u64,
    next_learner: u64,
    next_program: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(&mut self) -> TeamId {
        let id = TeamId(self.next_team);
        self.next_team += 1;
        id
    }

    pub fn learner(&mut self) -> LearnerId {
        let id = LearnerId(self.next_learner);
        self.next_learner += 1;
        id
    }

    pub fn program(&mut self) -> ProgramId {
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        id
    }
}
