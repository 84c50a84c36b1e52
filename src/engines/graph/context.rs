use crate::engines::program::{Program, SharedMemory};
use crate::types::LearnerId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-agent evaluation state.
///
/// Register files and the per-frame bid cache live here rather than on the
/// learners, so agents that share a learner can run on separate threads
/// without touching the same registers.
#[derive(Debug)]
pub struct ExecutionContext {
    frame: u64,
    register_count: usize,
    persistent_registers: bool,
    registers: HashMap<LearnerId, Vec<f64>>,
    bids: HashMap<LearnerId, (u64, f64)>,
    memory: Option<Arc<SharedMemory>>,
    rng: StdRng,
}

impl ExecutionContext {
    pub fn new(
        register_count: usize,
        persistent_registers: bool,
        memory: Option<Arc<SharedMemory>>,
        seed: u64,
    ) -> Self {
        Self {
            frame: 0,
            register_count,
            persistent_registers,
            registers: HashMap::new(),
            bids: HashMap::new(),
            memory,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Start a new decision step; bids from earlier frames go stale.
    pub fn begin_frame(&mut self) -> u64 {
        self.frame += 1;
        self.frame
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn cached_bid(&self, learner: LearnerId) -> Option<f64> {
        match self.bids.get(&learner) {
            Some(&(frame, bid)) if frame == self.frame => Some(bid),
            _ => None,
        }
    }

    pub fn store_bid(&mut self, learner: LearnerId, bid: f64) {
        self.bids.insert(learner, (self.frame, bid));
    }

    pub fn registers(&self, learner: LearnerId) -> Option<&[f64]> {
        self.registers.get(&learner).map(|r| r.as_slice())
    }

    /// Zero every register file, e.g. between episodes
    pub fn reset(&mut self) {
        self.registers.clear();
        self.bids.clear();
    }

    pub(crate) fn run_program(&mut self, learner: LearnerId, program: &Program, input: &[f64]) -> f64 {
        let count = self.register_count;
        let registers = self
            .registers
            .entry(learner)
            .or_insert_with(|| vec![0.0; count]);
        if !self.persistent_registers {
            registers.iter_mut().for_each(|r| *r = 0.0);
        }
        program.execute(input, registers, self.memory.as_deref(), &mut self.rng)
    }
}
