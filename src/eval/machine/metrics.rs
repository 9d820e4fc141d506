//! Machine metrics

use std::cmp::max;

/// Record some metrics as we execute code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    ticks: u64,
    allocs: u64,
    max_args: usize,
    max_returns: usize,
    max_updates: usize,
}

impl Metrics {
    pub fn tick(&mut self) {
        self.ticks += 1;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn alloc(&mut self, count: usize) {
        self.allocs += count as u64;
    }

    pub fn allocs(&self) -> u64 {
        self.allocs
    }

    pub fn stacks(&mut self, args: usize, returns: usize, updates: usize) {
        self.max_args = max(self.max_args, args);
        self.max_returns = max(self.max_returns, returns);
        self.max_updates = max(self.max_updates, updates);
    }

    pub fn max_args(&self) -> usize {
        self.max_args
    }

    pub fn max_returns(&self) -> usize {
        self.max_returns
    }

    pub fn max_updates(&self) -> usize {
        self.max_updates
    }
}
