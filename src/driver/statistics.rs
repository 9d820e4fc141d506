//! Capture and report statistics for a run

use std::{fmt::Display, time::Duration};

use indexmap::IndexMap;

use crate::eval::machine::metrics::Metrics;

/// Wall-clock time spent in each phase of a run
#[derive(Default, Debug)]
pub struct Timings {
    phases: IndexMap<String, Duration>,
}

impl Timings {
    pub fn record<T: AsRef<str>>(&mut self, phase: T, elapsed: Duration) {
        self.phases.insert(phase.as_ref().to_string(), elapsed);
    }
}

impl Display for Timings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (phase, elapsed) in &self.phases {
            let millis = elapsed.as_secs_f64() * 1e3;
            writeln!(f, "{:<12}{:>10.3}ms", phase, millis)?;
        }
        Ok(())
    }
}

/// The statistics captured during a run
#[derive(Default, Debug)]
pub struct Statistics {
    /// Machine transitions taken
    machine_ticks: u64,
    /// Allocated closure count
    machine_allocs: u64,
    /// Max argument stack height reached
    machine_max_args: usize,
    /// Max return stack height reached
    machine_max_returns: usize,
    /// Max update stack height reached
    machine_max_updates: usize,
    /// Final heap size
    heap_size: usize,
    /// Elapsed timings
    timings: Timings,
}

impl Statistics {
    pub fn ticks(&self) -> u64 {
        self.machine_ticks
    }

    pub fn heap_size(&self) -> usize {
        self.heap_size
    }

    pub fn set_heap_size(&mut self, size: usize) {
        self.heap_size = size;
    }

    pub fn record_metrics(&mut self, metrics: &Metrics) {
        self.machine_ticks = metrics.ticks();
        self.machine_allocs = metrics.allocs();
        self.machine_max_args = metrics.max_args();
        self.machine_max_returns = metrics.max_returns();
        self.machine_max_updates = metrics.max_updates();
    }

    pub fn timings_mut(&mut self) -> &mut Timings {
        &mut self.timings
    }
}

impl Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "steps       : {}", self.machine_ticks)?;
        writeln!(f, "allocations : {}", self.machine_allocs)?;
        writeln!(f, "max args    : {}", self.machine_max_args)?;
        writeln!(f, "max returns : {}", self.machine_max_returns)?;
        writeln!(f, "max updates : {}", self.machine_max_updates)?;
        writeln!(f, "heap size   : {}", self.heap_size)?;
        write!(f, "{}", self.timings)
    }
}
