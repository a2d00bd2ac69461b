// Per-job step timing
//
// Each job carries its own AttackMetrics through the strategy pipeline and logs it once when
// the job finishes; nothing is shared between jobs.

use indexmap::IndexMap;
use std::time::Duration;

/// Run count and accumulated wall time of one strategy step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepTimer {
    pub count: u32,
    pub elapsed: Duration,
}

impl StepTimer {
    /// Average time per run
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.elapsed / self.count
        }
    }
}

/// Step timings of one cracking job, in the order the steps first ran
#[derive(Debug, Clone, Default)]
pub struct AttackMetrics {
    steps: IndexMap<&'static str, StepTimer>,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one run of `step`
    pub fn record_step(&mut self, step: &'static str, elapsed: Duration) {
        let timer = self.steps.entry(step).or_default();
        timer.count += 1;
        timer.elapsed += elapsed;
    }

    pub fn step(&self, step: &str) -> Option<StepTimer> {
        self.steps.get(step).copied()
    }

    /// Names of the steps that ran, in order
    pub fn steps(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.keys().copied()
    }

    pub fn total(&self) -> Duration {
        self.steps.values().map(|t| t.elapsed).sum()
    }

    /// Log the step summary
    pub fn log_summary(&self, capture: &str) {
        for (name, timer) in &self.steps {
            tracing::debug!(
                "Timer {} [{}]: {:.2} sec avg over {} run(s)",
                name,
                capture,
                timer.average().as_secs_f64(),
                timer.count
            );
        }
        tracing::debug!(
            "Total strategy time for {}: {:.2} sec",
            capture,
            self.total().as_secs_f64()
        );
    }
}
