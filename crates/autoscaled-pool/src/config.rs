use crate::traits::{IsFinishedFunction, IsTaskReadyFunction, RunTaskFunction};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for `AutoscaledPool`, enumerated in spec §4.2.
pub struct AutoscaledPoolConfig {
    pub max_concurrency: u64,
    pub min_concurrency: u64,
    pub max_memory_mbytes: Option<u64>,
    pub min_free_memory_ratio: f64,
    pub maybe_run_interval: Duration,
    pub run_task_function: Arc<dyn RunTaskFunction>,
    pub is_task_ready_function: Option<Arc<dyn IsTaskReadyFunction>>,
    pub is_finished_function: Option<Arc<dyn IsFinishedFunction>>,
}

impl AutoscaledPoolConfig {
    /// Builds a config with spec defaults, given the one required collaborator.
    pub fn new(run_task_function: Arc<dyn RunTaskFunction>) -> Self {
        Self {
            max_concurrency: 1000,
            min_concurrency: 1,
            max_memory_mbytes: None,
            min_free_memory_ratio: 0.2,
            maybe_run_interval: Duration::from_millis(500),
            run_task_function,
            is_task_ready_function: None,
            is_finished_function: None,
        }
    }

    /// `min(minConcurrency, maxConcurrency)` clamp called out in spec §4.2.
    pub(crate) fn initial_concurrency(&self) -> u64 {
        self.min_concurrency.min(self.max_concurrency)
    }
}
