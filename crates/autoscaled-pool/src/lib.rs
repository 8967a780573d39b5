//! Adaptive scheduler that launches asynchronous user tasks in parallel,
//! continuously adjusting concurrency from memory and CPU load signals.
//!
//! See `pool::AutoscaledPool` for the entry point.

mod config;
mod constants;
mod pool;
mod stats;
mod traits;

#[cfg(test)]
mod test_support;

pub use config::AutoscaledPoolConfig;
pub use constants::{
    LOG_INFO_INTERVAL, MEM_CHECK_INTERVAL, MIN_FREE_MEMORY_RATIO, SCALE_DOWN_INTERVAL,
    SCALE_UP_INTERVAL, SCALE_UP_MAX_STEP,
};
pub use pool::AutoscaledPool;
pub use stats::AutoscaledPoolStats;
pub use traits::{IsFinishedFunction, IsTaskReadyFunction, RunTaskFunction};
