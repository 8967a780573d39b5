use std::time::Duration;

/// Period of the memory/CPU autoscaling tick (spec §4.2 "Constants").
pub const MEM_CHECK_INTERVAL: Duration = Duration::from_millis(200);

/// Scale-up is attempted once every this many ticks (every 10s at 200ms/tick).
pub const SCALE_UP_INTERVAL: u64 = 50;

/// Largest single scale-up step.
pub const SCALE_UP_MAX_STEP: u64 = 10;

/// Scale-down is attempted once every this many ticks (every 1s at 200ms/tick).
pub const SCALE_DOWN_INTERVAL: u64 = 5;

/// Structured info log cadence: `6 * SCALE_UP_INTERVAL`.
pub const LOG_INFO_INTERVAL: u64 = 6 * SCALE_UP_INTERVAL;

/// Hard floor used in scale-up's headroom estimation, distinct from the
/// configurable `minFreeMemoryRatio` scale-down threshold.
pub const MIN_FREE_MEMORY_RATIO: f64 = 0.1;
