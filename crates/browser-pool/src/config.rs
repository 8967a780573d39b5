use std::time::Duration;

/// Configuration for `BrowserPool`, enumerated in spec §4.1.
#[derive(Clone, Debug)]
pub struct BrowserPoolConfig {
    /// Hard cap of concurrent tabs per browser; exceeding it launches a new browser.
    pub max_open_pages_per_instance: u64,
    /// After this many cumulative tabs, the browser is retired.
    pub abort_instance_after_request_count: u64,
    /// Sweep period for the reaper.
    pub instance_killer_interval: Duration,
    /// Max idle time after last tab grant before a retired browser is force-closed
    /// regardless of open tabs.
    pub kill_instance_after: Duration,
    /// Instances to launch eagerly on pool construction (additive convenience
    /// over the spec's lazy-launch path; see SPEC_FULL.md §4.1 SUPPLEMENT).
    pub initial_pool_size: usize,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            max_open_pages_per_instance: 100,
            abort_instance_after_request_count: 150,
            instance_killer_interval: Duration::from_millis(60_000),
            kill_instance_after: Duration::from_millis(300_000),
            initial_pool_size: 0,
        }
    }
}

/// Hard-coded per spec §4.1: time a kill grants a cooperative `close()` before
/// a SIGKILL of the OS process is forced.
pub const PROCESS_KILL_TIMEOUT: Duration = Duration::from_millis(5_000);
