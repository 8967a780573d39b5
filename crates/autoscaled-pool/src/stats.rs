/// Point-in-time snapshot, grounded in `riptide-workers::worker::WorkerStats`
/// (SPEC_FULL.md §4.2 SUPPLEMENT). Taking a snapshot never interferes with
/// the scaling locks: it's a single short-lived lock of the same state the
/// scaling tick already guards.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoscaledPoolStats {
    pub concurrency: u64,
    pub running_count: u64,
    pub tick_counter: u64,
    pub last_free_bytes: Option<u64>,
    pub last_total_bytes: Option<u64>,
}
