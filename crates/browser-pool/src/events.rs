/// Best-effort observability stream (SPEC_FULL.md §4.1 SUPPLEMENT), grounded
/// in `riptide-headless::pool::PoolEvent`.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    InstanceLaunched { id: u64 },
    InstanceRetired { id: u64 },
    InstanceKilled { id: u64 },
    TabOpened { instance_id: u64 },
    TabClosed { instance_id: u64 },
}

/// Point-in-time snapshot, grounded in `riptide-headless::pool::PoolStats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserPoolStats {
    pub active_instances: usize,
    pub retired_instances: usize,
    pub total_pages_opened: u64,
}
