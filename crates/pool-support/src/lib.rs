//! Shared plumbing for `browser-pool` and `autoscaled-pool`.
//!
//! This crate is deliberately the "~10%" in spec.md's relative-share table:
//! a shared error type, a bounded history ring, and thin adapters over the
//! external collaborators (`MemoryProbe`, `CpuEventBus`, `OsProcessHandle`)
//! that both pools depend on but that are themselves out of the pools' hard
//! engineering scope.

pub mod cpu_bus;
pub mod error;
pub mod memory;
pub mod process;
pub mod ring;

pub use cpu_bus::{CpuEventBus, CpuInfo};
pub use error::{PoolError, Result};
pub use memory::{MemoryProbe, MemorySample, SystemMemoryProbe};
pub use process::OsProcessHandle;
pub use ring::RingBuffer;
