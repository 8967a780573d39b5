use crate::config::AutoscaledPoolConfig;
use crate::constants::{
    LOG_INFO_INTERVAL, MEM_CHECK_INTERVAL, MIN_FREE_MEMORY_RATIO, SCALE_DOWN_INTERVAL,
    SCALE_UP_INTERVAL, SCALE_UP_MAX_STEP,
};
use crate::stats::AutoscaledPoolStats;
use pool_support::{CpuEventBus, MemoryProbe, PoolError, RingBuffer};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{info, warn};

type Result<T> = std::result::Result<T, PoolError>;

struct State {
    concurrency: u64,
    running_count: u64,
    tick_counter: u64,
    free_bytes_history: RingBuffer<u64>,
    cpu_overload_history: RingBuffer<bool>,
    last_sample: Option<(u64, u64)>,
    finished: bool,
}

impl State {
    fn new(config: &AutoscaledPoolConfig) -> Self {
        let mut cpu_overload_history = RingBuffer::new(SCALE_DOWN_INTERVAL as usize);
        // "Initial ring contains a single false so scale-down is never
        // wrongly triggered at startup" (spec §4.2, CPU signal integration).
        cpu_overload_history.push(false);

        Self {
            concurrency: config.initial_concurrency(),
            running_count: 0,
            tick_counter: 0,
            free_bytes_history: RingBuffer::new(SCALE_UP_INTERVAL as usize),
            cpu_overload_history,
            last_sample: None,
            finished: false,
        }
    }
}

/// Adaptive scheduler that launches user tasks in parallel, continuously
/// resizing concurrency from memory/CPU load signals (spec §1, §4.2).
///
/// Unlike `BrowserPool`'s single-actor-mailbox design, this core's
/// bookkeeping is a handful of scalars guarded by one short-lived
/// `std::sync::Mutex`, never held across an `.await` point — the Rust
/// expression of spec §5's "single-threaded cooperative scheduler" for a
/// component whose actual task futures run as ordinary spawned tasks
/// reporting completion back over a channel, rather than through an owning
/// actor loop (see `riptide-headless::pool::BrowserPool`'s
/// `Arc<Mutex<..>>`/`Arc<RwLock<..>>`-guarded collections for the same
/// pattern in the teacher).
pub struct AutoscaledPool {
    config: AutoscaledPoolConfig,
    memory_probe: Arc<dyn MemoryProbe>,
    cpu_bus: Arc<CpuEventBus>,
    state: Mutex<State>,
}

impl AutoscaledPool {
    pub fn new(
        config: AutoscaledPoolConfig,
        memory_probe: Arc<dyn MemoryProbe>,
        cpu_bus: Arc<CpuEventBus>,
    ) -> Self {
        let state = Mutex::new(State::new(&config));
        Self {
            config,
            memory_probe,
            cpu_bus,
            state,
        }
    }

    pub fn stats(&self) -> AutoscaledPoolStats {
        let state = self.state.lock().unwrap();
        AutoscaledPoolStats {
            concurrency: state.concurrency,
            running_count: state.running_count,
            tick_counter: state.tick_counter,
            last_free_bytes: state.last_sample.map(|(free, _)| free),
            last_total_bytes: state.last_sample.map(|(_, total)| total),
        }
    }

    /// Drives the pool to completion (spec §4.2, `run`). Resolves once the
    /// pool naturally finishes; rejects on the first fatal task failure.
    /// Subscribes to the `CpuEventBus` on entry and unsubscribes on return by
    /// simply dropping its receiver (spec §4.2, "Destroy").
    pub async fn run(&self) -> Result<()> {
        let mut mem_interval = tokio::time::interval(MEM_CHECK_INTERVAL);
        mem_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut safety_interval = tokio::time::interval(self.config.maybe_run_interval);
        safety_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut cpu_rx = self.cpu_bus.subscribe();
        let (settle_tx, mut settle_rx) = mpsc::unbounded_channel::<Result<()>>();

        self.maybe_run_task(&settle_tx).await?;

        while !self.is_finished() {
            tokio::select! {
                _ = mem_interval.tick() => {
                    self.autoscaling_tick().await;
                }
                _ = safety_interval.tick() => {
                    self.maybe_run_task(&settle_tx).await?;
                }
                cpu = cpu_rx.recv() => {
                    if let Ok(info) = cpu {
                        self.state.lock().unwrap().cpu_overload_history.push(info.is_cpu_overloaded);
                    }
                }
                Some(outcome) = settle_rx.recv() => {
                    self.state.lock().unwrap().running_count -= 1;
                    outcome?;
                    self.maybe_run_task(&settle_tx).await?;
                }
            }
        }

        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.state.lock().unwrap().finished
    }

    /// Task launch driver (spec §4.2, `_maybeRunTask`). The spec's "bounded
    /// recursion: at most `concurrency` nested self-invocations" is expressed
    /// here as a loop bounded by the same quantity — each accepted task
    /// increments `running_count`, which is exactly the loop's exit
    /// condition, so it cannot iterate more than `concurrency` times.
    ///
    /// Every call to this pool runs on the single task driving `run()`'s
    /// `select!` loop, so the reentrancy guards `queryingIsTaskReady` /
    /// `queryingIsFinished` from spec §3 have no distinct Rust representation
    /// here: the `select!` loop only ever has one branch body in flight at a
    /// time, which is a stronger guarantee than the spec's own guard flags
    /// provide (see `DESIGN.md`, Open Questions).
    async fn maybe_run_task(&self, settle_tx: &mpsc::UnboundedSender<Result<()>>) -> Result<()> {
        loop {
            let (running, concurrency) = {
                let state = self.state.lock().unwrap();
                (state.running_count, state.concurrency)
            };
            if running >= concurrency {
                self.maybe_finish().await;
                return Ok(());
            }

            let ready = match &self.config.is_task_ready_function {
                Some(f) => match f.is_task_ready().await {
                    Ok(ready) => ready,
                    Err(e) => {
                        warn!(error = %e, "isTaskReadyFunction failed, retrying next tick");
                        self.maybe_finish().await;
                        return Ok(());
                    }
                },
                None => true,
            };
            if !ready {
                self.maybe_finish().await;
                return Ok(());
            }

            let task = match self.config.run_task_function.run_task().await {
                Ok(Some(task)) => task,
                Ok(None) => {
                    self.maybe_finish().await;
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            self.state.lock().unwrap().running_count += 1;
            let settle_tx = settle_tx.clone();
            tokio::spawn(async move {
                let result = task.await;
                let _ = settle_tx.send(result);
            });
        }
    }

    /// Finish driver (spec §4.2, `_maybeFinish`).
    async fn maybe_finish(&self) {
        if self.state.lock().unwrap().running_count > 0 {
            return;
        }

        match &self.config.is_finished_function {
            None => self.state.lock().unwrap().finished = true,
            Some(f) => match f.is_finished().await {
                Ok(true) => self.state.lock().unwrap().finished = true,
                Ok(false) => {}
                Err(e) => warn!(error = %e, "isFinishedFunction failed, retrying next tick"),
            },
        }
    }

    /// Autoscaling tick (spec §4.2, every `MEM_CHECK_INTERVAL_MILLIS`).
    async fn autoscaling_tick(&self) {
        let sample = match self.memory_probe.sample().await {
            Ok(sample) => sample,
            Err(e) => {
                warn!(error = %e, "memory probe failed, skipping autoscaling tick");
                return;
            }
        };

        let total_bytes = match self.config.max_memory_mbytes {
            Some(max_mbytes) => sample.total_bytes.min(max_mbytes * 1024 * 1024),
            None => sample.total_bytes,
        };

        let tick = {
            let mut state = self.state.lock().unwrap();
            state.tick_counter += 1;
            state.free_bytes_history.push(sample.free_bytes);
            state.last_sample = Some((sample.free_bytes, total_bytes));
            state.tick_counter
        };

        let changed = self.try_scale_down(tick, total_bytes);
        if !changed {
            self.try_scale_up(tick, total_bytes);
        }

        if tick % LOG_INFO_INTERVAL == 0 {
            let state = self.state.lock().unwrap();
            info!(
                tick,
                concurrency = state.concurrency,
                running_count = state.running_count,
                free_bytes = sample.free_bytes,
                total_bytes,
                "autoscaled pool snapshot"
            );
        }
    }

    /// Returns `true` iff concurrency changed.
    fn try_scale_down(&self, tick: u64, total_bytes: u64) -> bool {
        if tick % SCALE_DOWN_INTERVAL != 0 {
            return false;
        }

        let mut state = self.state.lock().unwrap();
        if state.concurrency <= self.config.min_concurrency {
            return false;
        }

        let avg_free = state
            .free_bytes_history
            .average_of_last(SCALE_DOWN_INTERVAL as usize);
        let is_memory_overloaded = total_bytes > 0
            && (avg_free / total_bytes as f64) < self.config.min_free_memory_ratio;
        let is_cpu_overloaded = state.cpu_overload_history.all_true();

        if is_memory_overloaded || is_cpu_overloaded {
            let old_concurrency = state.concurrency;
            state.concurrency -= 1;
            let new_concurrency = state.concurrency;
            drop(state);
            info!(
                old_concurrency,
                new_concurrency,
                is_memory_overloaded,
                is_cpu_overloaded,
                "scaling down"
            );
            true
        } else {
            false
        }
    }

    fn try_scale_up(&self, tick: u64, total_bytes: u64) {
        if tick % SCALE_UP_INTERVAL != 0 {
            return;
        }

        let mut state = self.state.lock().unwrap();
        if state.concurrency >= self.config.max_concurrency || total_bytes == 0 {
            return;
        }

        let min_free_bytes = match state.free_bytes_history.min() {
            Some(v) => v,
            None => return,
        };
        let min_free_ratio = min_free_bytes as f64 / total_bytes as f64;
        let max_taken_bytes = total_bytes.saturating_sub(min_free_bytes);
        let per_instance_ratio =
            (max_taken_bytes as f64 / total_bytes as f64) / (state.running_count.max(1) as f64);

        if per_instance_ratio <= 0.0 {
            return;
        }

        let room = (min_free_ratio - MIN_FREE_MEMORY_RATIO) / per_instance_ratio;
        let room = room.floor();
        if room <= 0.0 {
            return;
        }

        let step = (room as u64).min(SCALE_UP_MAX_STEP);
        let old_concurrency = state.concurrency;
        let new_concurrency = (old_concurrency + step).min(self.config.max_concurrency);
        state.concurrency = new_concurrency;
        drop(state);

        info!(old_concurrency, new_concurrency, room, "scaling up");
    }
}
