use crate::config::{BrowserPoolConfig, PROCESS_KILL_TIMEOUT};
use crate::events::{BrowserPoolStats, PoolEvent};
use crate::tab::LeasedTab;
use crate::traits::{Browser, BrowserLauncher, Tab};
use futures::future::{BoxFuture, FutureExt, Shared};
use pool_support::{OsProcessHandle, PoolError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

type Result<T> = std::result::Result<T, PoolError>;

/// `launch()`'s eventual outcome, shared across every caller that observed
/// the instance while it was still launching (spec §9, "Shared ownership of
/// a not-yet-ready resource").
type LaunchResult = std::result::Result<Arc<dyn Browser>, Arc<PoolError>>;
type SharedLaunch = Shared<BoxFuture<'static, LaunchResult>>;

struct InstanceRecord {
    id: u64,
    launch: SharedLaunch,
    browser: Option<Arc<dyn Browser>>,
    active_pages: u64,
    total_pages: u64,
    last_page_opened_at: Instant,
    killed: bool,
    os_process_handle: Option<OsProcessHandle>,
}

impl InstanceRecord {
    fn new(id: u64, launch: SharedLaunch, now: Instant) -> Self {
        Self {
            id,
            launch,
            browser: None,
            active_pages: 0,
            total_pages: 0,
            last_page_opened_at: now,
            killed: false,
            os_process_handle: None,
        }
    }
}

enum Command {
    ReserveSlot(oneshot::Sender<(u64, SharedLaunch)>),
    LaunchSettled(u64, LaunchResult),
    Retire(u64),
    Disconnected(u64),
    TargetDestroyed(u64),
    Stats(oneshot::Sender<BrowserPoolStats>),
    Destroy(oneshot::Sender<()>),
}

/// Pool of headless-browser instances, multiplexing logical tabs across a
/// small number of long-lived browser processes (spec §1, `BrowserPool`).
///
/// All mutable state (the `active`/`retired` id maps) lives inside a single
/// background task (the "actor"); every public method is a message send plus
/// an awaited reply. This is the Rust expression of spec §9's design note
/// "Event-driven retirement from within a background callback": browser
/// `disconnected`/`targetdestroyed` events, which arrive on arbitrary
/// executor threads, are turned into `Command`s posted to the actor's own
/// mailbox instead of reaching in and mutating the maps directly.
pub struct BrowserPool {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: mpsc::UnboundedSender<PoolEvent>,
    events_rx: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<PoolEvent>>>,
    _actor: tokio::task::JoinHandle<()>,
}

impl BrowserPool {
    pub fn new(config: BrowserPoolConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut actor = PoolActor {
            config,
            launcher,
            active: HashMap::new(),
            retired: HashMap::new(),
            next_id: 0,
            events: events_tx.clone(),
            self_tx: cmd_tx.clone(),
        };

        let initial = actor.config.initial_pool_size;
        let handle = tokio::spawn(async move {
            for _ in 0..initial {
                actor.launch_new_instance();
            }
            actor.run(cmd_rx).await;
        });

        Self {
            cmd_tx,
            events_tx,
            events_rx: tokio::sync::Mutex::new(Some(events_rx)),
            _actor: handle,
        }
    }

    /// Lease a tab, launching a new browser instance if none has room (spec
    /// §4.1, `newPage`).
    pub async fn new_page(&self) -> Result<LeasedTab> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::ReserveSlot(reply_tx)).await?;
        let (id, launch) = reply_rx
            .await
            .map_err(|_| PoolError::Other(anyhow::anyhow!("browser pool actor gone")))?;

        let browser = match launch.await {
            Ok(browser) => browser,
            Err(e) => {
                let _ = self.cmd_tx.send(Command::Retire(id)).await;
                return Err(PoolError::LaunchFailed(e.to_string()));
            }
        };

        match browser.new_page().await {
            Ok(tab) => {
                let _ = self.events_tx.send(PoolEvent::TabOpened { instance_id: id });
                Ok(LeasedTab::new(id, Arc::from(tab)))
            }
            Err(e) => {
                let _ = self.cmd_tx.send(Command::Retire(id)).await;
                Err(e)
            }
        }
    }

    /// Shut the whole pool down: fail-soft, always resolves (spec §4.1, `destroy`).
    pub async fn destroy(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Destroy(reply_tx)).await.is_ok() {
            let _ = reply_rx.await;
        }
    }

    pub async fn stats(&self) -> BrowserPoolStats {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.send(Command::Stats(reply_tx)).await.is_err() {
            return BrowserPoolStats::default();
        }
        reply_rx.await.unwrap_or_default()
    }

    /// Take the pool's event stream. Returns `None` if already taken.
    pub async fn take_events(&self) -> Option<mpsc::UnboundedReceiver<PoolEvent>> {
        self.events_rx.lock().await.take()
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| PoolError::Other(anyhow::anyhow!("browser pool actor gone")))
    }
}

struct PoolActor {
    config: BrowserPoolConfig,
    launcher: Arc<dyn BrowserLauncher>,
    active: HashMap<u64, InstanceRecord>,
    retired: HashMap<u64, InstanceRecord>,
    next_id: u64,
    events: mpsc::UnboundedSender<PoolEvent>,
    self_tx: mpsc::Sender<Command>,
}

impl PoolActor {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        let mut reaper = tokio::time::interval(self.config.instance_killer_interval);
        reaper.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::ReserveSlot(reply)) => self.handle_reserve_slot(reply),
                        Some(Command::LaunchSettled(id, result)) => self.handle_launch_settled(id, result),
                        Some(Command::Retire(id)) => self.retire(id),
                        Some(Command::Disconnected(id)) => self.handle_disconnected(id),
                        Some(Command::TargetDestroyed(id)) => self.handle_target_destroyed(id),
                        Some(Command::Stats(reply)) => {
                            let _ = reply.send(self.stats_snapshot());
                        }
                        Some(Command::Destroy(reply)) => {
                            self.destroy_all().await;
                            let _ = reply.send(());
                            return;
                        }
                        None => return,
                    }
                }
                _ = reaper.tick() => {
                    self.reap().await;
                }
            }
        }
    }

    fn handle_reserve_slot(&mut self, reply: oneshot::Sender<(u64, SharedLaunch)>) {
        let now = Instant::now();

        // "Hard cap ... exceeding -> new browser": an instance stays eligible
        // through the page that brings it level with the cap, matching the
        // literal retire-by-usage scenario (maxOpenPagesPerInstance=2,
        // abortInstanceAfterRequestCount=3 reaching totalPages=3 on one
        // instance before it retires).
        let candidate = self.active.iter().find_map(|(&id, record)| {
            if record.active_pages <= self.config.max_open_pages_per_instance {
                Some(id)
            } else {
                None
            }
        });

        let id = candidate.unwrap_or_else(|| self.launch_new_instance());

        let record = self
            .active
            .get_mut(&id)
            .expect("id just inserted or matched into active");
        record.last_page_opened_at = now;
        record.total_pages += 1;
        record.active_pages += 1;
        let launch = record.launch.clone();

        if record.total_pages >= self.config.abort_instance_after_request_count {
            self.retire(id);
        }

        let _ = reply.send((id, launch));
    }

    fn launch_new_instance(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let launcher = self.launcher.clone();
        let fut: BoxFuture<'static, LaunchResult> = Box::pin(async move {
            launcher
                .launch()
                .await
                .map(Arc::from)
                .map_err(|e| Arc::new(e))
        });
        let shared = fut.shared();

        self.active
            .insert(id, InstanceRecord::new(id, shared.clone(), Instant::now()));

        let self_tx = self.self_tx.clone();
        tokio::spawn(async move {
            let result = shared.await;
            let _ = self_tx.send(Command::LaunchSettled(id, result)).await;
        });

        id
    }

    fn handle_launch_settled(&mut self, id: u64, result: LaunchResult) {
        let record = match self.active.get_mut(&id).or_else(|| self.retired.get_mut(&id)) {
            Some(r) => r,
            None => return, // already killed/gone
        };

        match result {
            Ok(browser) => {
                record.browser = Some(browser.clone());
                record.os_process_handle = browser.process_handle();
                self.subscribe_instance_events(id, &browser);
                let _ = self.events.send(PoolEvent::InstanceLaunched { id });
            }
            Err(e) => {
                warn!(instance_id = id, error = %e, "browser launch failed");
                self.retire(id);
            }
        }
    }

    fn subscribe_instance_events(&self, id: u64, browser: &Arc<dyn Browser>) {
        let mut disconnect_rx = browser.subscribe_disconnect();
        let self_tx = self.self_tx.clone();
        tokio::spawn(async move {
            if disconnect_rx.recv().await.is_ok() {
                let _ = self_tx.send(Command::Disconnected(id)).await;
            }
        });

        let mut destroyed_rx = browser.subscribe_target_destroyed();
        let self_tx = self.self_tx.clone();
        tokio::spawn(async move {
            while destroyed_rx.recv().await.is_ok() {
                if self_tx.send(Command::TargetDestroyed(id)).await.is_err() {
                    break;
                }
            }
        });
    }

    fn handle_disconnected(&mut self, id: u64) {
        let already_killed = self
            .active
            .get(&id)
            .or_else(|| self.retired.get(&id))
            .map(|r| r.killed)
            .unwrap_or(false);

        if !already_killed {
            warn!(instance_id = id, "browser disconnected unexpectedly");
        } else {
            debug!(instance_id = id, "disconnect during planned shutdown, ignoring");
        }

        self.retire(id);
    }

    fn handle_target_destroyed(&mut self, id: u64) {
        let (now_zero, in_retired) = {
            let record = match self.active.get_mut(&id).or_else(|| self.retired.get_mut(&id)) {
                Some(r) => r,
                None => return,
            };
            record.active_pages = record.active_pages.saturating_sub(1);
            let _ = self.events.send(PoolEvent::TabClosed { instance_id: id });
            (record.active_pages == 0, self.retired.contains_key(&id))
        };

        if now_zero && in_retired {
            self.kill(id);
        }
    }

    /// Idempotent: a no-op (with a warning) if `id` is not currently active
    /// (spec §4.1, "Retirement").
    fn retire(&mut self, id: u64) {
        let Some(record) = self.active.remove(&id) else {
            warn!(instance_id = id, "retire called on an instance that is not active");
            return;
        };

        debug!(instance_id = id, "instance retired");
        let _ = self.events.send(PoolEvent::InstanceRetired { id });
        self.retired.insert(id, record);
    }

    /// Idempotent kill: tolerates being called twice and tolerates a missing
    /// OS process handle (spec §4.1, "Kill algorithm").
    fn kill(&mut self, id: u64) {
        let Some(mut record) = self.retired.remove(&id) else {
            return;
        };

        if let Some(handle) = record.os_process_handle {
            tokio::spawn(async move {
                tokio::time::sleep(PROCESS_KILL_TIMEOUT).await;
                handle.kill();
            });
        }

        if !record.killed {
            record.killed = true;
            let launch = record.launch.clone();
            let events = self.events.clone();
            tokio::spawn(async move {
                if let Ok(browser) = launch.await {
                    if let Err(e) = browser.close().await {
                        warn!(instance_id = id, error = %e, "error closing browser during kill");
                    }
                }
                let _ = events.send(PoolEvent::InstanceKilled { id });
            });
        }
    }

    /// Reaper sweep: spec §4.1, "Reaper (periodic, every `instanceKillerIntervalMillis`)".
    async fn reap(&mut self) {
        let now = Instant::now();
        let mut to_kill = Vec::new();
        let mut to_query = Vec::new();

        for (&id, record) in self.retired.iter() {
            if now.saturating_duration_since(record.last_page_opened_at)
                > self.config.kill_instance_after
            {
                to_kill.push(id);
            } else if let Some(browser) = record.browser.clone() {
                to_query.push((id, browser));
            }
            // Instances still launching are left for the next sweep: we can't
            // query a browser we don't have yet, and it isn't idle-expired.
        }

        for (id, browser) in to_query {
            match browser.pages().await {
                Ok(0) => to_kill.push(id),
                Ok(_) => {}
                Err(e) => {
                    warn!(instance_id = id, error = %e, "reaper tab-count probe failed");
                    to_kill.push(id);
                }
            }
        }

        to_kill.sort_unstable();
        to_kill.dedup();
        for id in to_kill {
            self.kill(id);
        }
    }

    async fn destroy_all(&mut self) {
        info!("destroying browser pool");

        for record in self.active.values_mut().chain(self.retired.values_mut()) {
            record.killed = true;
        }

        let mut launches: Vec<(u64, SharedLaunch)> = self
            .active
            .values()
            .chain(self.retired.values())
            .map(|r| (r.id, r.launch.clone()))
            .collect();
        launches.sort_unstable_by_key(|(id, _)| *id);
        launches.dedup_by_key(|(id, _)| *id);

        let closes = launches.into_iter().map(|(id, launch)| async move {
            match launch.await {
                Ok(browser) => {
                    if let Err(e) = browser.close().await {
                        warn!(instance_id = id, error = %e, "error closing browser during destroy");
                    }
                }
                Err(e) => {
                    debug!(instance_id = id, error = %e, "instance never launched, nothing to close");
                }
            }
        });
        futures::future::join_all(closes).await;

        self.active.clear();
        self.retired.clear();
    }

    fn stats_snapshot(&self) -> BrowserPoolStats {
        let total_pages_opened = self
            .active
            .values()
            .chain(self.retired.values())
            .map(|r| r.total_pages)
            .sum();

        BrowserPoolStats {
            active_instances: self.active.len(),
            retired_instances: self.retired.len(),
            total_pages_opened,
        }
    }
}
