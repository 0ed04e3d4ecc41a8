//! Engine actor
//!
//! A single task owns every mutation of the focus session and the
//! auto-clean switch. Commands, change-feed events, alarm ticks and expiry
//! timer fires all arrive as messages on its loop:
//!
//! ```text
//! EngineHandle ──commands──▶ ┌────────────┐ ──spawn──▶ enforcement / sweep
//! expiry timer ──generation─▶│ actor loop │            (batch I/O on TabSource)
//! sweep alarm  ──tick───────▶└────────────┘
//! ```
//!
//! The loop itself never awaits host I/O. Batch work is spawned with a copy
//! of the state it needs and replies to the caller when it finishes.

use chrono::Duration;
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use tabsense_focus::{Allowlist, Enforcer, FocusError, FocusManager, FocusSession, Restored, Verdict};
use tabsense_storage::Database;
use tabsense_tabs::{
    Category, ClassificationResult, Classifier, GroupingReport, TabEvent, TabFilter, TabId,
    TabSource,
};

use crate::autoclean::{sweep, AutoClean, SweepReport};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::error::CoreError;
use crate::notify::{Notification, Notifier};
use crate::Result;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    StartSession {
        duration: Duration,
        allowlist: Allowlist,
        reply: Reply<FocusSession>,
    },
    StopSession {
        reply: Reply<FocusSession>,
    },
    SetAutoClean {
        enabled: bool,
        reply: Reply<()>,
    },
    TabEvent {
        event: TabEvent,
        reply: Reply<Option<Verdict>>,
    },
    Sweep {
        reply: Reply<Option<SweepReport>>,
    },
    Shutdown,
}

/// Collaborators and lock-guarded state shared by the actor, its spawned
/// work and every handle
struct Shared {
    source: Arc<dyn TabSource>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    focus: FocusManager,
    auto_clean: AutoClean,
    enforcer: Enforcer,
    ui_classifier: Classifier,
    sweep_threshold: Duration,
    dashboard: watch::Sender<Dashboard>,
    /// Tabs with a block-page redirect in flight
    redirecting: Mutex<HashSet<TabId>>,
}

pub struct Engine;

impl Engine {
    /// Open the database named in `config` and start the engine on the
    /// system clock.
    pub fn open(
        config: Config,
        source: Arc<dyn TabSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<EngineHandle> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&config.database_path)?;
        Self::spawn(config, db, source, notifier, Arc::new(SystemClock))
    }

    /// Restore persisted state and spawn the engine task.
    ///
    /// Must be called from within a tokio runtime. A stored focus session
    /// whose end time has passed is reset to idle here, before any command
    /// or event is processed, and without a notification.
    pub fn spawn(
        config: Config,
        db: Database,
        source: Arc<dyn TabSource>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<EngineHandle> {
        config.validate()?;

        let focus = FocusManager::new(db.clone());
        let auto_clean = AutoClean::new(db);

        let restored = match focus.restore(clock.now()) {
            Ok(restored) => restored,
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist reconciled focus state");
                Restored::Idle
            }
        };
        auto_clean.load();

        let (dashboard, _) = watch::channel(Dashboard::default());
        let shared = Arc::new(Shared {
            source,
            notifier,
            clock,
            focus,
            auto_clean,
            enforcer: config.enforcer(),
            ui_classifier: Classifier::new(config.ui_classifier()),
            sweep_threshold: config.sweep_inactive_threshold,
            dashboard,
            redirecting: Mutex::new(HashSet::new()),
        });

        let (commands_tx, commands_rx) = mpsc::channel(config.command_buffer.max(1));
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();

        let mut actor = Actor {
            shared: Arc::clone(&shared),
            commands: commands_rx,
            expiry_tx,
            expiry_rx,
            timer: None,
            generation: 0,
            sweep_interval: to_std(config.sweep_interval),
        };

        match restored {
            Restored::Resumed { end_at } => {
                actor.arm_expiry(to_std(end_at - shared.clock.now()));
            }
            Restored::Expired => {
                tracing::info!("Focus session expired before startup; now idle");
            }
            Restored::Idle => {}
        }

        tokio::spawn(actor.run());

        Ok(EngineHandle {
            commands: commands_tx,
            shared,
        })
    }
}

struct Actor {
    shared: Arc<Shared>,
    commands: mpsc::Receiver<Command>,
    expiry_tx: mpsc::UnboundedSender<u64>,
    expiry_rx: mpsc::UnboundedReceiver<u64>,
    /// Pending expiry timer, if a session is running
    timer: Option<JoinHandle<()>>,
    /// Identifies the current timer; fires carrying an older value are stale
    generation: u64,
    sweep_interval: std::time::Duration,
}

impl Actor {
    async fn run(mut self) {
        let mut alarm =
            tokio::time::interval_at(Instant::now() + self.sweep_interval, self.sweep_interval);
        alarm.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Engine started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(generation) = self.expiry_rx.recv() => self.expire(generation),
                _ = alarm.tick() => self.run_sweep(None),
            }
        }

        self.disarm_expiry();
        tracing::info!("Engine stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::StartSession {
                duration,
                allowlist,
                reply,
            } => self.start_session(duration, allowlist, reply),
            Command::StopSession { reply } => {
                self.disarm_expiry();
                let _ = reply.send(self.shared.focus.stop().map_err(CoreError::from));
            }
            Command::SetAutoClean { enabled, reply } => {
                let _ = reply.send(self.shared.auto_clean.set(enabled));
            }
            Command::TabEvent { event, reply } => self.tab_event(event, reply),
            Command::Sweep { reply } => self.run_sweep(Some(reply)),
            Command::Shutdown => {}
        }
    }

    fn start_session(&mut self, duration: Duration, allowlist: Allowlist, reply: Reply<FocusSession>) {
        let now = self.shared.clock.now();
        let session = match self.shared.focus.start(now, duration, allowlist) {
            Ok(session) => session,
            Err(e) => {
                let _ = reply.send(Err(e.into()));
                return;
            }
        };

        self.arm_expiry(to_std(duration));

        // Every open tab is checked against the new allowlist right away
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            enforce_all(&shared, &session.allowlist).await;
            let _ = reply.send(Ok(session));
        });
    }

    fn tab_event(&mut self, event: TabEvent, reply: Reply<Option<Verdict>>) {
        self.refresh_dashboard();

        let session = self.shared.focus.status();
        if !session.active || !event.is_navigation() {
            let _ = reply.send(Ok(None));
            return;
        }

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let verdict = enforce_tab(&shared, event.tab_id(), &session.allowlist).await;
            let _ = reply.send(Ok(verdict));
        });
    }

    /// Alarm tick or explicit request. Does nothing while auto-clean is off.
    fn run_sweep(&mut self, reply: Option<Reply<Option<SweepReport>>>) {
        if !self.shared.auto_clean.is_enabled() {
            if let Some(reply) = reply {
                let _ = reply.send(Ok(None));
            }
            return;
        }

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tracing::debug!("Running auto-clean sweep");
            let now = shared.clock.now();
            let outcome = sweep(shared.source.as_ref(), now, shared.sweep_threshold).await;
            if let Err(e) = &outcome {
                tracing::warn!(error = %e, "Auto-clean sweep failed");
            }
            if let Some(reply) = reply {
                let _ = reply.send(outcome.map(Some));
            }
        });
    }

    fn arm_expiry(&mut self, after: std::time::Duration) {
        self.disarm_expiry();

        let generation = self.generation;
        let Some(deadline) = Instant::now().checked_add(after) else {
            tracing::warn!(after = ?after, "Focus timer deadline out of range; not armed");
            return;
        };
        let expiry_tx = self.expiry_tx.clone();

        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = expiry_tx.send(generation);
        }));
    }

    /// Cancel the pending timer. Bumping the generation also voids a fire
    /// that is already queued.
    fn disarm_expiry(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation += 1;
    }

    fn expire(&mut self, generation: u64) {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "Ignoring stale focus timer");
            return;
        }
        self.timer = None;

        if !self.shared.focus.is_active() {
            return;
        }

        if let Err(e) = self.shared.focus.stop() {
            tracing::error!(error = %e, "Failed to persist expired focus session");
        }
        tracing::info!("Focus session complete");

        let notifier = Arc::clone(&self.shared.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(Notification::focus_complete()).await {
                tracing::warn!(error = %e, "Failed to show notification");
            }
        });
    }

    fn refresh_dashboard(&self) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            match shared.source.list_tabs(TabFilter::all()).await {
                Ok(tabs) => {
                    let dashboard =
                        Dashboard::compute(&tabs, &shared.ui_classifier, shared.clock.now());
                    shared.dashboard.send_replace(dashboard);
                }
                Err(e) => tracing::warn!(error = %e, "Failed to refresh dashboard"),
            }
        });
    }
}

/// Check one tab against the allowlist, redirecting it if blocked.
/// Returns `None` when the tab can no longer be read.
async fn enforce_tab(shared: &Shared, id: TabId, allowlist: &[String]) -> Option<Verdict> {
    let verdict = evaluate_tab(shared, id, allowlist).await?;
    if !verdict.should_redirect() {
        return Some(verdict);
    }

    redirect(shared, id, allowlist).await
}

/// Check every open tab against the allowlist
async fn enforce_all(shared: &Shared, allowlist: &[String]) {
    let tabs = match shared.source.list_tabs(TabFilter::all()).await {
        Ok(tabs) => tabs,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list tabs for enforcement");
            return;
        }
    };

    let blocked = tabs
        .iter()
        .filter(|tab| {
            shared
                .enforcer
                .evaluate(tab.url.as_deref(), allowlist)
                .should_redirect()
        })
        .map(|tab| redirect(shared, tab.id, allowlist));

    let count = join_all(blocked)
        .await
        .into_iter()
        .filter(|verdict| *verdict == Some(Verdict::Block))
        .count();
    if count > 0 {
        tracing::info!(count, "Redirected blocked tabs");
    }
}

async fn evaluate_tab(shared: &Shared, id: TabId, allowlist: &[String]) -> Option<Verdict> {
    let tab = match shared.source.get_tab(id).await {
        Ok(tab) => tab,
        Err(e) => {
            tracing::debug!(tab_id = %id, error = %e, "Skipping enforcement for unreadable tab");
            return None;
        }
    };

    let verdict = shared.enforcer.evaluate(tab.url.as_deref(), allowlist);
    tracing::debug!(tab_id = %id, verdict = ?verdict, "Enforcement verdict");
    Some(verdict)
}

/// Send a tab to the block page, at most one request per tab at a time.
///
/// The tab is re-read once its slot is claimed, so a redirect that
/// finished in the meantime is seen as `AlreadyBlocked`. A caller that
/// finds the slot taken gets `AlreadyBlocked` straight away.
async fn redirect(shared: &Shared, id: TabId, allowlist: &[String]) -> Option<Verdict> {
    let Some(_slot) = RedirectSlot::claim(&shared.redirecting, id) else {
        tracing::debug!(tab_id = %id, "Redirect already in flight");
        return Some(Verdict::AlreadyBlocked);
    };

    let verdict = evaluate_tab(shared, id, allowlist).await?;
    if !verdict.should_redirect() {
        return Some(verdict);
    }

    let target = shared.enforcer.block_page().to_string();
    match shared.source.navigate_tab(id, target).await {
        Ok(()) => tracing::info!(tab_id = %id, "Redirected tab to block page"),
        Err(e) => tracing::warn!(tab_id = %id, error = %e, "Failed to redirect tab"),
    }

    Some(verdict)
}

/// Marks a tab as having a redirect in flight until dropped
struct RedirectSlot<'a> {
    redirecting: &'a Mutex<HashSet<TabId>>,
    id: TabId,
}

impl<'a> RedirectSlot<'a> {
    fn claim(redirecting: &'a Mutex<HashSet<TabId>>, id: TabId) -> Option<Self> {
        redirecting
            .lock()
            .insert(id)
            .then(|| Self { redirecting, id })
    }
}

impl Drop for RedirectSlot<'_> {
    fn drop(&mut self) {
        self.redirecting.lock().remove(&self.id);
    }
}

fn to_std(duration: Duration) -> std::time::Duration {
    duration.to_std().unwrap_or(std::time::Duration::ZERO)
}

/// Request/response API onto the engine. Cheap to clone.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    shared: Arc<Shared>,
}

impl EngineHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| CoreError::EngineStopped)?;
        response.await.map_err(|_| CoreError::EngineStopped)?
    }

    /// Start a focus session, replacing any running one.
    ///
    /// Entries may be written as URLs; they are normalized to hostname
    /// fragments here. Resolves once every open tab has been checked.
    pub async fn start_session<I, S>(&self, duration_minutes: i64, allowlist: I) -> Result<FocusSession>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let duration = Duration::try_minutes(duration_minutes)
            .filter(|duration| *duration > Duration::zero())
            .ok_or(FocusError::InvalidDuration(duration_minutes))?;

        let allowlist = Allowlist::parse(allowlist);
        self.request(|reply| Command::StartSession {
            duration,
            allowlist,
            reply,
        })
        .await
    }

    /// End the focus session. Tabs already on the block page stay there.
    pub async fn stop_session(&self) -> Result<FocusSession> {
        self.request(|reply| Command::StopSession { reply }).await
    }

    /// Current focus session. Reads shared state without queueing.
    pub fn status(&self) -> FocusSession {
        self.shared.focus.status()
    }

    /// Countdown for the running session; `None` when idle
    pub fn remaining(&self) -> Option<Duration> {
        self.shared.focus.status().remaining(self.shared.clock.now())
    }

    pub async fn set_auto_clean(&self, enabled: bool) -> Result<()> {
        self.request(|reply| Command::SetAutoClean { enabled, reply })
            .await
    }

    pub fn auto_clean_enabled(&self) -> bool {
        self.shared.auto_clean.is_enabled()
    }

    /// Feed one change-feed event to the engine. Resolves with the
    /// enforcement verdict when the event was a navigation during a session.
    pub async fn handle_event(&self, event: TabEvent) -> Result<Option<Verdict>> {
        self.request(|reply| Command::TabEvent { event, reply })
            .await
    }

    /// Run the auto-clean sweep now, as an alarm tick would. `None` when
    /// auto-clean is off.
    pub async fn sweep_now(&self) -> Result<Option<SweepReport>> {
        self.request(|reply| Command::Sweep { reply }).await
    }

    /// Classify a fresh snapshot with the dashboard threshold
    pub async fn classify(&self) -> Result<ClassificationResult> {
        let tabs = self.shared.source.list_tabs(TabFilter::all()).await?;
        Ok(self
            .shared
            .ui_classifier
            .classify(&tabs, self.shared.clock.now()))
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        let tabs = self.shared.source.list_tabs(TabFilter::all()).await?;
        Ok(Dashboard::compute(
            &tabs,
            &self.shared.ui_classifier,
            self.shared.clock.now(),
        ))
    }

    /// Dashboard recomputed after every change-feed event
    pub fn subscribe(&self) -> watch::Receiver<Dashboard> {
        self.shared.dashboard.subscribe()
    }

    pub async fn group_by_domain(&self) -> Result<GroupingReport> {
        Ok(tabsense_tabs::group_by_domain(self.shared.source.as_ref()).await?)
    }

    pub async fn close_tab(&self, id: TabId) -> Result<()> {
        self.shared.source.close_tab(id).await.map_err(|e| {
            tracing::warn!(tab_id = %id, error = %e, "Failed to close tab");
            e.into()
        })
    }

    /// Close tabs, returning how many were closed.
    ///
    /// Tries one batch request first; if the host rejects it, each tab is
    /// closed on its own so a single bad id does not keep the rest open.
    pub async fn close_tabs(&self, ids: Vec<TabId>) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let source = self.shared.source.as_ref();
        match source.close_tabs(ids.clone()).await {
            Ok(()) => {
                tracing::info!(count = ids.len(), "Closed tabs");
                Ok(ids.len())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Batch close failed, closing tabs one by one");
                let outcomes = join_all(ids.into_iter().map(|id| self.close_tab(id))).await;
                Ok(outcomes.iter().filter(|outcome| outcome.is_ok()).count())
            }
        }
    }

    /// Close every tab currently in `category`
    pub async fn close_category(&self, category: Category) -> Result<usize> {
        let classification = self.classify().await?;
        let ids = classification
            .get(category)
            .iter()
            .map(|tab| tab.id)
            .collect();
        self.close_tabs(ids).await
    }

    /// Stop the engine task. Later requests fail with `EngineStopped`.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}
