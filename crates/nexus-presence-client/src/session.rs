//! Presence session loop
//!
//! One [`PresenceClient`] owns at most one running session. The session is an
//! actor task multiplexing three timers (heartbeat, health check, roster
//! refresh), an optional backoff retry and the results of spawned network
//! calls. Network calls never run on the loop itself, so a slow response
//! cannot delay the next scheduled step.

use chrono::{DateTime, Utc};
use nexus_core::{Role, SessionId, UserId};
use nexus_presence_sdk::{
    AnnounceResponse, PresenceAction, PresenceEntry, PresenceSnapshot, RosterResponse,
    StatsResponse,
};
use nexus_telemetry::Histogram;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::health::{evaluate, ConnectionHealth, HealthVerdict, SessionPhase};
use crate::transport::PresenceTransport;

/// The authenticated principal a session announces for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: UserId,
    pub role: Role,
}

impl SessionIdentity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId::new(user_id),
            role,
        }
    }
}

/// Observable state of the current session
#[derive(Debug, Clone)]
pub struct ClientStatus {
    pub session_id: Option<SessionId>,
    pub user_id: Option<UserId>,
    pub phase: SessionPhase,
    pub health: ConnectionHealth,
    pub is_online: bool,
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Consecutive failed beats; zero after any success
    pub retry_count: u32,
    pub online_total: usize,
    pub roster: Vec<PresenceEntry>,
    pub stats: Option<PresenceSnapshot>,
}

impl Default for ClientStatus {
    fn default() -> Self {
        Self {
            session_id: None,
            user_id: None,
            phase: SessionPhase::Uninitialized,
            health: ConnectionHealth::Offline,
            is_online: false,
            last_heartbeat: None,
            retry_count: 0,
            online_total: 0,
            roster: Vec::new(),
            stats: None,
        }
    }
}

enum Command {
    Stop(oneshot::Sender<()>),
}

struct ActiveSession {
    identity: SessionIdentity,
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl ActiveSession {
    fn is_live(&self) -> bool {
        !self.task.is_finished()
    }

    async fn shutdown(self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(Command::Stop(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
        if let Err(e) = self.task.await {
            if e.is_panic() {
                error!(user_id = %self.identity.user_id, "Presence session panicked");
            }
        }
    }
}

/// Keeps the server's view of this session fresh
pub struct PresenceClient<T: PresenceTransport> {
    transport: Arc<T>,
    config: ClientConfig,
    status: Arc<watch::Sender<ClientStatus>>,
    session: Mutex<Option<ActiveSession>>,
    latency: Histogram,
}

impl<T: PresenceTransport> PresenceClient<T> {
    pub fn new(transport: Arc<T>, config: ClientConfig) -> Self {
        let (status, _) = watch::channel(ClientStatus::default());
        Self {
            transport,
            config,
            status: Arc::new(status),
            session: Mutex::new(None),
            latency: Histogram::new("presence_heartbeat_latency_ms"),
        }
    }

    /// Start a session for `identity`.
    ///
    /// Returns `false` without side effects when a live session already runs
    /// for the same user. A session for a different user is stopped first.
    pub async fn start(&self, identity: SessionIdentity) -> bool {
        let mut session = self.session.lock().await;

        if let Some(active) = session.as_ref() {
            if active.is_live() && active.identity.user_id == identity.user_id {
                debug!(user_id = %identity.user_id, "Presence session already running");
                return false;
            }
        }

        if let Some(previous) = session.take() {
            info!(
                previous = %previous.identity.user_id,
                next = %identity.user_id,
                "Replacing presence session"
            );
            previous.shutdown().await;
        }

        let session_id = SessionId::generate();
        self.status.send_replace(ClientStatus {
            session_id: Some(session_id.clone()),
            user_id: Some(identity.user_id.clone()),
            phase: SessionPhase::Initializing,
            ..ClientStatus::default()
        });

        let (commands, rx) = mpsc::channel(4);
        let runner = SessionLoop::new(
            self.transport.clone(),
            self.config.clone(),
            identity.clone(),
            self.status.clone(),
            rx,
            self.latency.clone(),
        );

        info!(user_id = %identity.user_id, session_id = %session_id, "Presence session starting");
        let task = tokio::spawn(runner.run());

        *session = Some(ActiveSession {
            identity,
            commands,
            task,
        });
        true
    }

    /// Tear the session down and wait until the offline announce is settled
    pub async fn stop(&self) {
        let active = self.session.lock().await.take();
        if let Some(active) = active {
            active.shutdown().await;
        }
    }

    pub fn status(&self) -> ClientStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClientStatus> {
        self.status.subscribe()
    }

    pub fn heartbeat_latency(&self) -> &Histogram {
        &self.latency
    }
}

impl<T: PresenceTransport> Drop for PresenceClient<T> {
    fn drop(&mut self) {
        if let Some(active) = self.session.get_mut().take() {
            active.task.abort();
        }
    }
}

struct BeatSuccess {
    response: AnnounceResponse,
    latency: Duration,
}

struct RefreshResult {
    stats: std::result::Result<StatsResponse, TransportError>,
    roster: Option<std::result::Result<RosterResponse, TransportError>>,
}

enum Flow {
    Continue,
    Stop,
}

struct SessionLoop<T: PresenceTransport> {
    transport: Arc<T>,
    config: ClientConfig,
    identity: SessionIdentity,
    status: Arc<watch::Sender<ClientStatus>>,
    commands: mpsc::Receiver<Command>,
    latency: Histogram,
    beats: JoinSet<std::result::Result<BeatSuccess, TransportError>>,
    refreshes: JoinSet<RefreshResult>,
    retry: Option<Pin<Box<Sleep>>>,
    retry_count: u32,
    /// Next beat re-registers with `online` before its heartbeat
    needs_online: bool,
    announced: bool,
    refreshed_once: bool,
    last_success: Instant,
}

impl<T: PresenceTransport> SessionLoop<T> {
    fn new(
        transport: Arc<T>,
        config: ClientConfig,
        identity: SessionIdentity,
        status: Arc<watch::Sender<ClientStatus>>,
        commands: mpsc::Receiver<Command>,
        latency: Histogram,
    ) -> Self {
        Self {
            transport,
            config,
            identity,
            status,
            commands,
            latency,
            beats: JoinSet::new(),
            refreshes: JoinSet::new(),
            retry: None,
            retry_count: 0,
            needs_online: true,
            announced: false,
            refreshed_once: false,
            last_success: Instant::now(),
        }
    }

    fn ticker(period: Duration) -> Interval {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    async fn run(mut self) {
        let mut heartbeat = Self::ticker(self.config.heartbeat_interval);
        let mut health_check = Self::ticker(self.config.health_check_interval);
        let mut refresh = Self::ticker(self.config.refresh_interval);

        self.spawn_beat();

        loop {
            let flow = tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(Command::Stop(ack)) => {
                            self.teardown(true).await;
                            let _ = ack.send(());
                        }
                        None => self.teardown(true).await,
                    }
                    Flow::Stop
                }
                _ = heartbeat.tick() => {
                    self.spawn_beat();
                    Flow::Continue
                }
                _ = wait_retry(&mut self.retry) => {
                    self.retry = None;
                    debug!(user_id = %self.identity.user_id, attempt = self.retry_count, "Retrying heartbeat");
                    self.spawn_beat();
                    Flow::Continue
                }
                _ = health_check.tick() => self.check_health().await,
                _ = refresh.tick() => {
                    self.spawn_refresh();
                    Flow::Continue
                }
                Some(joined) = self.beats.join_next() => {
                    match joined {
                        Ok(outcome) => self.on_beat(outcome).await,
                        Err(e) => {
                            error!(user_id = %self.identity.user_id, error = %e, "Heartbeat task failed");
                            self.on_beat(Err(TransportError::Network(e.to_string()))).await
                        }
                    }
                }
                Some(joined) = self.refreshes.join_next() => {
                    match joined {
                        Ok(result) => self.on_refresh(result),
                        Err(e) => warn!(user_id = %self.identity.user_id, error = %e, "Roster refresh task failed"),
                    }
                    Flow::Continue
                }
            };

            if let Flow::Stop = flow {
                break;
            }
        }

        debug!(user_id = %self.identity.user_id, "Presence session loop exited");
    }

    fn spawn_beat(&mut self) {
        if !self.beats.is_empty() {
            debug!(user_id = %self.identity.user_id, "Heartbeat already in flight, skipping");
            return;
        }

        let announce_online = self.needs_online;
        if announce_online {
            self.announced = true;
        }

        let transport = self.transport.clone();
        self.beats.spawn(async move {
            let started = Instant::now();
            if announce_online {
                transport.announce(PresenceAction::Online).await?;
            }
            let response = transport.announce(PresenceAction::Heartbeat).await?;
            Ok(BeatSuccess {
                response,
                latency: started.elapsed(),
            })
        });
    }

    fn spawn_refresh(&mut self) {
        let transport = self.transport.clone();
        let may_enumerate = self.identity.role.can_enumerate_presence();

        self.refreshes.spawn(async move {
            let stats = transport.stats().await;
            let roster = if may_enumerate {
                Some(transport.roster().await)
            } else {
                None
            };
            RefreshResult { stats, roster }
        });
    }

    async fn on_beat(&mut self, outcome: std::result::Result<BeatSuccess, TransportError>) -> Flow {
        match outcome {
            Ok(success) => {
                let recovered = self.retry_count > 0;
                self.retry = None;
                self.retry_count = 0;
                self.needs_online = false;
                self.last_success = Instant::now();
                self.latency.record(success.latency.as_secs_f64() * 1000.0);

                self.status.send_modify(|status| {
                    status.phase = SessionPhase::Active;
                    status.health = ConnectionHealth::Healthy;
                    status.is_online = true;
                    status.last_heartbeat = Some(Utc::now());
                    status.retry_count = 0;
                    status.online_total = success.response.total_online;
                });

                if recovered {
                    info!(user_id = %self.identity.user_id, "Presence connection recovered");
                } else {
                    debug!(
                        user_id = %self.identity.user_id,
                        total_online = success.response.total_online,
                        "Heartbeat acknowledged"
                    );
                }

                if !self.refreshed_once {
                    self.refreshed_once = true;
                    self.spawn_refresh();
                }
                Flow::Continue
            }
            Err(TransportError::Unauthorized) => {
                warn!(user_id = %self.identity.user_id, "Presence announce unauthorized, ending session");
                self.teardown(false).await;
                Flow::Stop
            }
            Err(e) => {
                self.retry_count = self.retry_count.saturating_add(1);
                self.needs_online = true;

                let retry_count = self.retry_count;
                self.status.send_modify(|status| {
                    status.phase = SessionPhase::Degraded;
                    status.health = ConnectionHealth::Degraded;
                    status.retry_count = retry_count;
                });

                if self.retry.is_none() {
                    let delay = self.config.backoff.delay(retry_count - 1);
                    self.retry = Some(Box::pin(tokio::time::sleep(delay)));
                    warn!(
                        user_id = %self.identity.user_id,
                        error = %e,
                        retry_count,
                        delay_ms = delay.as_millis() as u64,
                        "Heartbeat failed, retry scheduled"
                    );
                } else {
                    warn!(user_id = %self.identity.user_id, error = %e, retry_count, "Heartbeat failed");
                }
                Flow::Continue
            }
        }
    }

    fn on_refresh(&mut self, result: RefreshResult) {
        let RefreshResult { stats, roster } = result;

        match stats {
            Ok(response) => {
                self.status.send_modify(|status| {
                    status.online_total = response.data.snapshot.total;
                    status.stats = Some(response.data.snapshot);
                });
            }
            Err(e) => debug!(user_id = %self.identity.user_id, error = %e, "Stats refresh failed"),
        }

        match roster {
            Some(Ok(response)) => {
                self.status.send_modify(|status| status.roster = response.data);
            }
            Some(Err(e)) => debug!(user_id = %self.identity.user_id, error = %e, "Roster refresh failed"),
            None => {}
        }
    }

    async fn check_health(&mut self) -> Flow {
        let silence = self.last_success.elapsed();

        match evaluate(silence, self.config.soft_threshold, self.config.hard_threshold) {
            HealthVerdict::Expired => {
                warn!(
                    user_id = %self.identity.user_id,
                    silence_secs = silence.as_secs(),
                    "No successful heartbeat within hard threshold, going offline"
                );
                self.teardown(true).await;
                Flow::Stop
            }
            HealthVerdict::Stale => {
                self.status.send_if_modified(|status| {
                    if status.health == ConnectionHealth::Healthy {
                        status.phase = SessionPhase::Degraded;
                        status.health = ConnectionHealth::Degraded;
                        true
                    } else {
                        false
                    }
                });
                Flow::Continue
            }
            HealthVerdict::Fresh => Flow::Continue,
        }
    }

    /// Retry first, then in-flight calls, then the offline announce
    async fn teardown(&mut self, announce_offline: bool) {
        self.retry = None;
        self.beats.shutdown().await;
        self.refreshes.shutdown().await;

        if announce_offline && self.announced {
            if let Err(e) = self.transport.announce(PresenceAction::Offline).await {
                debug!(user_id = %self.identity.user_id, error = %e, "Offline announce not delivered");
            }
        }

        self.status.send_modify(|status| {
            status.phase = SessionPhase::Offline;
            status.health = ConnectionHealth::Offline;
            status.is_online = false;
        });

        info!(user_id = %self.identity.user_id, "Presence session offline");
    }
}

/// Resolves when the pending retry fires; pending forever when none is set
fn wait_retry(retry: &mut Option<Pin<Box<Sleep>>>) -> impl Future<Output = ()> + '_ {
    async move {
        match retry.as_mut() {
            Some(sleep) => sleep.as_mut().await,
            None => std::future::pending::<()>().await,
        }
    }
}
