//! Camera watchdog facade and session state

use crate::config::WatchdogConfig;
use crate::event::{EventStream, WatchdogEvent};
use crate::health::{HealthAction, HealthTracker, TrackSignals, Transition};
use crate::recovery::{LocalRecoveryController, RecoveryReason};
use callguard_core::{
    CallGuardError, DataChannel, PeerConnection, RecoveryError, TrackEvent, TrackHealthState,
    TrackSide, VideoTrack,
};
use callguard_diagnostics::{TransitionLog, TransitionRecord};
use callguard_media::{MediaCaptureGateway, NullPreview, PreviewSink};
use callguard_signaling::{PeerNotificationChannel, PeerReaction, StatusKind, Subject};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

/// Lifecycle phase of a watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchdogPhase {
    /// Constructed, not started
    Idle,
    /// Health checks running
    Monitoring,
    /// Monitoring with ticks paused while the local camera is repaired
    Recovering,
    /// Stopped; only `restart()` leaves this phase
    Stopped,
}

impl fmt::Display for WatchdogPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WatchdogPhase::Idle => "idle",
            WatchdogPhase::Monitoring => "monitoring",
            WatchdogPhase::Recovering => "recovering",
            WatchdogPhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Snapshot returned by [`CameraWatchdog::status`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogStatus {
    /// Lifecycle phase
    pub phase: WatchdogPhase,
    /// Local camera health
    pub local_state: TrackHealthState,
    /// Inbound video health
    pub remote_state: TrackHealthState,
    /// Last local frame seen
    pub last_local_activity: Instant,
    /// Last remote frame seen
    pub last_remote_activity: Instant,
    /// Recovery attempts since the last success or restart
    pub retry_count: u32,
}

/// Mutable state of one monitoring session
pub(crate) struct Session {
    pub(crate) phase: WatchdogPhase,
    pub(crate) health: HealthTracker,
    pub(crate) retry_count: u32,
    pub(crate) recovering: bool,
    pub(crate) epoch: u64,
    pub(crate) listening: bool,
    pub(crate) local_track: Option<VideoTrack>,
    pub(crate) remote_track: Option<VideoTrack>,
    pub(crate) local_observer: Option<JoinHandle<()>>,
    pub(crate) remote_observer: Option<JoinHandle<()>>,
    pub(crate) pending_retry: Option<JoinHandle<()>>,
}

impl Session {
    fn observer_mut(&mut self, side: TrackSide) -> &mut Option<JoinHandle<()>> {
        match side {
            TrackSide::Local => &mut self.local_observer,
            TrackSide::Remote => &mut self.remote_observer,
        }
    }

    fn track(&self, side: TrackSide) -> Option<&VideoTrack> {
        match side {
            TrackSide::Local => self.local_track.as_ref(),
            TrackSide::Remote => self.remote_track.as_ref(),
        }
    }

    fn tick_signals(&self) -> TrackSignals {
        TrackSignals {
            local_ended: self.local_track.as_ref().is_some_and(VideoTrack::is_ended),
            remote_ended: self.remote_track.as_ref().is_some_and(VideoTrack::is_ended),
            local_recovering: self.recovering,
        }
    }

    fn cancel_background(&mut self) {
        self.health.stop_ticking();
        for observer in [self.local_observer.take(), self.remote_observer.take()]
            .into_iter()
            .flatten()
        {
            observer.abort();
        }
        if let Some(pending) = self.pending_retry.take() {
            pending.abort();
        }
    }
}

/// Collaborators and shared state behind a [`CameraWatchdog`]
pub(crate) struct WatchdogInner {
    pub(crate) config: WatchdogConfig,
    pub(crate) gateway: Arc<dyn MediaCaptureGateway>,
    pub(crate) peer: Arc<dyn PeerConnection>,
    pub(crate) preview: Arc<dyn PreviewSink>,
    pub(crate) notifier: PeerNotificationChannel,
    pub(crate) session: Mutex<Session>,
    pub(crate) events: broadcast::Sender<WatchdogEvent>,
    pub(crate) history: TransitionLog,
    runtime: Mutex<Option<Handle>>,
}

impl WatchdogInner {
    pub(crate) fn emit(&self, event: WatchdogEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn notify(&self, kind: StatusKind, subject: Subject) {
        if let Err(e) = self.notifier.send(kind, subject) {
            warn!("Failed to send {:?} notification: {}", kind, e);
        }
    }

    pub(crate) fn apply_transitions(&self, transitions: &[Transition]) {
        for transition in transitions {
            self.history.record(
                transition.side,
                transition.from,
                transition.to,
                transition.cause.clone(),
            );
            self.emit(WatchdogEvent::StateChanged {
                side: transition.side,
                from: transition.from,
                to: transition.to,
            });
        }
    }

    fn runtime(&self) -> Option<Handle> {
        let mut runtime = self.runtime.lock();
        if runtime.is_none() {
            *runtime = Handle::try_current().ok();
        }
        runtime.clone()
    }

    pub(crate) fn spawn<F>(&self, future: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.runtime() {
            Some(runtime) => Some(runtime.spawn(future)),
            None => {
                warn!("No async runtime available; background work dropped");
                None
            }
        }
    }

    /// Forward a track's events into the session. Holds only a weak reference.
    pub(crate) fn spawn_observer(
        inner: &Arc<Self>,
        side: TrackSide,
        track: &VideoTrack,
    ) -> Option<JoinHandle<()>> {
        let weak = Arc::downgrade(inner);
        let mut events = track.subscribe();
        let track_id = track.id().to_string();
        inner.spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(_)) => TrackEvent::Frame,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };
                match event {
                    TrackEvent::Frame => inner.record_activity(side),
                    TrackEvent::Ended => debug!("{} track {} ended", side, track_id),
                    TrackEvent::Error { cause } => inner.handle_track_error(side, cause),
                }
            }
        })
    }

    fn bind_observers(inner: &Arc<Self>, session: &mut Session) {
        for side in TrackSide::ALL {
            if let Some(observer) = session.observer_mut(side).take() {
                observer.abort();
            }
            let observer = session
                .track(side)
                .and_then(|track| Self::spawn_observer(inner, side, track));
            *session.observer_mut(side) = observer;
        }
    }

    fn start_ticking(inner: &Arc<Self>, session: &mut Session) -> Result<(), CallGuardError> {
        let runtime = inner
            .runtime()
            .ok_or_else(|| CallGuardError::RuntimeUnavailable {
                reason: "health checks need a tokio runtime".to_string(),
            })?;
        let weak = Arc::downgrade(inner);
        session
            .health
            .start_ticking(&runtime, inner.config.tick_interval, move || {
                match weak.upgrade() {
                    Some(inner) => {
                        inner.health_check();
                        ControlFlow::Continue(())
                    }
                    None => ControlFlow::Break(()),
                }
            });
        Ok(())
    }

    fn listen(inner: &Arc<Self>, session: &mut Session) {
        if session.listening {
            return;
        }
        let weak = Arc::downgrade(inner);
        inner.notifier.listen(move |reaction| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_peer_reaction(reaction);
            }
        });
        session.listening = true;
    }

    /// One tick of the health check
    fn health_check(self: &Arc<Self>) {
        let now = Instant::now();
        let (outcome, admissions) = {
            let mut session = self.session.lock();
            if session.phase != WatchdogPhase::Monitoring {
                return;
            }
            let signals = session.tick_signals();
            let outcome = session.health.evaluate(now, signals);
            let admissions: Vec<_> = outcome
                .actions
                .iter()
                .filter_map(|action| match action {
                    HealthAction::RecoverLocal(reason) => Some(LocalRecoveryController::admit(
                        &mut session,
                        self.config.max_retries,
                        reason.clone(),
                        false,
                    )),
                    HealthAction::ReportRemote(_) => None,
                })
                .collect();
            (outcome, admissions)
        };

        self.apply_transitions(&outcome.transitions);
        for action in &outcome.actions {
            if let HealthAction::ReportRemote(kind) = action {
                self.notify(*kind, Subject::Recipient);
            }
        }

        let controller = LocalRecoveryController::new(Arc::clone(self));
        for admission in admissions {
            if let Ok(attempt) = controller.accept(admission) {
                controller.spawn(attempt);
            }
        }
    }

    fn record_activity(&self, side: TrackSide) {
        let transition = {
            let mut session = self.session.lock();
            if session.phase != WatchdogPhase::Monitoring {
                return;
            }
            session.health.on_activity(side, Instant::now())
        };
        if let Some(transition) = transition {
            self.apply_transitions(&[transition]);
        }
    }

    fn handle_track_error(self: &Arc<Self>, side: TrackSide, cause: String) {
        warn!("🚨 {} track error: {}", side, cause);
        let (transition, admission) = {
            let mut session = self.session.lock();
            if session.phase != WatchdogPhase::Monitoring {
                return;
            }
            match side {
                TrackSide::Local => {
                    if session.recovering || session.health.state(side).is_terminal() {
                        debug!("Local track error ignored while recovering or unavailable");
                        return;
                    }
                    let transition =
                        session
                            .health
                            .set_state(side, TrackHealthState::Erred, &cause);
                    let admission = LocalRecoveryController::admit(
                        &mut session,
                        self.config.max_retries,
                        RecoveryReason::TrackError(cause),
                        false,
                    );
                    (transition, Some(admission))
                }
                TrackSide::Remote => (
                    session
                        .health
                        .set_state(side, TrackHealthState::Erred, &cause),
                    None,
                ),
            }
        };

        let reported = transition.is_some();
        self.apply_transitions(transition.as_slice());
        match admission {
            Some(admission) => {
                let controller = LocalRecoveryController::new(Arc::clone(self));
                if let Ok(attempt) = controller.accept(admission) {
                    controller.spawn(attempt);
                }
            }
            None if reported => self.notify(StatusKind::LocalProblem, Subject::Recipient),
            None => {}
        }
    }

    fn handle_peer_reaction(self: &Arc<Self>, reaction: PeerReaction) {
        match reaction {
            PeerReaction::Ignored => {}
            PeerReaction::Informational(envelope) => {
                self.emit(WatchdogEvent::PeerStatus { envelope });
            }
            PeerReaction::RecoverLocal(envelope) => {
                let kind = envelope.kind;
                self.emit(WatchdogEvent::PeerStatus { envelope });

                let (transition, admission) = {
                    let mut session = self.session.lock();
                    if session.phase != WatchdogPhase::Monitoring {
                        return;
                    }
                    let admission = LocalRecoveryController::admit(
                        &mut session,
                        self.config.max_retries,
                        RecoveryReason::PeerReport(kind),
                        false,
                    );
                    // a refused report leaves the local state alone
                    let admitted = admission.is_ok();
                    let transition = if admitted
                        && session.health.state(TrackSide::Local).is_healthy()
                    {
                        let state = match kind {
                            StatusKind::LocalFrozen => TrackHealthState::Frozen,
                            _ => TrackHealthState::Erred,
                        };
                        session
                            .health
                            .set_state(TrackSide::Local, state, "reported by peer")
                    } else {
                        None
                    };
                    (transition, admission)
                };

                self.apply_transitions(transition.as_slice());
                let controller = LocalRecoveryController::new(Arc::clone(self));
                if let Ok(attempt) = controller.accept(admission) {
                    controller.spawn(attempt);
                }
            }
        }
    }
}

/// Monitors the local and remote video tracks of one call and repairs the
/// local camera when it stalls.
///
/// ```rust,no_run
/// use callguard::{CameraWatchdog, MockCaptureGateway, MockPeerConnection, LoopbackDataChannel};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), callguard::CallGuardError> {
/// let (channel, _peer_side) = LoopbackDataChannel::pair();
/// let watchdog = CameraWatchdog::builder(
///     Arc::new(MockCaptureGateway::new()),
///     Arc::new(MockPeerConnection::connected()),
///     channel,
/// )
/// .build()?;
///
/// watchdog.start()?;
/// println!("{:?}", watchdog.status());
/// # Ok(())
/// # }
/// ```
pub struct CameraWatchdog {
    inner: Arc<WatchdogInner>,
}

impl CameraWatchdog {
    /// Create a builder with the three required collaborators
    pub fn builder(
        gateway: Arc<dyn MediaCaptureGateway>,
        peer: Arc<dyn PeerConnection>,
        data_channel: Arc<dyn DataChannel>,
    ) -> WatchdogBuilder {
        WatchdogBuilder {
            gateway,
            peer,
            data_channel,
            config: WatchdogConfig::default(),
            preview: None,
            origin_id: None,
            local_track: None,
            remote_track: None,
        }
    }

    /// Begin monitoring: bind track observers and the data channel handler,
    /// seed both activity timestamps to now, and start ticking.
    pub fn start(&self) -> Result<(), CallGuardError> {
        {
            let mut session = self.inner.session.lock();
            if session.phase != WatchdogPhase::Idle {
                return Err(CallGuardError::InvalidState {
                    expected: WatchdogPhase::Idle.to_string(),
                    actual: session.phase.to_string(),
                });
            }
            WatchdogInner::start_ticking(&self.inner, &mut session)?;
            session.phase = WatchdogPhase::Monitoring;
            session.health.reset(Instant::now());
            WatchdogInner::bind_observers(&self.inner, &mut session);
            WatchdogInner::listen(&self.inner, &mut session);
        }
        info!(
            "👀 Camera watchdog started (origin {})",
            self.inner.notifier.origin_id()
        );
        self.inner.emit(WatchdogEvent::Started);
        Ok(())
    }

    /// Stop monitoring. Idempotent. A recovery already in flight is left to
    /// finish; it installs the new track but changes no state.
    pub fn stop(&self) {
        {
            let mut session = self.inner.session.lock();
            if session.phase == WatchdogPhase::Stopped {
                return;
            }
            session.phase = WatchdogPhase::Stopped;
            session.epoch += 1;
            session.cancel_background();
        }
        info!("🛑 Camera watchdog stopped");
        self.inner.emit(WatchdogEvent::Stopped);
    }

    /// Re-seed the session from any phase: fresh timestamps, both sides
    /// Active, retry budget restored, ticking resumed.
    pub fn restart(&self) -> Result<(), CallGuardError> {
        let transitions = {
            let mut session = self.inner.session.lock();
            WatchdogInner::start_ticking(&self.inner, &mut session)?;
            session.epoch += 1;
            if let Some(pending) = session.pending_retry.take() {
                pending.abort();
            }
            session.retry_count = 0;
            session.phase = WatchdogPhase::Monitoring;
            let transitions = session.health.reset(Instant::now());
            WatchdogInner::bind_observers(&self.inner, &mut session);
            WatchdogInner::listen(&self.inner, &mut session);
            transitions
        };
        info!("🔁 Camera watchdog restarted");
        self.inner.apply_transitions(&transitions);
        self.inner.emit(WatchdogEvent::Restarted);
        Ok(())
    }

    /// Current health snapshot
    pub fn status(&self) -> WatchdogStatus {
        let session = self.inner.session.lock();
        let phase = match session.phase {
            WatchdogPhase::Monitoring if session.health.is_paused() => WatchdogPhase::Recovering,
            phase => phase,
        };
        WatchdogStatus {
            phase,
            local_state: session.health.state(TrackSide::Local),
            remote_state: session.health.state(TrackSide::Remote),
            last_local_activity: session.health.last_activity(TrackSide::Local),
            last_remote_activity: session.health.last_activity(TrackSide::Remote),
            retry_count: session.retry_count,
        }
    }

    /// Record a frame or progress signal for `side`
    pub fn on_activity(&self, side: TrackSide) {
        self.inner.record_activity(side);
    }

    /// Report a track failure for `side`
    pub fn on_track_error(&self, side: TrackSide, cause: impl Into<String>) {
        self.inner.handle_track_error(side, cause.into());
    }

    /// Run the local recovery sequence now
    pub async fn recover(&self, reason: RecoveryReason) -> Result<(), RecoveryError> {
        self.recovery_controller().recover(reason).await
    }

    /// Controller for the local camera of this session
    pub fn recovery_controller(&self) -> LocalRecoveryController {
        LocalRecoveryController::new(Arc::clone(&self.inner))
    }

    /// Replace the local track handle, e.g. after the app re-opened the camera itself
    pub fn set_local_track(&self, track: VideoTrack) {
        self.set_track(TrackSide::Local, track);
    }

    /// Attach the track received from the peer
    pub fn set_remote_track(&self, track: VideoTrack) {
        self.set_track(TrackSide::Remote, track);
    }

    fn set_track(&self, side: TrackSide, track: VideoTrack) {
        let transition = {
            let mut session = self.inner.session.lock();
            if let Some(observer) = session.observer_mut(side).take() {
                observer.abort();
            }
            if session.phase == WatchdogPhase::Monitoring {
                *session.observer_mut(side) =
                    WatchdogInner::spawn_observer(&self.inner, side, &track);
            }
            debug!("Attached {} track {}", side, track.id());
            match side {
                TrackSide::Local => session.local_track = Some(track),
                TrackSide::Remote => session.remote_track = Some(track),
            }
            let transition = if session.health.state(side).is_terminal() {
                None
            } else {
                session
                    .health
                    .set_state(side, TrackHealthState::Active, "track attached")
            };
            session.health.on_activity(side, Instant::now());
            transition
        };
        self.inner.apply_transitions(transition.as_slice());
    }

    /// Currently bound local track
    pub fn local_track(&self) -> Option<VideoTrack> {
        self.inner.session.lock().local_track.clone()
    }

    /// Subscribe to watchdog events
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    /// Recent health transitions, oldest first
    pub fn history(&self) -> Vec<TransitionRecord> {
        self.inner.history.entries()
    }

    /// Identifier this endpoint stamps on outbound envelopes
    pub fn origin_id(&self) -> &str {
        self.inner.notifier.origin_id()
    }

    /// Active configuration
    pub fn config(&self) -> &WatchdogConfig {
        &self.inner.config
    }
}

impl Drop for CameraWatchdog {
    fn drop(&mut self) {
        self.inner.session.lock().cancel_background();
    }
}

impl fmt::Debug for CameraWatchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraWatchdog")
            .field("origin_id", &self.origin_id())
            .field("status", &self.status())
            .finish()
    }
}

/// Fluent builder for [`CameraWatchdog`]
pub struct WatchdogBuilder {
    gateway: Arc<dyn MediaCaptureGateway>,
    peer: Arc<dyn PeerConnection>,
    data_channel: Arc<dyn DataChannel>,
    config: WatchdogConfig,
    preview: Option<Arc<dyn PreviewSink>>,
    origin_id: Option<String>,
    local_track: Option<VideoTrack>,
    remote_track: Option<VideoTrack>,
}

impl WatchdogBuilder {
    /// Use a custom configuration
    pub fn config(mut self, config: WatchdogConfig) -> Self {
        self.config = config;
        self
    }

    /// Surface the recovered camera should be rendered to
    pub fn preview(mut self, preview: Arc<dyn PreviewSink>) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Identifier stamped on outbound envelopes (random when unset)
    pub fn origin_id(mut self, origin_id: impl Into<String>) -> Self {
        self.origin_id = Some(origin_id.into());
        self
    }

    /// Local camera track captured at call start
    pub fn local_track(mut self, track: VideoTrack) -> Self {
        self.local_track = Some(track);
        self
    }

    /// Track received from the peer
    pub fn remote_track(mut self, track: VideoTrack) -> Self {
        self.remote_track = Some(track);
        self
    }

    /// Validate the configuration and build the watchdog in the Idle phase
    pub fn build(self) -> Result<CameraWatchdog, CallGuardError> {
        self.config.validate()?;

        let origin_id = self
            .origin_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let notifier = PeerNotificationChannel::new(self.data_channel, origin_id)
            .with_peer_reports(self.config.honor_peer_reports);
        let health = HealthTracker::new(
            self.config.local_freeze_threshold,
            self.config.remote_freeze_threshold,
            Instant::now(),
        );
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let session = Session {
            phase: WatchdogPhase::Idle,
            health,
            retry_count: 0,
            recovering: false,
            epoch: 0,
            listening: false,
            local_track: self.local_track,
            remote_track: self.remote_track,
            local_observer: None,
            remote_observer: None,
            pending_retry: None,
        };

        Ok(CameraWatchdog {
            inner: Arc::new(WatchdogInner {
                history: TransitionLog::new(self.config.history_capacity),
                config: self.config,
                gateway: self.gateway,
                peer: self.peer,
                preview: self.preview.unwrap_or_else(|| Arc::new(NullPreview)),
                notifier,
                session: Mutex::new(session),
                events,
                runtime: Mutex::new(None),
            }),
        })
    }
}

impl fmt::Debug for WatchdogBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchdogBuilder")
            .field("config", &self.config)
            .field("origin_id", &self.origin_id)
            .finish_non_exhaustive()
    }
}
