//! Bounded-retry repair of the local camera track
//!
//! Only the local side is ever repaired here. The remote peer's camera is out
//! of our reach, so problems with it are reported and nothing more.

use crate::event::WatchdogEvent;
use crate::health::Transition;
use crate::watchdog::{Session, WatchdogInner, WatchdogPhase};
use callguard_core::{RecoveryError, TrackHealthState, TrackSide, VideoTrack};
use callguard_media::MediaError;
use callguard_signaling::{StatusKind, Subject};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Why a recovery was requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryReason {
    /// No local frames within the freeze threshold
    Frozen,
    /// The local track reported ended
    TrackEnded,
    /// The capture source reported a failure
    TrackError(String),
    /// The peer reported our outbound feed as broken
    PeerReport(StatusKind),
    /// Requested by the application
    Manual,
}

impl RecoveryReason {
    /// Notification kind sent to the peer when an attempt fails
    pub fn failure_kind(&self) -> StatusKind {
        match self {
            RecoveryReason::Frozen | RecoveryReason::PeerReport(StatusKind::LocalFrozen) => {
                StatusKind::LocalFrozen
            }
            _ => StatusKind::LocalProblem,
        }
    }
}

impl fmt::Display for RecoveryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryReason::Frozen => write!(f, "camera frozen"),
            RecoveryReason::TrackEnded => write!(f, "camera track ended"),
            RecoveryReason::TrackError(cause) => write!(f, "camera error: {}", cause),
            RecoveryReason::PeerReport(kind) => write!(f, "peer reported {:?}", kind),
            RecoveryReason::Manual => write!(f, "manual request"),
        }
    }
}

/// One admitted run of the recovery sequence
#[derive(Debug)]
pub(crate) struct RecoveryAttempt {
    number: u32,
    epoch: u64,
    reason: RecoveryReason,
}

/// Why an attempt was not admitted, plus the transition the refusal caused
#[derive(Debug)]
pub(crate) struct Rejection {
    error: RecoveryError,
    transition: Option<Transition>,
}

/// Runs the local camera recovery sequence for one watchdog session
#[derive(Clone)]
pub struct LocalRecoveryController {
    inner: Arc<WatchdogInner>,
}

impl LocalRecoveryController {
    pub(crate) fn new(inner: Arc<WatchdogInner>) -> Self {
        Self { inner }
    }

    /// Run the full sequence: release, settle, reacquire, hot-swap.
    ///
    /// Returns [`RecoveryError::Busy`] immediately when a sequence is already
    /// running. On failure another attempt is scheduled after the backoff
    /// while retry budget remains.
    pub async fn recover(&self, reason: RecoveryReason) -> Result<(), RecoveryError> {
        let admission = {
            let mut session = self.inner.session.lock();
            Self::admit(&mut session, self.inner.config.max_retries, reason, false)
        };
        let attempt = self.accept(admission)?;
        self.run(attempt).await
    }

    /// Admission check, run under the session lock so that a following tick
    /// already sees ticking paused.
    pub(crate) fn admit(
        session: &mut Session,
        max_retries: u32,
        reason: RecoveryReason,
        from_retry: bool,
    ) -> Result<RecoveryAttempt, Rejection> {
        if from_retry {
            session.pending_retry = None;
        }
        if session.recovering {
            return Err(Rejection {
                error: RecoveryError::Busy,
                transition: None,
            });
        }
        if session.phase != WatchdogPhase::Monitoring {
            return Err(Rejection {
                error: RecoveryError::NotMonitoring {
                    phase: session.phase.to_string(),
                },
                transition: None,
            });
        }
        if let Some(pending) = session.pending_retry.take() {
            pending.abort();
        }
        if session.retry_count >= max_retries
            || session.health.state(TrackSide::Local).is_terminal()
        {
            let transition = session.health.set_state(
                TrackSide::Local,
                TrackHealthState::Unavailable,
                "retries exhausted",
            );
            return Err(Rejection {
                error: RecoveryError::RetriesExhausted {
                    attempts: session.retry_count,
                },
                transition,
            });
        }

        session.retry_count += 1;
        session.recovering = true;
        session.health.pause();
        Ok(RecoveryAttempt {
            number: session.retry_count,
            epoch: session.epoch,
            reason,
        })
    }

    /// Carry out the side effects of an admission outside the session lock
    pub(crate) fn accept(
        &self,
        admission: Result<RecoveryAttempt, Rejection>,
    ) -> Result<RecoveryAttempt, RecoveryError> {
        match admission {
            Ok(attempt) => Ok(attempt),
            Err(Rejection { error, transition }) => {
                if let Some(transition) = transition {
                    warn!("📵 Local camera unavailable: {}", error);
                    self.inner.apply_transitions(std::slice::from_ref(&transition));
                    self.inner
                        .notify(StatusKind::LocalUnavailable, Subject::Sender);
                    self.inner.emit(WatchdogEvent::RecoveryFailed {
                        attempt: 0,
                        error: error.clone(),
                    });
                } else {
                    debug!("Recovery not started: {}", error);
                }
                Err(error)
            }
        }
    }

    /// Run an admitted attempt in the background
    pub(crate) fn spawn(&self, attempt: RecoveryAttempt) -> Option<JoinHandle<()>> {
        let controller = self.clone();
        self.inner.spawn(async move {
            let _ = controller.run(attempt).await;
        })
    }

    pub(crate) async fn run(&self, attempt: RecoveryAttempt) -> Result<(), RecoveryError> {
        let config = &self.inner.config;
        info!(
            "🔧 Recovering local camera (attempt {}/{}): {}",
            attempt.number, config.max_retries, attempt.reason
        );
        self.inner.emit(WatchdogEvent::RecoveryStarted {
            attempt: attempt.number,
            reason: attempt.reason.to_string(),
        });

        let stale = {
            let mut session = self.inner.session.lock();
            if let Some(observer) = session.local_observer.take() {
                observer.abort();
            }
            session.local_track.take()
        };
        if let Some(stale) = stale {
            debug!("Releasing stale local track {}", stale.id());
            self.inner.gateway.release_track(&stale);
        }

        tokio::time::sleep(config.settle_delay).await;

        match self
            .inner
            .gateway
            .acquire_local_video_track(&config.capture)
            .await
        {
            Ok(track) => {
                self.complete(attempt, track).await;
                Ok(())
            }
            Err(e) => Err(self.fail(attempt, e)),
        }
    }

    async fn complete(&self, attempt: RecoveryAttempt, track: VideoTrack) {
        self.inner.preview.attach(&track);

        let connection = self.inner.peer.connection_state();
        if connection.is_connected() {
            if let Err(e) = self.inner.peer.replace_outbound_video_track(&track).await {
                warn!("Outbound track replacement failed, keeping new capture: {}", e);
            }
        } else {
            debug!(
                "Skipping outbound track replacement while connection is {}",
                connection
            );
            self.inner
                .emit(WatchdogEvent::TrackReplaceSkipped { state: connection });
        }

        let now = Instant::now();
        let (current, transitions) = {
            let mut session = self.inner.session.lock();
            session.recovering = false;
            session.local_track = Some(track.clone());
            if let Some(observer) = session.local_observer.take() {
                observer.abort();
            }
            if session.phase == WatchdogPhase::Monitoring {
                session.local_observer =
                    WatchdogInner::spawn_observer(&self.inner, TrackSide::Local, &track);
            }

            let current = session.epoch == attempt.epoch;
            let mut transitions = Vec::new();
            if !current && session.phase == WatchdogPhase::Monitoring {
                // freeze detection for the installed track starts now
                session.health.on_activity(TrackSide::Local, now);
            }
            if current {
                session.retry_count = 0;
                transitions.extend(session.health.set_state(
                    TrackSide::Local,
                    TrackHealthState::Active,
                    "camera reacquired",
                ));
                session.health.on_activity(TrackSide::Local, now);
                session.health.resume();
            }
            (current, transitions)
        };

        if !current {
            debug!(
                "Recovery attempt {} was superseded; keeping track {} only",
                attempt.number,
                track.id()
            );
            return;
        }

        info!("✅ Local camera recovered with track {}", track.id());
        self.inner.apply_transitions(&transitions);
        self.inner
            .notify(StatusKind::LocalRecovered, Subject::Sender);
        self.inner.emit(WatchdogEvent::RecoverySucceeded {
            attempt: attempt.number,
            track_id: track.id().to_string(),
        });
    }

    fn fail(&self, attempt: RecoveryAttempt, cause: MediaError) -> RecoveryError {
        let recoverable = cause.is_recoverable();
        let error = RecoveryError::Acquisition {
            attempt: attempt.number,
            reason: cause.to_string(),
        };
        warn!("⚠️ Camera reacquire failed: {}", error);

        let max_retries = self.inner.config.max_retries;
        let (current, exhausted, transitions) = {
            let mut session = self.inner.session.lock();
            session.recovering = false;
            if session.epoch != attempt.epoch {
                (false, false, Vec::new())
            } else {
                let mut transitions = Vec::new();
                transitions.extend(session.health.set_state(
                    TrackSide::Local,
                    TrackHealthState::Erred,
                    "camera reacquire failed",
                ));
                session.health.resume();

                let exhausted = !recoverable || session.retry_count >= max_retries;
                if exhausted {
                    let cause = if recoverable {
                        "retries exhausted"
                    } else {
                        "camera cannot be reacquired"
                    };
                    transitions.extend(session.health.set_state(
                        TrackSide::Local,
                        TrackHealthState::Unavailable,
                        cause,
                    ));
                } else if session.phase == WatchdogPhase::Monitoring {
                    session.pending_retry = self.schedule_retry(attempt.reason.clone());
                }
                (true, exhausted, transitions)
            }
        };

        if !current {
            debug!("Ignoring superseded failed attempt {}", attempt.number);
            return error;
        }

        self.inner.apply_transitions(&transitions);
        self.inner
            .notify(attempt.reason.failure_kind(), Subject::Sender);
        if exhausted {
            warn!(
                "📵 Giving up on local camera after {} attempt(s); call continues without it",
                attempt.number
            );
            self.inner
                .notify(StatusKind::LocalUnavailable, Subject::Sender);
        }
        self.inner.emit(WatchdogEvent::RecoveryFailed {
            attempt: attempt.number,
            error: error.clone(),
        });
        error
    }

    fn schedule_retry(&self, reason: RecoveryReason) -> Option<JoinHandle<()>> {
        let controller = self.clone();
        let backoff = self.inner.config.retry_backoff;
        debug!("Scheduling camera retry in {:?}", backoff);
        self.inner.spawn(async move {
            tokio::time::sleep(backoff).await;
            let admission = {
                let mut session = controller.inner.session.lock();
                Self::admit(
                    &mut session,
                    controller.inner.config.max_retries,
                    reason,
                    true,
                )
            };
            match controller.accept(admission) {
                Ok(attempt) => {
                    let _ = controller.run(attempt).await;
                }
                Err(e) => debug!("Scheduled camera retry skipped: {}", e),
            }
        })
    }
}

impl fmt::Debug for LocalRecoveryController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRecoveryController").finish_non_exhaustive()
    }
}
