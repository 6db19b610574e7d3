//! Track activity bookkeeping and the periodic health check

use crate::recovery::RecoveryReason;
use callguard_core::{TrackHealthState, TrackSide};
use callguard_signaling::StatusKind;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// A state change produced by the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Track side
    pub side: TrackSide,
    /// Previous state
    pub from: TrackHealthState,
    /// New state
    pub to: TrackHealthState,
    /// What caused the change
    pub cause: String,
}

/// Follow-up work requested by a health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthAction {
    /// Run the local recovery sequence
    RecoverLocal(RecoveryReason),
    /// Tell the peer its outbound feed looks broken from here
    ReportRemote(StatusKind),
}

/// Result of one health check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// State changes made by the check
    pub transitions: Vec<Transition>,
    /// Work the caller must carry out
    pub actions: Vec<HealthAction>,
}

/// Session facts sampled at tick time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackSignals {
    /// Local track has ended
    pub local_ended: bool,
    /// Remote track has ended
    pub remote_ended: bool,
    /// A local recovery is in flight, possibly one started before a restart
    pub local_recovering: bool,
}

#[derive(Debug, Clone, Copy)]
struct SideHealth {
    state: TrackHealthState,
    last_activity: Instant,
}

/// Last-seen activity and health classification for both call tracks
#[derive(Debug)]
pub struct HealthTracker {
    local: SideHealth,
    remote: SideHealth,
    local_threshold: Duration,
    remote_threshold: Duration,
    paused: bool,
    ticker: Option<JoinHandle<()>>,
}

impl HealthTracker {
    /// Create a tracker with both sides Active as of `now`
    pub fn new(local_threshold: Duration, remote_threshold: Duration, now: Instant) -> Self {
        let seeded = SideHealth {
            state: TrackHealthState::Active,
            last_activity: now,
        };
        Self {
            local: seeded,
            remote: seeded,
            local_threshold,
            remote_threshold,
            paused: false,
            ticker: None,
        }
    }

    fn side(&self, side: TrackSide) -> &SideHealth {
        match side {
            TrackSide::Local => &self.local,
            TrackSide::Remote => &self.remote,
        }
    }

    fn side_mut(&mut self, side: TrackSide) -> &mut SideHealth {
        match side {
            TrackSide::Local => &mut self.local,
            TrackSide::Remote => &mut self.remote,
        }
    }

    /// Current state of a side
    pub fn state(&self, side: TrackSide) -> TrackHealthState {
        self.side(side).state
    }

    /// Last time activity was recorded for a side
    pub fn last_activity(&self, side: TrackSide) -> Instant {
        self.side(side).last_activity
    }

    /// Make ticks inert until [`HealthTracker::resume`]
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Re-enable ticks
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Whether ticks are currently inert
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Move a side to `state`, returning the transition if it changed
    pub fn set_state(
        &mut self,
        side: TrackSide,
        state: TrackHealthState,
        cause: &str,
    ) -> Option<Transition> {
        let entry = self.side_mut(side);
        if entry.state == state {
            return None;
        }
        let from = entry.state;
        entry.state = state;
        debug!("🔄 {} track health: {} -> {} ({})", side, from, state, cause);
        Some(Transition {
            side,
            from,
            to: state,
            cause: cause.to_string(),
        })
    }

    /// Record activity for a side.
    ///
    /// The remote side goes back to Active when its feed resumes; the local
    /// side only changes state through recovery.
    pub fn on_activity(&mut self, side: TrackSide, now: Instant) -> Option<Transition> {
        self.side_mut(side).last_activity = now;
        match (side, self.state(side)) {
            (TrackSide::Remote, TrackHealthState::Frozen | TrackHealthState::Erred) => {
                self.set_state(side, TrackHealthState::Active, "activity resumed")
            }
            _ => None,
        }
    }

    /// Re-seed both sides to Active at `now` and re-enable ticks
    pub fn reset(&mut self, now: Instant) -> Vec<Transition> {
        let mut transitions = Vec::new();
        for side in TrackSide::ALL {
            transitions.extend(self.set_state(side, TrackHealthState::Active, "session reset"));
            self.side_mut(side).last_activity = now;
        }
        self.paused = false;
        transitions
    }

    /// Classify both sides as of `now`.
    ///
    /// Only Active sides are examined, so a stall produces one transition and
    /// one action rather than one per tick. The local side is skipped while a
    /// recovery is in flight since it could not be admitted anyway.
    pub fn evaluate(&mut self, now: Instant, signals: TrackSignals) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.paused {
            return outcome;
        }

        if self.local.state == TrackHealthState::Active && !signals.local_recovering {
            let idle = now.saturating_duration_since(self.local.last_activity);
            if signals.local_ended {
                outcome.transitions.extend(self.set_state(
                    TrackSide::Local,
                    TrackHealthState::Erred,
                    "local track ended",
                ));
                outcome
                    .actions
                    .push(HealthAction::RecoverLocal(RecoveryReason::TrackEnded));
            } else if idle > self.local_threshold {
                info!("🧊 Local camera frozen: no frames for {:?}", idle);
                outcome.transitions.extend(self.set_state(
                    TrackSide::Local,
                    TrackHealthState::Frozen,
                    "no local frames",
                ));
                outcome
                    .actions
                    .push(HealthAction::RecoverLocal(RecoveryReason::Frozen));
            }
        }

        if self.remote.state == TrackHealthState::Active {
            let idle = now.saturating_duration_since(self.remote.last_activity);
            if signals.remote_ended {
                outcome.transitions.extend(self.set_state(
                    TrackSide::Remote,
                    TrackHealthState::Erred,
                    "remote track ended",
                ));
                outcome
                    .actions
                    .push(HealthAction::ReportRemote(StatusKind::LocalProblem));
            } else if idle > self.remote_threshold {
                info!("🧊 Remote video frozen: no frames for {:?}", idle);
                outcome.transitions.extend(self.set_state(
                    TrackSide::Remote,
                    TrackHealthState::Frozen,
                    "no remote frames",
                ));
                outcome
                    .actions
                    .push(HealthAction::ReportRemote(StatusKind::LocalProblem));
            }
        }

        outcome
    }

    /// Begin calling `on_tick` every `interval`, replacing any running schedule.
    /// The schedule ends when `on_tick` returns `Break`.
    pub fn start_ticking<F>(&mut self, runtime: &Handle, interval: Duration, mut on_tick: F)
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        self.stop_ticking();
        self.ticker = Some(runtime.spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                if on_tick().is_break() {
                    break;
                }
            }
        }));
    }

    /// Cancel the schedule. Idempotent.
    pub fn stop_ticking(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Whether a schedule is running
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for HealthTracker {
    fn drop(&mut self) {
        self.stop_ticking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: Duration = Duration::from_millis(10_000);
    const REMOTE: Duration = Duration::from_millis(15_000);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_activity_within_threshold_keeps_local_active() {
        let start = Instant::now();
        let mut tracker = HealthTracker::new(LOCAL, REMOTE, start);

        for step in 1..=10u64 {
            let now = start + ms(step * 9_999);
            tracker.on_activity(TrackSide::Local, now);
            tracker.on_activity(TrackSide::Remote, now);
            let outcome = tracker.evaluate(now + ms(9_999), TrackSignals::default());
            assert!(outcome.actions.is_empty());
        }
        assert_eq!(tracker.state(TrackSide::Local), TrackHealthState::Active);
    }

    #[test]
    fn test_local_freeze_triggers_single_recovery() {
        let start = Instant::now();
        let mut tracker = HealthTracker::new(LOCAL, REMOTE, start);

        assert!(tracker
            .evaluate(start + ms(10_000), TrackSignals::default())
            .actions
            .is_empty());

        let outcome = tracker.evaluate(start + ms(11_000), TrackSignals::default());
        assert_eq!(
            outcome.actions,
            vec![HealthAction::RecoverLocal(RecoveryReason::Frozen)]
        );
        assert_eq!(tracker.state(TrackSide::Local), TrackHealthState::Frozen);

        let again = tracker.evaluate(start + ms(12_000), TrackSignals::default());
        assert!(again.actions.is_empty());
    }

    #[test]
    fn test_remote_freeze_is_report_only() {
        let start = Instant::now();
        let mut tracker = HealthTracker::new(LOCAL, REMOTE, start);
        tracker.on_activity(TrackSide::Local, start + ms(15_000));

        let outcome = tracker.evaluate(start + ms(16_000), TrackSignals::default());

        assert_eq!(
            outcome.actions,
            vec![HealthAction::ReportRemote(StatusKind::LocalProblem)]
        );
        assert_eq!(tracker.state(TrackSide::Remote), TrackHealthState::Frozen);
        assert_eq!(tracker.state(TrackSide::Local), TrackHealthState::Active);
    }

    #[test]
    fn test_ended_tracks_detected_regardless_of_idle() {
        let start = Instant::now();
        let mut tracker = HealthTracker::new(LOCAL, REMOTE, start);

        let outcome = tracker.evaluate(
            start + ms(1),
            TrackSignals {
                local_ended: true,
                remote_ended: true,
                local_recovering: false,
            },
        );

        assert_eq!(
            outcome.actions,
            vec![
                HealthAction::RecoverLocal(RecoveryReason::TrackEnded),
                HealthAction::ReportRemote(StatusKind::LocalProblem),
            ]
        );
        assert_eq!(tracker.state(TrackSide::Local), TrackHealthState::Erred);
        assert_eq!(tracker.state(TrackSide::Remote), TrackHealthState::Erred);
    }

    #[test]
    fn test_local_side_skipped_while_recovery_in_flight() {
        let start = Instant::now();
        let mut tracker = HealthTracker::new(LOCAL, REMOTE, start);
        tracker.on_activity(TrackSide::Remote, start + ms(20_000));

        let outcome = tracker.evaluate(
            start + ms(25_000),
            TrackSignals {
                local_ended: true,
                local_recovering: true,
                ..TrackSignals::default()
            },
        );

        assert_eq!(outcome, TickOutcome::default());
        assert_eq!(tracker.state(TrackSide::Local), TrackHealthState::Active);

        let outcome = tracker.evaluate(start + ms(26_000), TrackSignals::default());
        assert_eq!(
            outcome.actions,
            vec![HealthAction::RecoverLocal(RecoveryReason::Frozen)]
        );
    }

    #[test]
    fn test_paused_tracker_is_inert() {
        let start = Instant::now();
        let mut tracker = HealthTracker::new(LOCAL, REMOTE, start);
        tracker.pause();

        let outcome = tracker.evaluate(start + ms(60_000), TrackSignals::default());

        assert_eq!(outcome, TickOutcome::default());
        assert_eq!(tracker.state(TrackSide::Local), TrackHealthState::Active);
    }

    #[test]
    fn test_remote_activity_restores_active() {
        let start = Instant::now();
        let mut tracker = HealthTracker::new(LOCAL, REMOTE, start);
        tracker.on_activity(TrackSide::Local, start + ms(15_500));
        tracker.evaluate(start + ms(16_000), TrackSignals::default());

        let transition = tracker.on_activity(TrackSide::Remote, start + ms(17_000));

        assert_eq!(transition.unwrap().to, TrackHealthState::Active);
    }

    #[test]
    fn test_local_activity_does_not_leave_frozen() {
        let start = Instant::now();
        let mut tracker = HealthTracker::new(LOCAL, REMOTE, start);
        tracker.evaluate(start + ms(11_000), TrackSignals::default());

        assert!(tracker
            .on_activity(TrackSide::Local, start + ms(11_500))
            .is_none());
        assert_eq!(tracker.state(TrackSide::Local), TrackHealthState::Frozen);
    }

    #[test]
    fn test_reset_reseeds_both_sides() {
        let start = Instant::now();
        let mut tracker = HealthTracker::new(LOCAL, REMOTE, start);
        tracker.set_state(TrackSide::Local, TrackHealthState::Unavailable, "test");
        tracker.pause();

        let later = start + ms(30_000);
        let transitions = tracker.reset(later);

        assert_eq!(transitions.len(), 1);
        assert!(!tracker.is_paused());
        assert_eq!(tracker.last_activity(TrackSide::Remote), later);
        assert_eq!(tracker.state(TrackSide::Local), TrackHealthState::Active);
    }
}
