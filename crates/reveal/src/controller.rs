use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use shared::domain::ProposalRecord;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    contact::ContactLinkBuilder,
    decline::{discouragement_for, EvasionPolicy, Offset},
    stage::{transition, RevealEvent, Stage, Transition},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTimings {
    pub intro: Duration,
    pub message: Duration,
    pub celebration: Duration,
}

impl Default for RevealTimings {
    fn default() -> Self {
        Self {
            intro: Duration::from_millis(2_500),
            message: Duration::from_millis(3_500),
            celebration: Duration::from_millis(3_000),
        }
    }
}

impl RevealTimings {
    pub fn delay_for(&self, stage: Stage) -> Option<Duration> {
        match stage {
            Stage::Intro => Some(self.intro),
            Stage::Message => Some(self.message),
            Stage::Celebration => Some(self.celebration),
            Stage::Question | Stage::Contact => None,
        }
    }

    /// Same sequence with every delay multiplied by `factor`. Negative or
    /// non-finite factors leave the timings unchanged; products too large for
    /// a `Duration` saturate at `Duration::MAX`.
    pub fn scaled(&self, factor: f32) -> Self {
        if !factor.is_finite() || factor < 0.0 {
            return *self;
        }
        let scale = |delay: Duration| {
            Duration::try_from_secs_f32(delay.as_secs_f32() * factor).unwrap_or(Duration::MAX)
        };
        Self {
            intro: scale(self.intro),
            message: scale(self.message),
            celebration: scale(self.celebration),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevealSnapshot {
    pub stage: Stage,
    pub reject_offset: Offset,
    pub reject_count: u32,
    /// Message from the most recent decline, cleared when leaving `Question`.
    pub discouragement: Option<&'static str>,
    pub closed: bool,
}

/// Fire-and-forget side effects for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealEffect {
    Celebrate,
    Discourage(&'static str),
}

struct PendingTimer {
    stage: Stage,
    handle: JoinHandle<()>,
}

struct Session {
    stage: Stage,
    reject_offset: Offset,
    reject_count: u32,
    discouragement: Option<&'static str>,
    closed: bool,
    pending: Option<PendingTimer>,
    evasion: EvasionPolicy,
}

impl Session {
    fn snapshot(&self) -> RevealSnapshot {
        RevealSnapshot {
            stage: self.stage,
            reject_offset: self.reject_offset,
            reject_count: self.reject_count,
            discouragement: self.discouragement,
            closed: self.closed,
        }
    }

    /// Counts a decline and moves the control; returns the message to show.
    fn record_decline(&mut self) -> &'static str {
        let message = discouragement_for(self.reject_count);
        self.reject_count = self.reject_count.saturating_add(1);
        self.reject_offset = self.evasion.next_offset();
        self.discouragement = Some(message);
        message
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
            debug!(stage = %pending.stage, "cancelled pending reveal timer");
        }
    }
}

struct Inner {
    record: ProposalRecord,
    timings: RevealTimings,
    contact: Arc<dyn ContactLinkBuilder>,
    session: Mutex<Session>,
    snapshots: watch::Sender<RevealSnapshot>,
    effects: mpsc::UnboundedSender<RevealEffect>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(self: &Arc<Self>, session: &mut Session, event: RevealEvent) -> Transition {
        if session.closed {
            debug!(?event, "reveal session closed; event dropped");
            return Transition::Ignored;
        }

        let outcome = transition(session.stage, event);
        match outcome {
            Transition::Advance(next) => self.enter(session, next),
            Transition::Decline => {
                let message = session.record_decline();
                let _ = self.effects.send(RevealEffect::Discourage(message));
                debug!(reject_count = session.reject_count, "decline control evaded");
            }
            Transition::Evade => {
                session.reject_offset = session.evasion.next_offset();
            }
            Transition::Ignored => {
                debug!(stage = %session.stage, ?event, "reveal event ignored");
                return outcome;
            }
        }
        self.snapshots.send_replace(session.snapshot());
        outcome
    }

    fn enter(self: &Arc<Self>, session: &mut Session, next: Stage) {
        session.cancel_pending();
        info!(
            proposal_id = %self.record.id(),
            from = %session.stage,
            to = %next,
            "reveal stage advanced"
        );
        session.stage = next;
        session.discouragement = None;
        if next == Stage::Celebration {
            let _ = self.effects.send(RevealEffect::Celebrate);
        }
        self.arm_timer(session);
    }

    /// Schedules the one-shot timer of the current stage, at most once per stage.
    fn arm_timer(self: &Arc<Self>, session: &mut Session) {
        let stage = session.stage;
        let Some(delay) = self.timings.delay_for(stage) else {
            return;
        };
        if session
            .pending
            .as_ref()
            .is_some_and(|pending| pending.stage == stage)
        {
            return;
        }

        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire(stage);
            }
        });
        session.pending = Some(PendingTimer { stage, handle });
    }

    fn fire(self: &Arc<Self>, stage: Stage) {
        let mut session = self.lock();
        if session
            .pending
            .as_ref()
            .is_some_and(|pending| pending.stage == stage)
        {
            // Detach rather than abort: this is the task currently running.
            session.pending = None;
        }
        self.apply(&mut session, RevealEvent::TimerElapsed(stage));
    }
}

/// Owns one reveal session. Dropping the controller tears the session down.
pub struct RevealController {
    inner: Arc<Inner>,
}

impl RevealController {
    /// Enters `Intro` and schedules its timer. Must be called within a tokio runtime.
    pub fn start(
        record: ProposalRecord,
        timings: RevealTimings,
        contact: Arc<dyn ContactLinkBuilder>,
    ) -> (Self, mpsc::UnboundedReceiver<RevealEffect>) {
        Self::start_with_policy(record, timings, contact, EvasionPolicy::from_entropy())
    }

    pub fn start_with_policy(
        record: ProposalRecord,
        timings: RevealTimings,
        contact: Arc<dyn ContactLinkBuilder>,
        evasion: EvasionPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<RevealEffect>) {
        let session = Session {
            stage: Stage::INITIAL,
            reject_offset: Offset::default(),
            reject_count: 0,
            discouragement: None,
            closed: false,
            pending: None,
            evasion,
        };
        let (snapshots, _) = watch::channel(session.snapshot());
        let (effects, effects_rx) = mpsc::unbounded_channel();
        info!(proposal_id = %record.id(), "reveal session started");

        let inner = Arc::new(Inner {
            record,
            timings,
            contact,
            session: Mutex::new(session),
            snapshots,
            effects,
        });
        {
            let mut session = inner.lock();
            inner.arm_timer(&mut session);
        }
        (Self { inner }, effects_rx)
    }

    pub fn record(&self) -> &ProposalRecord {
        &self.inner.record
    }

    pub fn stage(&self) -> Stage {
        self.inner.lock().stage
    }

    pub fn snapshot(&self) -> RevealSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<RevealSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn handle(&self, event: RevealEvent) -> Transition {
        let mut session = self.inner.lock();
        self.inner.apply(&mut session, event)
    }

    /// Returns true when the session moved to `Celebration`.
    pub fn accept(&self) -> bool {
        matches!(self.handle(RevealEvent::Accept), Transition::Advance(_))
    }

    /// Returns the discouragement shown for this decline, if it was accepted.
    pub fn decline(&self) -> Option<&'static str> {
        let mut session = self.inner.lock();
        match self.inner.apply(&mut session, RevealEvent::Decline) {
            Transition::Decline => session.discouragement,
            _ => None,
        }
    }

    pub fn hover_decline(&self) -> bool {
        self.handle(RevealEvent::HoverDecline) == Transition::Evade
    }

    /// Outbound link back to the sender; only available on the final stage.
    pub fn contact_action(&self) -> Option<String> {
        if self.stage() != Stage::Contact {
            return None;
        }
        let record = &self.inner.record;
        Some(
            self.inner
                .contact
                .build(record.contact_handle(), record.sender_name()),
        )
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Cancels outstanding timers; later events and timers are ignored.
    pub fn teardown(&self) {
        let mut session = self.inner.lock();
        if session.closed {
            return;
        }
        session.closed = true;
        session.cancel_pending();
        info!(
            proposal_id = %self.inner.record.id(),
            stage = %session.stage,
            "reveal session torn down"
        );
        self.inner.snapshots.send_replace(session.snapshot());
    }
}

impl Drop for RevealController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
