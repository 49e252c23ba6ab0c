use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch, Notify};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::backend::BackendRef;
use crate::config::TICK_INTERVAL;
use crate::error::Result;
use crate::machine::{Effect, Outcome, SessionEvent, SessionMachine};
use crate::registry::{SessionId, SessionRegistry};
use crate::token::{PaymentToken, StatusResponse};

/// Published once per session, when it reaches its terminal outcome.
#[derive(Debug, Clone, Serialize)]
pub struct SessionNotice {
    pub session_id: SessionId,
    pub token: String,
    pub amount: u64,
    pub merchant: String,
    pub outcome: Outcome,
    pub detached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub token: String,
    pub amount: u64,
    pub merchant: String,
    pub outcome: Outcome,
    pub remaining_secs: u64,
    pub detached: bool,
}

struct SessionState {
    machine: SessionMachine,
    token: PaymentToken,
}

/// One payment confirmation in progress.
///
/// Shared between the driver task, the UI handle and the registry. All
/// transitions go through [`Session::apply`] under a single lock.
pub struct Session {
    id: SessionId,
    state: Mutex<SessionState>,
    outcome_tx: watch::Sender<Outcome>,
    notices: broadcast::Sender<SessionNotice>,
    stop: Notify,
    detached: AtomicBool,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        token: PaymentToken,
        ttl_secs: u64,
        notices: broadcast::Sender<SessionNotice>,
    ) -> Self {
        let (outcome_tx, _) = watch::channel(Outcome::Pending);
        Self {
            id,
            state: Mutex::new(SessionState {
                machine: SessionMachine::new(ttl_secs),
                token,
            }),
            outcome_tx,
            notices,
            stop: Notify::new(),
            detached: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn token(&self) -> PaymentToken {
        self.lock().token.clone()
    }

    pub fn token_id(&self) -> String {
        self.lock().token.id.clone()
    }

    pub fn outcome(&self) -> Outcome {
        self.lock().machine.outcome()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.lock().machine.remaining_secs()
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> watch::Receiver<Outcome> {
        self.outcome_tx.subscribe()
    }

    pub fn summary(&self) -> SessionSummary {
        let state = self.lock();
        SessionSummary {
            session_id: self.id,
            token: state.token.id.clone(),
            amount: state.token.amount,
            merchant: state.token.merchant.clone(),
            outcome: state.machine.outcome(),
            remaining_secs: state.machine.remaining_secs(),
            detached: self.is_detached(),
        }
    }

    pub(crate) fn set_detached(&self, detached: bool) {
        self.detached.store(detached, Ordering::Release);
    }

    /// Returns true if this call ended the session.
    pub(crate) fn cancel(&self) -> bool {
        matches!(self.apply(SessionEvent::Cancel), Effect::Terminal(_))
    }

    pub(crate) fn apply(&self, event: SessionEvent) -> Effect {
        let (effect, notice) = {
            let mut state = self.lock();
            let effect = state.machine.apply(event);
            let Effect::Terminal(outcome) = effect else {
                return effect;
            };

            if let Err(e) = state.token.transition(outcome.token_status()) {
                warn!(session = %self.id, "token status not updated: {}", e);
            }
            let notice = SessionNotice {
                session_id: self.id,
                token: state.token.id.clone(),
                amount: state.token.amount,
                merchant: state.token.merchant.clone(),
                outcome,
                detached: self.is_detached(),
            };
            (effect, notice)
        };

        info!(
            session = %self.id,
            token = %notice.token,
            outcome = %notice.outcome,
            detached = notice.detached,
            "payment confirmation session finished"
        );
        self.outcome_tx.send_replace(notice.outcome);
        self.stop.notify_one();
        // No subscribers is fine.
        let _ = self.notices.send(notice);
        effect
    }
}

type StatusFuture = Pin<Box<dyn Future<Output = Result<StatusResponse>> + Send>>;

struct InFlight {
    seq: u64,
    request: StatusFuture,
}

async fn settle(slot: &mut Option<InFlight>) -> (u64, Result<StatusResponse>) {
    match slot {
        Some(in_flight) => {
            let result = (&mut in_flight.request).await;
            (in_flight.seq, result)
        }
        None => std::future::pending().await,
    }
}

/// Runs a session's countdown and poller until the outcome is terminal, then
/// drops it from the registry.
///
/// Countdown ticks, poll ticks, the outstanding status reply and the stop
/// signal are multiplexed on this one task. A status request slower than the
/// poll interval delays the next poll instead of overlapping with it.
pub(crate) async fn drive(
    session: Arc<Session>,
    backend: BackendRef,
    poll_interval: Duration,
    registry: SessionRegistry,
) {
    let start = Instant::now();
    let mut ticks = time::interval_at(start + TICK_INTERVAL, TICK_INTERVAL);
    let mut polls = time::interval_at(start + poll_interval, poll_interval);
    polls.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let token_id = session.token_id();
    let mut in_flight: Option<InFlight> = None;

    loop {
        tokio::select! {
            biased;

            _ = session.stop.notified() => break,

            _ = ticks.tick() => {
                if let Effect::Terminal(_) = session.apply(SessionEvent::Tick) {
                    break;
                }
            }

            (seq, result) = settle(&mut in_flight) => {
                in_flight = None;
                let event = match result {
                    Ok(response) => {
                        debug!(session = %session.id(), seq, is_active = response.is_active, "status reply");
                        SessionEvent::PollResolved { seq, response }
                    }
                    Err(e) => {
                        warn!(session = %session.id(), seq, "status check failed, retrying next interval: {}", e);
                        SessionEvent::PollFailed { seq }
                    }
                };
                if let Effect::Terminal(_) = session.apply(event) {
                    break;
                }
            }

            _ = polls.tick() => {
                match session.apply(SessionEvent::PollDue) {
                    Effect::SendPoll(seq) => {
                        let backend = backend.clone();
                        let token = token_id.clone();
                        in_flight = Some(InFlight {
                            seq,
                            request: Box::pin(async move { backend.token_status(&token).await }),
                        });
                    }
                    Effect::Terminal(_) => break,
                    Effect::Idle => {
                        warn!(session = %session.id(), "previous status check unresolved, skipping poll");
                    }
                }
            }
        }
    }

    registry.remove(session.id()).await;
    debug!(session = %session.id(), "session removed from registry");
}
