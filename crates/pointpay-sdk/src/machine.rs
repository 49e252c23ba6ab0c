//! Session state machine.
//!
//! The countdown and the poller never mutate the outcome themselves; every
//! event goes through [`SessionMachine::apply`], which hands out at most one
//! [`Effect::Terminal`] per session. Events arriving after that are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::countdown::{Countdown, CountdownStep};
use crate::poller::{PollDecision, Poller};
use crate::token::{StatusResponse, TokenStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Succeeded,
    Expired,
    Cancelled,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::Pending)
    }

    /// Token status the payer's copy of the token settles on.
    pub fn token_status(self) -> TokenStatus {
        match self {
            Outcome::Pending => TokenStatus::Active,
            Outcome::Succeeded => TokenStatus::Consumed,
            Outcome::Expired => TokenStatus::Expired,
            Outcome::Cancelled => TokenStatus::Cancelled,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Succeeded => "succeeded",
            Outcome::Expired => "expired",
            Outcome::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// One second elapsed
    Tick,
    /// The poll interval elapsed
    PollDue,
    PollResolved { seq: u64, response: StatusResponse },
    PollFailed { seq: u64 },
    Cancel,
}

/// What the driver has to do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Idle,
    SendPoll(u64),
    Terminal(Outcome),
}

#[derive(Debug, Clone)]
pub struct SessionMachine {
    countdown: Countdown,
    poller: Poller,
    outcome: Outcome,
}

impl SessionMachine {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            countdown: Countdown::new(ttl_secs),
            poller: Poller::new(),
            outcome: Outcome::Pending,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn remaining_secs(&self) -> u64 {
        self.countdown.remaining()
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn apply(&mut self, event: SessionEvent) -> Effect {
        if self.outcome.is_terminal() {
            return Effect::Idle;
        }

        match event {
            SessionEvent::Tick => match self.countdown.tick() {
                CountdownStep::Expired => self.finish(Outcome::Expired),
                CountdownStep::Running(_) | CountdownStep::Stopped => Effect::Idle,
            },
            SessionEvent::PollDue => match self.poller.on_interval() {
                PollDecision::Issue(seq) => Effect::SendPoll(seq),
                PollDecision::Skip | PollDecision::Stopped => Effect::Idle,
            },
            SessionEvent::PollResolved { seq, response } => {
                if !self.poller.on_settled(seq) {
                    return Effect::Idle;
                }
                match response.terminal_outcome() {
                    Some(outcome) => self.finish(outcome),
                    None => Effect::Idle,
                }
            }
            SessionEvent::PollFailed { seq } => {
                self.poller.on_settled(seq);
                Effect::Idle
            }
            SessionEvent::Cancel => self.finish(Outcome::Cancelled),
        }
    }

    fn finish(&mut self, outcome: Outcome) -> Effect {
        self.countdown.stop();
        self.poller.stop();
        self.outcome = outcome;
        Effect::Terminal(outcome)
    }
}
