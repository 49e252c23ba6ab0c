//! Scheduling state for token status checks.
//!
//! At most one status request is outstanding. Each request gets a sequence
//! number; only the reply to the outstanding number is accepted.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Send a status request tagged with this sequence number.
    Issue(u64),
    /// Previous request still unresolved.
    Skip,
    Stopped,
}

#[derive(Debug, Clone, Default)]
pub struct Poller {
    next_seq: u64,
    in_flight: Option<u64>,
    stopped: bool,
    issued: u64,
    skipped: u64,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called on every poll interval.
    pub fn on_interval(&mut self) -> PollDecision {
        if self.stopped {
            return PollDecision::Stopped;
        }
        if self.in_flight.is_some() {
            self.skipped += 1;
            return PollDecision::Skip;
        }

        self.next_seq += 1;
        self.in_flight = Some(self.next_seq);
        self.issued += 1;
        PollDecision::Issue(self.next_seq)
    }

    /// Settles request `seq`. Returns false for stale or unexpected replies,
    /// which the caller must ignore.
    pub fn on_settled(&mut self, seq: u64) -> bool {
        if self.stopped || self.in_flight != Some(seq) {
            return false;
        }
        self.in_flight = None;
        true
    }

    pub fn stop(&mut self) {
        self.stopped = true;
        self.in_flight = None;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
