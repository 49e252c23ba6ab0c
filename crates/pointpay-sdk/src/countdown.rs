//! One-second countdown towards token expiry.
//!
//! `Running -> Expired`, or `Stopped` when the owning session ends first.
//! Ticks after either end state have no effect.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    Running(u64),
    Expired,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: u64,
    stopped: bool,
}

impl Countdown {
    pub fn new(total_secs: u64) -> Self {
        Self {
            remaining: total_secs,
            stopped: false,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn tick(&mut self) -> CountdownStep {
        if self.stopped {
            return CountdownStep::Stopped;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.stopped = true;
            return CountdownStep::Expired;
        }

        CountdownStep::Running(self.remaining)
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_exactly_once() {
        let mut countdown = Countdown::new(600);
        for expected in (1..600).rev() {
            assert_eq!(countdown.tick(), CountdownStep::Running(expected));
        }
        assert_eq!(countdown.tick(), CountdownStep::Expired);
        assert_eq!(countdown.remaining(), 0);
        assert_eq!(countdown.tick(), CountdownStep::Stopped);
    }

    #[test]
    fn test_stop_ignores_lingering_ticks() {
        let mut countdown = Countdown::new(3);
        countdown.tick();
        countdown.stop();
        assert_eq!(countdown.tick(), CountdownStep::Stopped);
        assert_eq!(countdown.remaining(), 2);
    }
}
