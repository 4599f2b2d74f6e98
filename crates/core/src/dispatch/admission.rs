use std::sync::atomic::{AtomicU8, Ordering};

const PENDING: u8 = 0;
const CLAIMED: u8 = 1;
const ABANDONED: u8 = 2;

/// Decides who owns the fate of a queued job before it reaches an engine.
///
/// A ticket starts pending. Exactly one transition out of pending wins:
/// the worker claims it once it holds an engine, or either side abandons it
/// when the admission deadline passes first. A claimed job always runs to
/// completion; an abandoned one never touches an engine.
#[derive(Debug, Default)]
pub struct AdmissionTicket {
    state: AtomicU8,
}

impl AdmissionTicket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Worker side. Returns `false` if the caller already gave up.
    pub fn claim(&self) -> bool {
        self.transition(CLAIMED)
    }

    /// Returns `false` if the job was already claimed by a worker.
    pub fn abandon(&self) -> bool {
        self.transition(ABANDONED) || self.state.load(Ordering::Acquire) == ABANDONED
    }

    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_claim_wins_then_abandon_fails() {
        let ticket = AdmissionTicket::new();
        assert!(ticket.claim());
        assert!(!ticket.abandon());
        assert!(!ticket.is_pending());
    }

    #[test]
    fn test_abandon_wins_then_claim_fails() {
        let ticket = AdmissionTicket::new();
        assert!(ticket.abandon());
        assert!(!ticket.claim());
    }

    #[test]
    fn test_abandon_is_idempotent() {
        let ticket = AdmissionTicket::new();
        assert!(ticket.abandon());
        assert!(ticket.abandon());
    }

    #[test]
    fn test_claim_only_once() {
        let ticket = AdmissionTicket::new();
        assert!(ticket.claim());
        assert!(!ticket.claim());
    }

    #[test]
    fn test_race_has_single_winner() {
        for _ in 0..200 {
            let ticket = Arc::new(AdmissionTicket::new());
            let worker = {
                let ticket = Arc::clone(&ticket);
                thread::spawn(move || ticket.claim())
            };
            let abandoned = ticket.abandon();
            let claimed = worker.join().unwrap();
            assert_ne!(claimed, abandoned);
        }
    }
}
