//! Validity guard for queued restoration work.
//!
//! Every attempt and finish task of one restoration sequence carries a clone
//! of the sequence's token. Superseding, resetting or finishing the sequence
//! flips the shared flag; tasks still sitting in the queue run later, find
//! the flag set, and do nothing.

use anyhow::{Result, bail};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

#[derive(Clone, Debug)]
pub struct CancellationToken {
    sequence: u64,
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn for_sequence(sequence: u64) -> Self {
        Self {
            sequence,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Refuse `stage` once the sequence has been cancelled or has finished.
    pub fn check_cancelled(&self, stage: &'static str) -> Result<()> {
        if self.is_cancelled() {
            bail!(
                "restoration sequence={} no longer current at stage={stage}",
                self.sequence
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CancellationToken;

    #[test]
    fn cancel_reaches_queued_clones() {
        let token = CancellationToken::for_sequence(7);
        let queued = token.clone();
        assert!(queued.check_cancelled("attempt").is_ok());

        token.cancel();
        assert!(queued.is_cancelled());
        let err = queued
            .check_cancelled("attempt")
            .expect_err("cancelled sequence should refuse the stage");
        assert!(err.to_string().contains("sequence=7"));
        assert!(err.to_string().contains("stage=attempt"));
    }

    #[test]
    fn sequences_do_not_share_flags() {
        let old = CancellationToken::for_sequence(1);
        let current = CancellationToken::for_sequence(2);
        old.cancel();
        assert!(current.check_cancelled("finish").is_ok());
        assert_eq!(current.sequence(), 2);
    }
}
