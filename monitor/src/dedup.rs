//! Duplicate suppression for outbound remote messages.
//!
//! Consecutive identical remote messages are delivered up to a cap. The first
//! message past the cap is replaced by a single suppression notice and every
//! further duplicate is dropped until a different message arrives.
//!
//! ```text
//!            different text
//!   Fresh ─────────────────────► Repeating(1)
//!                                   │ same text, n < cap
//!                                   ▼
//!                               Repeating(n + 1)
//!                                   │ same text, n == cap
//!                                   ▼
//!                               Suppressed ──(same text)──► Suppressed
//!
//!   any state ──(different text)──► Repeating(1)
//! ```
//!
//! # Example
//!
//! ```
//! use afk_monitor::dedup::{DedupVerdict, DuplicateGuard};
//!
//! let mut guard = DuplicateGuard::new(2);
//! assert_eq!(guard.observe("a"), DedupVerdict::Deliver { first_of_run: true });
//! assert_eq!(guard.observe("a"), DedupVerdict::Deliver { first_of_run: false });
//! assert_eq!(guard.observe("a"), DedupVerdict::SendNotice);
//! assert_eq!(guard.observe("a"), DedupVerdict::Drop);
//! assert_eq!(guard.observe("b"), DedupVerdict::Deliver { first_of_run: true });
//! ```

use tracing::debug;

/// Default number of identical messages delivered before suppression.
pub const DEFAULT_DUPLICATE_CAP: u32 = 5;

/// State of the current run of identical messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupState {
    /// Nothing has been sent yet.
    Fresh,
    /// The last `n` messages were identical and all were delivered.
    Repeating(u32),
    /// The cap was exceeded and the notice has been sent; `repeats` counts
    /// every identical message in the run.
    Suppressed { repeats: u32 },
}

/// What the router should do with an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupVerdict {
    /// Deliver the message. `first_of_run` is true when it differs from the
    /// previous one.
    Deliver { first_of_run: bool },
    /// Send the one-time suppression notice instead of the message.
    SendNotice,
    /// Drop the message.
    Drop,
}

/// Tracks consecutive identical outbound messages.
#[derive(Debug, Clone)]
pub struct DuplicateGuard {
    cap: u32,
    last_text: Option<String>,
    state: DedupState,
}

impl DuplicateGuard {
    /// Creates a guard delivering at most `cap` identical messages in a row.
    ///
    /// A cap of zero is treated as one.
    #[must_use]
    pub fn new(cap: u32) -> Self {
        Self {
            cap: cap.max(1),
            last_text: None,
            state: DedupState::Fresh,
        }
    }

    /// Records an outbound message and returns the delivery verdict.
    pub fn observe(&mut self, text: &str) -> DedupVerdict {
        if self.last_text.as_deref() != Some(text) {
            self.last_text = Some(text.to_string());
            self.state = DedupState::Repeating(1);
            return DedupVerdict::Deliver { first_of_run: true };
        }

        match self.state {
            DedupState::Suppressed { repeats } => {
                self.state = DedupState::Suppressed {
                    repeats: repeats + 1,
                };
                DedupVerdict::Drop
            }
            DedupState::Fresh | DedupState::Repeating(_) => {
                let repeats = self.repeat_count() + 1;
                if repeats <= self.cap {
                    self.state = DedupState::Repeating(repeats);
                    DedupVerdict::Deliver { first_of_run: false }
                } else {
                    debug!(repeats, cap = self.cap, "Duplicate cap reached");
                    self.state = DedupState::Suppressed { repeats };
                    DedupVerdict::SendNotice
                }
            }
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DedupState {
        self.state
    }

    /// Number of identical messages in the current run.
    #[must_use]
    pub fn repeat_count(&self) -> u32 {
        match self.state {
            DedupState::Fresh => 0,
            DedupState::Repeating(n) => n,
            DedupState::Suppressed { repeats } => repeats,
        }
    }

    /// Whether the suppression notice has been sent for the current run.
    #[must_use]
    pub fn warning_sent(&self) -> bool {
        matches!(self.state, DedupState::Suppressed { .. })
    }

    /// The last message observed.
    #[must_use]
    pub fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }
}

impl Default for DuplicateGuard {
    fn default() -> Self {
        Self::new(DEFAULT_DUPLICATE_CAP)
    }
}
