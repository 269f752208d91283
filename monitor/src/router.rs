//! Notification routing.
//!
//! Applies a notification's resolved level:
//!
//! | Level | Terminal | Remote | Mention |
//! |-------|----------|--------|---------|
//! | 0     |          |        |         |
//! | 1     | yes      |        |         |
//! | 2     | yes      | yes    |         |
//! | 3     | yes      | yes    | first of a duplicate run |
//!
//! Remote messages pass through the [`DuplicateGuard`](crate::dedup::DuplicateGuard)
//! held in [`TrackingState`]. A failed delivery is logged and reported in the
//! [`RouteOutcome`]; it never stops monitoring.

use std::future::Future;
use std::io::{self, Write};

use tracing::{debug, warn};

use crate::dedup::DedupVerdict;
use crate::format::{remote_line, terminal_line, TimeMode};
use crate::state::TrackingState;
use crate::types::Notification;
use crate::webhook::SenderError;

/// Remote text of the one-time duplicate suppression notice.
pub const SUPPRESSION_NOTICE: &str = "**Suppressing further duplicate messages**";

const SUPPRESSION_ICON: &str = "⏸️";

/// A remote channel that accepts formatted messages.
pub trait RemoteSink {
    /// Delivers one message.
    fn deliver(&self, content: &str) -> impl Future<Output = Result<(), SenderError>> + Send;
}

/// What happened on the remote side of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteOutcome {
    /// Level below remote, or no remote channel configured.
    #[default]
    Skipped,
    /// The message was delivered.
    Delivered,
    /// The suppression notice was delivered in place of the message.
    Notice,
    /// Dropped as a suppressed duplicate.
    Dropped,
    /// Delivery failed.
    Failed,
}

/// Result of routing one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteOutcome {
    /// Written to the terminal.
    pub printed: bool,
    pub remote: RemoteOutcome,
}

/// Sends notifications to the terminal and the optional remote channel.
#[derive(Debug)]
pub struct Router<W, R> {
    out: W,
    remote: Option<R>,
    user_id: Option<String>,
    time_mode: TimeMode,
}

impl<W: Write, R: RemoteSink> Router<W, R> {
    /// Creates a terminal-only router.
    pub fn new(out: W, time_mode: TimeMode) -> Self {
        Self {
            out,
            remote: None,
            user_id: None,
            time_mode,
        }
    }

    /// Enables remote delivery. `user_id` is mentioned on level 3 messages.
    #[must_use]
    pub fn with_remote(mut self, sink: R, user_id: Option<String>) -> Self {
        self.remote = Some(sink);
        self.user_id = user_id;
        self
    }

    /// The remote sink, if configured.
    pub fn sink(&self) -> Option<&R> {
        self.remote.as_ref()
    }

    /// The terminal writer.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Routes one notification.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the terminal cannot be written. Remote failures
    /// are not errors.
    pub async fn route(
        &mut self,
        notification: &Notification,
        tracking: &mut TrackingState,
    ) -> io::Result<RouteOutcome> {
        let level = notification.level;
        let mut outcome = RouteOutcome::default();

        if !level.shows_terminal() {
            return Ok(outcome);
        }

        let clock = self.time_mode.clock(notification.timestamp);
        writeln!(
            self.out,
            "{}",
            terminal_line(&clock, notification.icon, &notification.terminal_text())
        )?;
        self.out.flush()?;
        tracking.total_logged += 1;
        outcome.printed = true;

        if !level.sends_remote() {
            return Ok(outcome);
        }
        let Some(sink) = &self.remote else {
            return Ok(outcome);
        };

        let remote_text = notification.remote_text();
        let fingerprint = format!("{} {remote_text}", notification.icon);

        let message = match tracking.dedup.observe(&fingerprint) {
            DedupVerdict::Deliver { first_of_run } => {
                let mention = if level.mentions() && first_of_run {
                    self.user_id.as_deref()
                } else {
                    None
                };
                remote_line(notification.icon, &remote_text, &clock, mention)
            }
            DedupVerdict::SendNotice => {
                debug!(key = %notification.key, "Suppressing further duplicates");
                outcome.remote = RemoteOutcome::Notice;
                remote_line(SUPPRESSION_ICON, SUPPRESSION_NOTICE, &clock, None)
            }
            DedupVerdict::Drop => {
                debug!(key = %notification.key, "Dropped duplicate remote message");
                outcome.remote = RemoteOutcome::Dropped;
                return Ok(outcome);
            }
        };

        match sink.deliver(&message).await {
            Ok(()) => {
                if outcome.remote == RemoteOutcome::Skipped {
                    outcome.remote = RemoteOutcome::Delivered;
                }
            }
            Err(e) => {
                warn!(key = %notification.key, error = %e, "Remote delivery failed");
                outcome.remote = RemoteOutcome::Failed;
            }
        }

        Ok(outcome)
    }
}
