//! The monitoring run loop.
//!
//! [`Monitor`] owns the session and tracking state and processes one journal
//! line at a time to completion: parse, classify, then route every resulting
//! notification in order. Waiting on the tailer is the only suspension point
//! that can be interrupted.

use std::future::Future;
use std::io::Write;

use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::config::MalformedPolicy;
use crate::error::Result;
use crate::parser::parse_line;
use crate::router::{RemoteSink, Router};
use crate::state::{SessionState, TrackingState};
use crate::tailer::Tailer;

/// Whether to keep reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// A shutdown marker was processed.
    Shutdown,
}

/// Why the run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown future resolved (Ctrl+C or SIGTERM).
    Interrupted,
    /// The journal recorded a game shutdown.
    ShutdownMarker,
}

/// Journal processing pipeline and its state.
#[derive(Debug)]
pub struct Monitor<W, R> {
    classifier: Classifier,
    router: Router<W, R>,
    session: SessionState,
    tracking: TrackingState,
    on_malformed: MalformedPolicy,
}

impl<W: Write, R: RemoteSink> Monitor<W, R> {
    pub fn new(
        classifier: Classifier,
        router: Router<W, R>,
        on_malformed: MalformedPolicy,
        duplicate_cap: u32,
    ) -> Self {
        Self {
            classifier,
            router,
            session: SessionState::new(),
            tracking: TrackingState::new(duplicate_cap),
            on_malformed,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn tracking(&self) -> &TrackingState {
        &self.tracking
    }

    pub fn router(&self) -> &Router<W, R> {
        &self.router
    }

    /// Routes the "started" lifecycle notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be written.
    pub async fn start(&mut self, version: &str) -> Result<()> {
        let notification = self.classifier.started(version);
        self.router.route(&notification, &mut self.tracking).await?;
        Ok(())
    }

    /// Routes the "stopped" lifecycle notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be written.
    pub async fn finish(&mut self, journal_name: &str) -> Result<()> {
        let notification = self.classifier.stopped(journal_name);
        self.router.route(&notification, &mut self.tracking).await?;
        info!(
            logged = self.tracking.total_logged,
            kills = self.session.kill_count(),
            missions = self.tracking.mission_completions,
            "Monitor stopped"
        );
        Ok(())
    }

    /// Processes one journal line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is malformed and the policy is
    /// [`MalformedPolicy::Abort`], or if the terminal cannot be written.
    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let record = match parse_line(line) {
            Ok(record) => record,
            Err(e) => match self.on_malformed {
                MalformedPolicy::Skip => {
                    warn!(error = %e, line, "Skipping malformed journal line");
                    return Ok(Flow::Continue);
                }
                MalformedPolicy::Abort => return Err(e.into()),
            },
        };

        let outcome = self
            .classifier
            .classify(&record, &mut self.session, &mut self.tracking);

        for notification in &outcome.notifications {
            self.router.route(notification, &mut self.tracking).await?;
        }

        if outcome.shutdown {
            info!("Journal recorded a shutdown");
            Ok(Flow::Shutdown)
        } else {
            Ok(Flow::Continue)
        }
    }

    /// Reads and processes lines until `shutdown` resolves or the journal
    /// records a shutdown.
    ///
    /// A line being processed is always finished before an interrupt is
    /// observed.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal becomes unavailable or
    /// [`Monitor::handle_line`] fails.
    pub async fn run<F>(&mut self, tailer: &mut Tailer, shutdown: F) -> Result<StopReason>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    return Ok(StopReason::Interrupted);
                }

                line = tailer.next_line() => {
                    if self.handle_line(&line?).await? == Flow::Shutdown {
                        return Ok(StopReason::ShutdownMarker);
                    }
                }
            }
        }
    }

    /// Runs a full monitoring session: routes the "started" notification,
    /// runs until interrupted, shut down or failed, then routes the
    /// "stopped" notification on every exit path.
    ///
    /// When both the run and the final notification fail, the run error is
    /// returned and the other one is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if [`Monitor::start`], [`Monitor::run`] or
    /// [`Monitor::finish`] fails.
    pub async fn run_session<F>(
        &mut self,
        version: &str,
        journal_name: &str,
        tailer: &mut Tailer,
        shutdown: F,
    ) -> Result<StopReason>
    where
        F: Future<Output = ()>,
    {
        self.start(version).await?;
        let result = self.run(tailer, shutdown).await;
        let finished = self.finish(journal_name).await;

        match (result, finished) {
            (Ok(reason), Ok(())) => Ok(reason),
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
            (Err(e), Err(finish_err)) => {
                warn!(error = %finish_err, "Failed to route the stopped notification");
                Err(e)
            }
        }
    }
}
