//! AFK Monitor - Elite Dangerous journal watcher.
//!
//! Follows the game's journal while a ship is left unattended and turns
//! notable events (scans, kills, fuel, hull and shield changes, fighter
//! losses) into terminal lines and, optionally, Discord webhook messages.
//!
//! # Overview
//!
//! ```text
//! Tailer ─► parse_line ─► Classifier ─► Router ─┬─► terminal
//!                          │      ▲             └─► webhook (deduplicated)
//!                          ▼      │
//!                  SessionState / TrackingState
//! ```
//!
//! # Modules
//!
//! - [`tailer`]: Follows the journal file from its end
//! - [`parser`]: Journal line decoding
//! - [`classifier`]: Per-event notification rules
//! - [`state`]: Encounter and process-lifetime counters
//! - [`router`]: Verbosity levels and remote delivery
//! - [`dedup`]: Duplicate remote message suppression
//! - [`webhook`]: Discord webhook client
//! - [`monitor`]: The run loop
//! - [`config`]: Configuration file, environment and CLI layering
//! - [`format`]: Durations, colours and line layouts
//! - [`types`]: Event keys, levels and notifications
//! - [`error`]: Error types for monitor operations

pub mod classifier;
pub mod config;
pub mod dedup;
pub mod error;
pub mod format;
pub mod monitor;
pub mod parser;
pub mod router;
pub mod state;
pub mod tailer;
pub mod types;
pub mod webhook;

pub use classifier::{Classifier, Outcome, ShipTier};
pub use config::{Config, ConfigError, MalformedPolicy, ResolvedLevel, VerbosityPolicy};
pub use dedup::{DedupState, DedupVerdict, DuplicateGuard};
pub use error::{MonitorError, Result};
pub use format::TimeMode;
pub use monitor::{Flow, Monitor, StopReason};
pub use parser::{parse_line, EventRecord, JournalEvent, ParseError};
pub use router::{RemoteOutcome, RemoteSink, RouteOutcome, Router};
pub use state::{SessionState, TrackingState};
pub use tailer::{latest_journal, Tailer, TailerError};
pub use types::{EventKey, LogLevel, Notification, Tone};
pub use webhook::{SenderError, WebhookSender};
