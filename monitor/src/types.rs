//! Notification types shared by the classifier and the router.
//!
//! A [`Notification`] is produced by the classifier for a journal record and
//! consumed exactly once by the router. Every notification carries an
//! [`EventKey`], the stable identifier used to look up its verbosity in the
//! configured policy, and a resolved [`LogLevel`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};

use crate::format::paint;

/// Stable per-event-kind keys used by the verbosity table.
///
/// The string form of each key is what appears under `[log_levels]` in the
/// configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKey {
    MonitorLifecycle,
    EasyTargetScanned,
    HardTargetScanned,
    EasyTargetKilled,
    HardTargetKilled,
    KillSummary,
    MissionProgress,
    FuelLow,
    FuelCritical,
    FighterLaunched,
    FighterHullDamaged,
    FighterDestroyed,
    ShieldsChanged,
    ShipHullDamaged,
    ShipDestroyed,
    PirateDisengaged,
    CargoEjected,
    MainMenu,
    NewSession,
    DestinationDrop,
    Shutdown,
}

impl EventKey {
    /// Every key, in table order.
    pub const ALL: [EventKey; 21] = [
        EventKey::MonitorLifecycle,
        EventKey::EasyTargetScanned,
        EventKey::HardTargetScanned,
        EventKey::EasyTargetKilled,
        EventKey::HardTargetKilled,
        EventKey::KillSummary,
        EventKey::MissionProgress,
        EventKey::FuelLow,
        EventKey::FuelCritical,
        EventKey::FighterLaunched,
        EventKey::FighterHullDamaged,
        EventKey::FighterDestroyed,
        EventKey::ShieldsChanged,
        EventKey::ShipHullDamaged,
        EventKey::ShipDestroyed,
        EventKey::PirateDisengaged,
        EventKey::CargoEjected,
        EventKey::MainMenu,
        EventKey::NewSession,
        EventKey::DestinationDrop,
        EventKey::Shutdown,
    ];

    /// Returns the configuration-file spelling of this key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKey::MonitorLifecycle => "monitor-lifecycle",
            EventKey::EasyTargetScanned => "easy-target-scanned",
            EventKey::HardTargetScanned => "hard-target-scanned",
            EventKey::EasyTargetKilled => "easy-target-killed",
            EventKey::HardTargetKilled => "hard-target-killed",
            EventKey::KillSummary => "kill-summary",
            EventKey::MissionProgress => "mission-progress",
            EventKey::FuelLow => "fuel-low",
            EventKey::FuelCritical => "fuel-critical",
            EventKey::FighterLaunched => "fighter-launched",
            EventKey::FighterHullDamaged => "fighter-hull-damaged",
            EventKey::FighterDestroyed => "fighter-destroyed",
            EventKey::ShieldsChanged => "shields-changed",
            EventKey::ShipHullDamaged => "ship-hull-damaged",
            EventKey::ShipDestroyed => "ship-destroyed",
            EventKey::PirateDisengaged => "pirate-disengaged",
            EventKey::CargoEjected => "cargo-ejected",
            EventKey::MainMenu => "main-menu",
            EventKey::NewSession => "new-session",
            EventKey::DestinationDrop => "destination-drop",
            EventKey::Shutdown => "shutdown",
        }
    }

    /// Level used when the configuration does not mention this key.
    #[must_use]
    pub fn default_level(self) -> LogLevel {
        match self {
            EventKey::EasyTargetScanned | EventKey::HardTargetScanned => LogLevel::Terminal,
            EventKey::FuelCritical
            | EventKey::FighterDestroyed
            | EventKey::ShieldsChanged
            | EventKey::ShipHullDamaged
            | EventKey::ShipDestroyed
            | EventKey::CargoEjected => LogLevel::Mention,
            _ => LogLevel::Remote,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown event key '{s}'"))
    }
}

/// Output level for a notification.
///
/// Levels are ordered: each level includes every sink of the levels below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// No output at all.
    Suppressed = 0,
    /// Interactive terminal only.
    Terminal = 1,
    /// Terminal and remote channel.
    Remote = 2,
    /// Terminal and remote channel with a direct mention.
    Mention = 3,
}

impl LogLevel {
    /// Converts a configured integer into a level.
    ///
    /// Returns `None` for anything outside `0..=3`.
    #[must_use]
    pub fn from_int(value: i64) -> Option<Self> {
        match value {
            0 => Some(LogLevel::Suppressed),
            1 => Some(LogLevel::Terminal),
            2 => Some(LogLevel::Remote),
            3 => Some(LogLevel::Mention),
            _ => None,
        }
    }

    #[must_use]
    pub fn shows_terminal(self) -> bool {
        self >= LogLevel::Terminal
    }

    #[must_use]
    pub fn sends_remote(self) -> bool {
        self >= LogLevel::Remote
    }

    #[must_use]
    pub fn mentions(self) -> bool {
        self >= LogLevel::Mention
    }
}

/// Colour treatment of a notification headline on the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Plain,
    Easy,
    Hard,
    Warn,
    Bad,
    Good,
}

/// A human-readable notification produced for one journal record.
///
/// The terminal rendering is `headline` (coloured by `tone`) followed by
/// `detail`. The remote rendering is `remote` when set, otherwise the plain
/// terminal text in bold markup.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Verbosity key this notification is filed under.
    pub key: EventKey,

    /// Emoji prefix.
    pub icon: &'static str,

    /// Leading part of the text, coloured on the terminal.
    pub headline: String,

    /// Remainder of the text, never coloured.
    pub detail: String,

    /// Terminal colour for the headline.
    pub tone: Tone,

    /// Explicit remote text.
    pub remote: Option<String>,

    /// Source timestamp. `None` for synthetic notifications, which are
    /// stamped with the wall clock.
    pub timestamp: Option<DateTime<FixedOffset>>,

    /// Resolved output level.
    pub level: LogLevel,
}

impl Notification {
    /// Creates a plain notification at the key's default level.
    #[must_use]
    pub fn new(key: EventKey, icon: &'static str, headline: impl Into<String>) -> Self {
        Self {
            key,
            icon,
            headline: headline.into(),
            detail: String::new(),
            tone: Tone::Plain,
            remote: None,
            timestamp: None,
            level: key.default_level(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    #[must_use]
    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Terminal text without colour codes.
    #[must_use]
    pub fn plain_text(&self) -> String {
        format!("{}{}", self.headline, self.detail)
    }

    /// Terminal text with the headline coloured.
    #[must_use]
    pub fn terminal_text(&self) -> String {
        format!("{}{}", paint(&self.headline, self.tone), self.detail)
    }

    /// Text sent to the remote channel.
    #[must_use]
    pub fn remote_text(&self) -> String {
        match &self.remote {
            Some(text) => text.clone(),
            None => format!("**{}**", self.plain_text()),
        }
    }
}
