//! Event classification.
//!
//! Maps a parsed journal record plus session and tracking state to zero or
//! more notifications. Each journal event kind has its own handler; handlers
//! mutate the state they own and never perform I/O.
//!
//! Levels are resolved against the [`VerbosityPolicy`] here so the router
//! only has to act on them.

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::config::VerbosityPolicy;
use crate::format::{format_average, format_duration, percent};
use crate::parser::{EventRecord, JournalEvent};
use crate::state::{SessionState, TrackingState};
use crate::types::{EventKey, Notification, Tone};

/// Ships that rarely threaten a fighter and its mothership.
pub const EASY_SHIPS: [&str; 14] = [
    "Adder",
    "Asp Explorer",
    "Asp Scout",
    "Cobra Mk III",
    "Cobra Mk IV",
    "Diamondback Explorer",
    "Diamondback Scout",
    "Eagle",
    "Imperial Courier",
    "Imperial Eagle",
    "Krait Phantom",
    "Sidewinder",
    "Viper Mk III",
    "Viper Mk IV",
];

/// Ships worth watching closely.
pub const HARD_SHIPS: [&str; 12] = [
    "Alliance Crusader",
    "Alliance Challenger",
    "Alliance Chieftain",
    "Anaconda",
    "Federal Assault Ship",
    "Federal Dropship",
    "Federal Gunship",
    "Fer-De-Lance",
    "Imperial Clipper",
    "Krait MK II",
    "Python",
    "Vulture",
];

/// Message fragments sent by pirates that decline to attack.
pub const BAIT_MARKERS: [&str; 3] = [
    "$Pirate_ThreatTooHigh",
    "$Pirate_NotEnoughCargo",
    "$Pirate_OnNoCargoFound",
];

const MASSACRE_MISSION: &str = "Mission_Massacre";
const MULTIPLAYER_DROP: &str = "$MULTIPLAYER";
const MAIN_MENU_TRACK: &str = "MainMenu";

/// Fighter destruction right after this kind is a side effect of the jump.
const START_JUMP_KIND: &str = "StartJump";

/// A summary is emitted every this many kills.
const KILL_SUMMARY_INTERVAL: u32 = 10;

const FUEL_LOW_FRACTION: f64 = 0.2;
const FUEL_CRITICAL_FRACTION: f64 = 0.1;

/// Threat tier of a recognised combat ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipTier {
    Easy,
    Hard,
}

impl ShipTier {
    /// Looks up a display name. `None` for ships on neither list.
    #[must_use]
    pub fn of(ship: &str) -> Option<Self> {
        if EASY_SHIPS.contains(&ship) {
            Some(ShipTier::Easy)
        } else if HARD_SHIPS.contains(&ship) {
            Some(ShipTier::Hard)
        } else {
            None
        }
    }

    fn marker(self) -> &'static str {
        match self {
            ShipTier::Easy => "",
            ShipTier::Hard => "(!)",
        }
    }

    fn tone(self) -> Tone {
        match self {
            ShipTier::Easy => Tone::Easy,
            ShipTier::Hard => Tone::Hard,
        }
    }
}

/// Result of classifying one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Notifications to route, in order.
    pub notifications: Vec<Notification>,

    /// The record was a shutdown marker; stop after routing.
    pub shutdown: bool,
}

impl Outcome {
    fn none() -> Self {
        Self::default()
    }

    fn one(notification: Notification) -> Self {
        Self {
            notifications: vec![notification],
            shutdown: false,
        }
    }

    fn maybe(notification: Option<Notification>) -> Self {
        notification.map_or_else(Self::none, Self::one)
    }
}

/// Turns journal records into notifications.
#[derive(Debug, Clone)]
pub struct Classifier {
    policy: VerbosityPolicy,
    fuel_tank: f64,
}

impl Classifier {
    /// Creates a classifier with the given verbosity policy and main tank
    /// capacity in tonnes.
    #[must_use]
    pub fn new(policy: VerbosityPolicy, fuel_tank: f64) -> Self {
        Self { policy, fuel_tank }
    }

    /// Classifies one record.
    ///
    /// `tracking.last_event_kind` is updated afterwards whether or not a
    /// notification was produced.
    pub fn classify(
        &self,
        record: &EventRecord,
        session: &mut SessionState,
        tracking: &mut TrackingState,
    ) -> Outcome {
        let outcome = match JournalEvent::decode(record) {
            Some(event) => self.dispatch(event, record.timestamp, session, tracking),
            None => Outcome::none(),
        };

        tracking.last_event_kind = Some(record.kind.clone());
        self.resolve_levels(outcome)
    }

    /// Notification routed when monitoring starts.
    #[must_use]
    pub fn started(&self, version: &str) -> Notification {
        let notification = Notification::new(
            EventKey::MonitorLifecycle,
            "📖",
            format!("AFK Monitor v{version} started"),
        );
        self.with_policy_level(notification)
    }

    /// Notification routed when monitoring stops.
    #[must_use]
    pub fn stopped(&self, journal_name: &str) -> Notification {
        let notification = Notification::new(
            EventKey::MonitorLifecycle,
            "📕",
            format!("AFK Monitor stopped ({journal_name})"),
        );
        self.with_policy_level(notification)
    }

    fn dispatch(
        &self,
        event: JournalEvent,
        at: DateTime<FixedOffset>,
        session: &mut SessionState,
        tracking: &mut TrackingState,
    ) -> Outcome {
        let outcome = match event {
            JournalEvent::ShipTargeted { ship } => Outcome::maybe(ship_targeted(&ship, session)),
            JournalEvent::Bounty { target, faction } => Outcome {
                notifications: bounty(&target, &faction, at, session),
                shutdown: false,
            },
            JournalEvent::MissionRedirected { name } => {
                Outcome::maybe(mission_redirected(&name, tracking))
            }
            JournalEvent::ReservoirReplenished { fuel_main } => {
                Outcome::maybe(self.reservoir_replenished(fuel_main))
            }
            JournalEvent::FighterDestroyed => Outcome::maybe(fighter_destroyed(tracking)),
            JournalEvent::LaunchFighter { player_controlled } => {
                Outcome::maybe((!player_controlled).then(|| {
                    Notification::new(EventKey::FighterLaunched, "🕹️", "Fighter launched")
                }))
            }
            JournalEvent::ShieldState { shields_up } => Outcome::one(shield_state(shields_up)),
            JournalEvent::HullDamage {
                health,
                player_pilot,
                fighter,
            } => Outcome::maybe(hull_damage(health, player_pilot, fighter, tracking)),
            JournalEvent::Died => Outcome::one(
                Notification::new(EventKey::ShipDestroyed, "💀", "Ship destroyed!")
                    .with_tone(Tone::Bad),
            ),
            JournalEvent::Music { track } => Outcome::maybe((track == MAIN_MENU_TRACK).then(|| {
                Notification::new(EventKey::MainMenu, "🚪", "Exited to main menu")
            })),
            JournalEvent::Commander { name } => {
                session.reset();
                Outcome::one(Notification::new(
                    EventKey::NewSession,
                    "🔄",
                    format!("Started new session for CMDR {name}"),
                ))
            }
            JournalEvent::DestinationDrop { kind, localised } => {
                Outcome::maybe(destination_drop(&kind, &localised, session))
            }
            JournalEvent::ReceiveText { message } => Outcome::maybe(receive_text(&message)),
            JournalEvent::EjectCargo { name, abandoned } => {
                Outcome::maybe((!abandoned).then(|| {
                    Notification::new(EventKey::CargoEjected, "📦", "Cargo ejected!")
                        .with_detail(format!(" ({name})"))
                        .with_tone(Tone::Bad)
                        .with_remote(format!("**Cargo ejected!** ({name})"))
                }))
            }
            JournalEvent::Shutdown => Outcome {
                notifications: vec![Notification::new(
                    EventKey::Shutdown,
                    "🛑",
                    "Quit to desktop",
                )],
                shutdown: true,
            },
        };
        outcome.stamped(at)
    }

    fn reservoir_replenished(&self, fuel_main: f64) -> Option<Notification> {
        let fraction = fuel_main / self.fuel_tank;
        if fraction >= FUEL_LOW_FRACTION {
            return None;
        }

        let (key, headline, tone) = if fraction < FUEL_CRITICAL_FRACTION {
            (EventKey::FuelCritical, "Fuel reserves critical!", Tone::Bad)
        } else {
            (EventKey::FuelLow, "Fuel reserves low!", Tone::Warn)
        };
        let detail = format!(" (Remaining: {}%)", percent(fraction));

        Some(
            Notification::new(key, "⛽", headline)
                .with_remote(format!("**{headline}**{detail}"))
                .with_detail(detail)
                .with_tone(tone),
        )
    }

    fn resolve_levels(&self, mut outcome: Outcome) -> Outcome {
        outcome.notifications = outcome
            .notifications
            .into_iter()
            .map(|n| self.with_policy_level(n))
            .collect();
        outcome
    }

    fn with_policy_level(&self, notification: Notification) -> Notification {
        let level = self.policy.level(notification.key);
        notification.with_level(level)
    }
}

impl Outcome {
    fn stamped(mut self, at: DateTime<FixedOffset>) -> Self {
        for notification in &mut self.notifications {
            notification.timestamp = Some(at);
        }
        self
    }
}

fn ship_targeted(ship: &str, session: &mut SessionState) -> Option<Notification> {
    let tier = ShipTier::of(ship)?;
    if !session.mark_scanned(ship) {
        debug!(ship, "Target already scanned this encounter");
        return None;
    }

    let key = match tier {
        ShipTier::Easy => EventKey::EasyTargetScanned,
        ShipTier::Hard => EventKey::HardTargetScanned,
    };
    let marker = tier.marker();

    Some(
        Notification::new(key, "🔎", "Scan")
            .with_detail(format!(": {ship}{marker}"))
            .with_tone(tier.tone())
            .with_remote(format!("**{ship}**{marker}")),
    )
}

fn bounty(
    target: &str,
    faction: &str,
    at: DateTime<FixedOffset>,
    session: &mut SessionState,
) -> Vec<Notification> {
    session.clear_scans();
    let interval = session.record_kill(at);

    let tier = if ShipTier::of(target) == Some(ShipTier::Hard) {
        ShipTier::Hard
    } else {
        ShipTier::Easy
    };
    let key = match tier {
        ShipTier::Easy => EventKey::EasyTargetKilled,
        ShipTier::Hard => EventKey::HardTargetKilled,
    };
    let marker = tier.marker();
    let elapsed = interval
        .map(|secs| format!(" [+{}]", format_duration(secs)))
        .unwrap_or_default();

    let mut notifications = vec![Notification::new(key, "💥", "Kill")
        .with_detail(format!(": {target}{marker} ({faction}){elapsed}"))
        .with_tone(tier.tone())
        .with_remote(format!("**{target}{marker}** ({faction}){elapsed}"))];

    let kills = session.kill_count();
    if kills % KILL_SUMMARY_INTERVAL == 0 {
        if let Some(average) = session.average_kill_interval() {
            let rate = session
                .kills_per_hour()
                .map(|rate| format!(", Rate: {rate:.1}/h"))
                .unwrap_or_default();
            notifications.push(Notification::new(
                EventKey::KillSummary,
                "📝",
                format!(
                    "Session kills: {kills} (Avg time: {}{rate})",
                    format_average(average)
                ),
            ));
        }
    }

    notifications
}

fn mission_redirected(name: &str, tracking: &mut TrackingState) -> Option<Notification> {
    if !name.contains(MASSACRE_MISSION) {
        return None;
    }

    tracking.mission_completions += 1;
    Some(Notification::new(
        EventKey::MissionProgress,
        "✅",
        format!(
            "Completed kills for a mission ({})",
            tracking.mission_completions
        ),
    ))
}

fn fighter_destroyed(tracking: &TrackingState) -> Option<Notification> {
    if tracking.previous_was(START_JUMP_KIND) {
        debug!("Ignoring fighter destruction caused by a jump");
        return None;
    }

    Some(
        Notification::new(EventKey::FighterDestroyed, "🕹️", "Fighter destroyed!")
            .with_tone(Tone::Bad),
    )
}

fn shield_state(shields_up: bool) -> Notification {
    let (headline, tone) = if shields_up {
        ("Ship shields back up", Tone::Good)
    } else {
        ("Ship shields down!", Tone::Bad)
    };
    Notification::new(EventKey::ShieldsChanged, "🛡️", headline).with_tone(tone)
}

fn hull_damage(
    health: f64,
    player_pilot: bool,
    fighter: bool,
    tracking: &mut TrackingState,
) -> Option<Notification> {
    let detail = format!(" (Health: {}%)", percent(health));

    if fighter {
        if tracking.last_fighter_hull == Some(health) {
            return None;
        }
        tracking.last_fighter_hull = Some(health);
        let headline = "Fighter hull damaged!";
        return Some(
            Notification::new(EventKey::FighterHullDamaged, "🕹️", headline)
                .with_remote(format!("**{headline}**{detail}"))
                .with_detail(detail)
                .with_tone(Tone::Warn),
        );
    }

    if player_pilot && !fighter {
        let headline = "Ship hull damaged!";
        return Some(
            Notification::new(EventKey::ShipHullDamaged, "🛠️", headline)
                .with_remote(format!("**{headline}**{detail}"))
                .with_detail(detail)
                .with_tone(Tone::Bad),
        );
    }

    None
}

fn destination_drop(
    kind: &str,
    localised: &str,
    session: &mut SessionState,
) -> Option<Notification> {
    if !kind.contains(MULTIPLAYER_DROP) {
        return None;
    }

    session.reset();
    Some(Notification::new(
        EventKey::DestinationDrop,
        "🚀",
        format!("Dropped at {localised}"),
    ))
}

fn receive_text(message: &str) -> Option<Notification> {
    if !BAIT_MARKERS.iter().any(|marker| message.contains(marker)) {
        return None;
    }

    Some(
        Notification::new(
            EventKey::PirateDisengaged,
            "🎣",
            "Pirate didn't engage due to insufficient cargo value",
        )
        .with_tone(Tone::Warn),
    )
}
