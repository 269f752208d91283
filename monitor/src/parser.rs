//! Journal line parser.
//!
//! Each journal line is a JSON object with at least an `event` tag and an
//! ISO-8601 `timestamp`. [`parse_line`] turns a line into an [`EventRecord`]
//! holding the tag, the instant and the remaining untyped fields.
//! [`JournalEvent::decode`] then narrows a record into the typed variant the
//! classifier dispatches on.
//!
//! # Event Mapping
//!
//! | Journal `event` | Variant | Fields Extracted |
//! |-----------------|---------|------------------|
//! | `ShipTargeted` (with `Ship`) | `ShipTargeted` | ship name |
//! | `Bounty` | `Bounty` | target, victim faction |
//! | `MissionRedirected` | `MissionRedirected` | mission name |
//! | `ReservoirReplenished` | `ReservoirReplenished` | `FuelMain` |
//! | `FighterDestroyed` | `FighterDestroyed` | - |
//! | `LaunchFighter` | `LaunchFighter` | `PlayerControlled` |
//! | `ShieldState` | `ShieldState` | `ShieldsUp` |
//! | `HullDamage` | `HullDamage` | `Health`, `PlayerPilot`, `Fighter` |
//! | `Died` | `Died` | - |
//! | `Music` | `Music` | `MusicTrack` |
//! | `Commander` | `Commander` | `Name` |
//! | `SupercruiseDestinationDrop` | `DestinationDrop` | `Type`, `Type_Localised` |
//! | `ReceiveText` | `ReceiveText` | `Message` |
//! | `EjectCargo` | `EjectCargo` | cargo name, `Abandoned` |
//! | `Shutdown` | `Shutdown` | - |
//!
//! # Example
//!
//! ```
//! use afk_monitor::parser::{parse_line, JournalEvent};
//!
//! let line = r#"{"timestamp":"2025-01-29T12:00:00Z","event":"Died"}"#;
//! let record = parse_line(line).unwrap();
//! assert_eq!(record.kind, "Died");
//! assert_eq!(JournalEvent::decode(&record), Some(JournalEvent::Died));
//! ```

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::format::title_case;

/// Errors that can occur while parsing a journal line.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The line is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The line is valid JSON but not an object.
    #[error("record is not a JSON object")]
    NotAnObject,

    /// A required field is absent or has the wrong type.
    #[error("missing or invalid field: {0}")]
    MissingField(&'static str),

    /// The `timestamp` field is not an ISO-8601 instant.
    #[error("invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// One parsed journal line.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// The `event` tag.
    pub kind: String,

    /// When the event occurred, in the source's offset.
    pub timestamp: DateTime<FixedOffset>,

    /// Every other field of the record.
    pub fields: Map<String, Value>,
}

impl EventRecord {
    /// Returns a string field.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Returns a numeric field as `f64`.
    #[must_use]
    pub fn f64_field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }

    /// Returns a boolean field.
    #[must_use]
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }

    /// Returns the display name for a field: `<name>_Localised` when present,
    /// otherwise the raw value title-cased.
    #[must_use]
    pub fn display_name(&self, name: &str) -> Option<String> {
        self.str_field(&format!("{name}_Localised"))
            .map(str::to_string)
            .or_else(|| self.str_field(name).map(title_case))
    }
}

/// Parses one journal line.
///
/// # Errors
///
/// Returns [`ParseError`] when the line is not a JSON object, lacks a string
/// `event` tag, or lacks a valid `timestamp`.
pub fn parse_line(line: &str) -> Result<EventRecord, ParseError> {
    let value: Value = serde_json::from_str(line.trim())?;
    let Value::Object(mut fields) = value else {
        return Err(ParseError::NotAnObject);
    };

    let kind = match fields.remove("event") {
        Some(Value::String(kind)) => kind,
        _ => return Err(ParseError::MissingField("event")),
    };

    let raw_timestamp = match fields.remove("timestamp") {
        Some(Value::String(ts)) => ts,
        _ => return Err(ParseError::MissingField("timestamp")),
    };
    let timestamp = DateTime::parse_from_rfc3339(&raw_timestamp).map_err(|source| {
        ParseError::InvalidTimestamp {
            value: raw_timestamp.clone(),
            source,
        }
    })?;

    Ok(EventRecord {
        kind,
        timestamp,
        fields,
    })
}

/// Journal events the classifier knows how to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEvent {
    /// A ship was targeted and scanned.
    ShipTargeted { ship: String },

    /// A bounty was awarded for a kill.
    Bounty { target: String, faction: String },

    /// A mission's objective was met and it redirected to the issuer.
    MissionRedirected { name: String },

    /// The main fuel tank was topped up from the reservoir.
    ReservoirReplenished { fuel_main: f64 },

    /// The deployed fighter was destroyed.
    FighterDestroyed,

    /// A fighter was launched.
    LaunchFighter { player_controlled: bool },

    /// Shields went up or down.
    ShieldState { shields_up: bool },

    /// Hull damage to the ship or a fighter. `health` is a fraction.
    HullDamage {
        health: f64,
        player_pilot: bool,
        fighter: bool,
    },

    /// The player's ship was destroyed.
    Died,

    /// The game's music track changed.
    Music { track: String },

    /// A commander was loaded: a new game session.
    Commander { name: String },

    /// Dropped out of supercruise at a destination.
    DestinationDrop { kind: String, localised: String },

    /// A text message was received.
    ReceiveText { message: String },

    /// Cargo was ejected.
    EjectCargo { name: String, abandoned: bool },

    /// The game shut down.
    Shutdown,
}

impl JournalEvent {
    /// Narrows a record into a typed event.
    ///
    /// Returns `None` for kinds the classifier does not handle and for
    /// recognised kinds whose required fields are absent.
    #[must_use]
    pub fn decode(record: &EventRecord) -> Option<Self> {
        let event = match record.kind.as_str() {
            "ShipTargeted" => {
                // Targeting without a scan carries no ship name.
                record.str_field("Ship")?;
                JournalEvent::ShipTargeted {
                    ship: record.display_name("Ship")?,
                }
            }
            "Bounty" => JournalEvent::Bounty {
                target: required(record, "Target", record.display_name("Target"))?,
                faction: required_str(record, "VictimFaction")?,
            },
            "MissionRedirected" => JournalEvent::MissionRedirected {
                name: required_str(record, "Name")?,
            },
            "ReservoirReplenished" => JournalEvent::ReservoirReplenished {
                fuel_main: required(record, "FuelMain", record.f64_field("FuelMain"))?,
            },
            "FighterDestroyed" => JournalEvent::FighterDestroyed,
            "LaunchFighter" => JournalEvent::LaunchFighter {
                player_controlled: required(
                    record,
                    "PlayerControlled",
                    record.bool_field("PlayerControlled"),
                )?,
            },
            "ShieldState" => JournalEvent::ShieldState {
                shields_up: required(record, "ShieldsUp", record.bool_field("ShieldsUp"))?,
            },
            "HullDamage" => JournalEvent::HullDamage {
                health: required(record, "Health", record.f64_field("Health"))?,
                player_pilot: record.bool_field("PlayerPilot").unwrap_or(false),
                fighter: record.bool_field("Fighter").unwrap_or(false),
            },
            "Died" => JournalEvent::Died,
            "Music" => JournalEvent::Music {
                track: required_str(record, "MusicTrack")?,
            },
            "Commander" => JournalEvent::Commander {
                name: required_str(record, "Name")?,
            },
            "SupercruiseDestinationDrop" => {
                let kind = required_str(record, "Type")?;
                let localised = record
                    .str_field("Type_Localised")
                    .map_or_else(|| kind.clone(), str::to_string);
                JournalEvent::DestinationDrop { kind, localised }
            }
            "ReceiveText" => JournalEvent::ReceiveText {
                message: required_str(record, "Message")?,
            },
            "EjectCargo" => JournalEvent::EjectCargo {
                name: required(record, "Type", record.display_name("Type"))?,
                abandoned: record.bool_field("Abandoned").unwrap_or(false),
            },
            "Shutdown" => JournalEvent::Shutdown,
            _ => return None,
        };

        Some(event)
    }
}

fn required_str(record: &EventRecord, name: &'static str) -> Option<String> {
    required(record, name, record.str_field(name).map(str::to_string))
}

fn required<T>(record: &EventRecord, name: &'static str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        debug!(event = %record.kind, field = name, "Required field missing, ignoring record");
    }
    value
}
