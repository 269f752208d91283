//! Text formatting for terminal and remote output.
//!
//! Durations, percentages, journal-style title casing, terminal colours and
//! the two line layouts:
//!
//! - terminal: `[HH:MM:SS]<icon> <text>`
//! - remote: `<icon> <text> {HH:MM:SS}[ <@user>]`

use chrono::{DateTime, FixedOffset, Local, Utc};
use crossterm::style::{Color, Stylize};

use crate::types::Tone;

const EASY_COLOR: Color = Color::AnsiValue(157);
const HARD_COLOR: Color = Color::AnsiValue(217);
const WARN_COLOR: Color = Color::AnsiValue(215);
const WHITE: Color = Color::AnsiValue(15);
const RED: Color = Color::AnsiValue(1);
const GREEN: Color = Color::AnsiValue(2);

/// Clock used to stamp output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeMode {
    /// Convert to the local time zone.
    #[default]
    Local,
    /// Render in UTC.
    Utc,
}

impl TimeMode {
    /// Renders `HH:MM:SS` for the given source timestamp, or for the wall
    /// clock when there is none.
    #[must_use]
    pub fn clock(self, timestamp: Option<DateTime<FixedOffset>>) -> String {
        const FMT: &str = "%H:%M:%S";
        match (self, timestamp) {
            (TimeMode::Utc, Some(ts)) => ts.with_timezone(&Utc).format(FMT).to_string(),
            (TimeMode::Local, Some(ts)) => ts.with_timezone(&Local).format(FMT).to_string(),
            (TimeMode::Utc, None) => Utc::now().format(FMT).to_string(),
            (TimeMode::Local, None) => Local::now().format(FMT).to_string(),
        }
    }
}

/// Colours `text` for the terminal.
#[must_use]
pub fn paint(text: &str, tone: Tone) -> String {
    match tone {
        Tone::Plain => text.to_string(),
        Tone::Easy => text.with(EASY_COLOR).to_string(),
        Tone::Hard => text.with(HARD_COLOR).to_string(),
        Tone::Warn => text.with(WARN_COLOR).to_string(),
        Tone::Bad => text.with(WHITE).on(RED).to_string(),
        Tone::Good => text.with(WHITE).on(GREEN).to_string(),
    }
}

/// Formats a duration in whole seconds as `XhYmZs`, `YmZs` or `Zs`.
///
/// Fractional seconds are truncated. Negative input renders as `0s`.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let h = total / 3600;
    let m = total % 3600 / 60;
    let s = total % 60;

    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

/// Formats an average interval: one decimal under a minute, otherwise
/// [`format_duration`].
#[must_use]
pub fn format_average(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else {
        format_duration(seconds)
    }
}

/// Rounds a fraction to a whole percentage.
#[must_use]
pub fn percent(fraction: f64) -> i64 {
    (fraction * 100.0).round() as i64
}

/// Title-cases an identifier the way journal ship and cargo names are shown:
/// the first letter of each alphabetic run is upper-cased and the rest
/// lower-cased.
///
/// ```
/// use afk_monitor::format::title_case;
///
/// assert_eq!(title_case("sidewinder"), "Sidewinder");
/// assert_eq!(title_case("viper_mkiv"), "Viper_Mkiv");
/// ```
#[must_use]
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_word_start = true;

    for c in input.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }

    out
}

/// Builds a terminal output line.
#[must_use]
pub fn terminal_line(clock: &str, icon: &str, text: &str) -> String {
    format!("[{clock}]{icon} {text}")
}

/// Builds a remote message body, optionally ending in a direct mention.
#[must_use]
pub fn remote_line(icon: &str, text: &str, clock: &str, mention: Option<&str>) -> String {
    match mention {
        Some(user) => format!("{icon} {text} {{{clock}}} <@{user}>"),
        None => format!("{icon} {text} {{{clock}}}"),
    }
}

/// Startup banner lines.
#[must_use]
pub fn banner(version: &str, journal_dir: &str, journal_file: &str) -> Vec<String> {
    let title = format!("AFK Monitor v{version}");
    let rule = "=".repeat(title.len().max(37));
    vec![
        rule.as_str().cyan().to_string(),
        title.as_str().cyan().to_string(),
        rule.as_str().cyan().to_string(),
        String::new(),
        format!("{} {journal_dir}", "Journal folder:".yellow()),
        format!("{} {journal_file}", "Latest journal:".yellow()),
        String::new(),
        "Starting... (Press Ctrl+C to stop)".to_string(),
        String::new(),
    ]
}
