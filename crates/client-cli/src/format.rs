//! Display formatting shared by the dashboard and the plain-text commands.

use chrono::Local;
use shared::Timestamp;

pub const DASH: &str = "—";

/// Colour family of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Blue,
    Yellow,
    Purple,
    Green,
    Gray,
}

pub fn status_tone(status_name: &str) -> Tone {
    match status_name {
        "New Contact" => Tone::Blue,
        "In Studies" => Tone::Yellow,
        "Baptized" => Tone::Purple,
        "Gospel Worker" => Tone::Green,
        _ => Tone::Gray,
    }
}

/// Calendar day in UTC, which is how the services store date-only values.
pub fn date(ts: &Timestamp) -> String {
    ts.date().format("%Y-%m-%d").to_string()
}

pub fn date_time(ts: &Timestamp) -> String {
    ts.as_utc().with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn time_of_day(ts: &Timestamp) -> String {
    ts.as_utc().with_timezone(&Local).format("%H:%M").to_string()
}

pub fn time_range(start: &Timestamp, end: &Timestamp) -> String {
    format!("{} - {}", time_of_day(start), time_of_day(end))
}

pub fn duration(minutes: i64) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

pub fn percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// The value, or a dash when absent or blank.
pub fn or_dash(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => DASH.to_string(),
    }
}
