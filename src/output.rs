//! Output formatters for earthquake events.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use crate::layers::Severity;
use crate::models::EarthquakeEvent;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Severity-band colors
const RED: &str = "\x1b[91m"; // high: mag >= 6.0
const YELLOW: &str = "\x1b[93m"; // moderate: mag >= 4.0
const GREEN: &str = "\x1b[92m"; // low: mag < 4.0

const ICON_QUAKE: &str = "🌋";
const ICON_FELT: &str = "👥";
const ICON_TSUNAMI: &str = "🌊";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Color code for a severity band.
fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::High => RED,
        Severity::Moderate => YELLOW,
        Severity::Low => GREEN,
    }
}

/// Label for a severity band.
fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "HIGH",
        Severity::Moderate => "MODERATE",
        Severity::Low => "LOW",
    }
}

/// Write events in human-readable format with severity colors.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, events: &[EarthquakeEvent]) -> io::Result<()> {
    for event in events {
        let time = event.occurred_at.format("%Y-%m-%d %H:%M:%S");
        let severity = Severity::from_magnitude(event.magnitude);
        let color = severity_color(severity);
        let label = severity_label(severity);

        let felt = match &event.felt_reports {
            Some(reports) => format!(" {ICON_FELT} {reports}"),
            None => String::new(),
        };

        // The feed phrases tsunami potential as free text; only flag the
        // positive case.
        let tsunami = match event.potential.as_deref() {
            Some(text) if text.to_lowercase().contains("berpotensi tsunami")
                && !text.to_lowercase().contains("tidak") =>
            {
                format!(" {ICON_TSUNAMI}")
            }
            _ => String::new(),
        };

        writeln!(
            writer,
            "{ICON_QUAKE} {color}{BOLD}M{mag:.1}{RESET} │ \
             {color}{label:8}{RESET} │ \
             {DIM}{depth:>4.0}km{RESET} │ \
             {time} UTC │ \
             {region}{felt}{tsunami}",
            mag = event.magnitude,
            depth = event.depth_km,
            region = event.region,
        )?;
    }
    Ok(())
}

/// Write events as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, events: &[EarthquakeEvent]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(events)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write events as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, events: &[EarthquakeEvent]) -> io::Result<()> {
    for event in events {
        let json = serde_json::to_string(event)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write events in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_events<W: Write>(
    writer: &mut W,
    events: &[EarthquakeEvent],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, events),
        Format::Json => write_json(writer, events),
        Format::Ndjson => write_ndjson(writer, events),
    }
}
