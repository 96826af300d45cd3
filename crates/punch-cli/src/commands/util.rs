//! Shared helpers for CLI commands.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Parses an optional ISO 8601 timestamp flag.
pub fn parse_timestamp(s: Option<&str>, name: &str) -> Result<Option<DateTime<Utc>>> {
    match s {
        None => Ok(None),
        Some(s) => parse_required_timestamp(s, name).map(Some),
    }
}

/// Parses a required ISO 8601 timestamp flag.
pub fn parse_required_timestamp(s: &str, name: &str) -> Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| {
        format!("invalid --{name} timestamp, expected ISO 8601 (e.g., 2025-01-29T12:00:00Z)")
    })?;
    Ok(dt.with_timezone(&Utc))
}
