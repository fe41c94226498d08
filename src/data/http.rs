//! Shared HTTP client construction and lenient payload value parsing.

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use log::debug;
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::domain::NavPoint;
use crate::error::AppError;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Build the blocking client an adapter keeps for its whole lifetime.
///
/// `accept_invalid_certs` is for providers whose certificates do not verify.
pub fn build_client(timeout: Duration, accept_invalid_certs: bool) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))
}

/// Parse a NAV string. Empty, non-numeric and negative values are rejected.
pub fn parse_nav(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let v = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()?;
    if v.is_sign_negative() { None } else { Some(v) }
}

/// NAV from a JSON string or number.
pub fn nav_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_nav(s),
        Value::Number(n) => parse_nav(&n.to_string()),
        _ => None,
    }
}

/// Date from a JSON string or integer (e.g. `20240105`) in the given format.
pub fn date_from_json(value: &Value, fmt: &str) -> Option<NaiveDate> {
    match value {
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), fmt).ok(),
        Value::Number(n) => NaiveDate::parse_from_str(&n.to_string(), fmt).ok(),
        _ => None,
    }
}

/// Turn a list of JSON objects into points, dropping entries that fail to parse.
pub fn points_from_entries(
    entries: &[Value],
    date_key: &str,
    date_fmt: &str,
    value_key: &str,
) -> Vec<NavPoint> {
    let points: Vec<NavPoint> = entries
        .iter()
        .filter_map(|entry| {
            let date = date_from_json(entry.get(date_key)?, date_fmt)?;
            let value = nav_from_json(entry.get(value_key)?)?;
            Some(NavPoint::new(date, value))
        })
        .collect();

    let dropped = entries.len() - points.len();
    if dropped > 0 {
        debug!("Dropped {dropped} malformed NAV entries out of {}", entries.len());
    }
    points
}
