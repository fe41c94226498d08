//! Catalogue and purchase-date file loading.
//!
//! Both inputs are hand-edited text files, so parsing is lenient:
//! - blank lines are ignored
//! - malformed lines are skipped and reported with their line number
//! - a missing file is a warning, not an error (the run just has less to do)

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::NaiveDate;
use log::{info, warn};

use crate::data::boc::DEFAULT_PRODUCT;
use crate::domain::{Catalogue, DateRange, PurchaseBook, SourceKind};
use crate::error::AppError;

const DATE_FMT: &str = "%Y-%m-%d";

/// A line that was skipped during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    pub line: usize,
    pub message: String,
}

/// Purchase file contents plus the lines that could not be used.
#[derive(Debug, Clone, Default)]
pub struct PurchaseFile {
    pub book: PurchaseBook,
    pub skipped: Vec<LineError>,
    pub lines_read: usize,
}

/// Load one catalogue file per source kind from `dir`.
///
/// Without a BOC catalogue file the fixed BOC product is still queried.
pub fn load_catalogue(dir: &Path) -> Result<Catalogue, AppError> {
    let mut catalogue = Catalogue::new();

    for kind in SourceKind::ALL {
        let path = dir.join(kind.catalog_file());
        let ids = match read_optional(&path)? {
            Some(text) => parse_product_codes(&text),
            None if kind == SourceKind::BocFixed => vec![DEFAULT_PRODUCT.to_string()],
            None => {
                warn!("Catalogue file '{}' not found; no {kind} products", path.display());
                Vec::new()
            }
        };
        info!("Loaded {} {kind} product(s)", ids.len());
        catalogue.push(kind, ids);
    }

    Ok(catalogue)
}

/// One product id per line; surrounding whitespace trimmed, blank lines ignored.
pub fn parse_product_codes(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load `productID confirmDate [redeemDate]` lines from `path`.
pub fn load_purchase_dates(path: &Path) -> Result<PurchaseFile, AppError> {
    let Some(text) = read_optional(path)? else {
        warn!("Purchase date file '{}' not found; only latest NAVs will be queried", path.display());
        return Ok(PurchaseFile::default());
    };

    let parsed = parse_purchase_dates(&text);
    for err in &parsed.skipped {
        warn!("{}:{}: {}", path.display(), err.line, err.message);
    }
    info!(
        "Loaded {} purchase event(s) from {} line(s)",
        parsed.book.event_count(),
        parsed.lines_read
    );
    Ok(parsed)
}

pub fn parse_purchase_dates(text: &str) -> PurchaseFile {
    let mut out = PurchaseFile::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        out.lines_read += 1;

        // Leftover JSON braces and "source ..." headers are not data.
        if raw.starts_with(['{', '}']) || raw.starts_with("source") {
            continue;
        }

        let fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 2 {
            out.skipped.push(LineError {
                line,
                message: format!("Expected `productID confirmDate [redeemDate]`, got '{}'", raw.trim()),
            });
            continue;
        }

        let purchase = match NaiveDate::parse_from_str(fields[1], DATE_FMT) {
            Ok(d) => d,
            Err(e) => {
                out.skipped.push(LineError {
                    line,
                    message: format!("Invalid confirm date '{}': {e}", fields[1]),
                });
                continue;
            }
        };

        // An unreadable redeem date only drops the redeem lookup.
        let redeem = fields
            .get(2)
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FMT).ok());

        out.book.add(fields[0], DateRange::new(Some(purchase), redeem));
    }

    out
}

fn read_optional(path: &Path) -> Result<Option<String>, AppError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::new(
            2,
            format!("Failed to read '{}': {e}", path.display()),
        )),
    }
}
