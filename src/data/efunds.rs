//! E Fund: NAV history embedded in a JS file as a delimited string.
//!
//! Two files are fetched per product, the full history and the last year. The
//! recent file is merged last so it wins on overlapping dates.
//!
//! Blob format: `var x = "YYYYMMDD_<field>_<nav>_...;YYYYMMDD_...;";`

use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, warn};
use regex::Regex;
use reqwest::blocking::Client;

use crate::data::http::{build_client, parse_nav};
use crate::data::{SourceAdapter, SourceSettings};
use crate::domain::{NavPoint, Series, SourceKind};
use crate::error::{AppError, FetchFailure};
use crate::series::merge;

const CDN_BASE: &str = "https://cdn.efunds.com.cn/market/2.0";
const REFERER: &str = "https://www.efunds.com.cn/";
const BLOB_PATTERN: &str = r#"=\s*"(.*?)";"#;
/// Files fetched per product, one after the other.
const HISTORY_PARTS: u32 = 2;

pub struct EfundsAdapter {
    client: Client,
    timeout: Duration,
    blob: Regex,
}

impl EfundsAdapter {
    pub fn new(settings: &SourceSettings) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(settings.request_timeout, false)?,
            timeout: settings.request_timeout,
            blob: Regex::new(BLOB_PATTERN)
                .map_err(|e| AppError::new(2, format!("Invalid NAV blob pattern: {e}")))?,
        })
    }

    fn fetch_part(&self, url: &str) -> Result<Vec<NavPoint>, FetchFailure> {
        let body = self
            .client
            .get(url)
            .header("Referer", REFERER)
            .send()?
            .error_for_status()?
            .text()?;
        parse_blob(&self.blob, &body)
    }
}

impl SourceAdapter for EfundsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Efunds
    }

    fn request_budget(&self) -> Duration {
        self.timeout * HISTORY_PARTS
    }

    fn fetch(&self, product_id: &str) -> Result<Series, FetchFailure> {
        let urls = [
            format!("{CDN_BASE}/his/{product_id}_all.js"),
            format!("{CDN_BASE}/{product_id}_1y.js"),
        ];
        let series = merge_parts(
            product_id,
            urls.iter().map(|url| (url.as_str(), self.fetch_part(url))),
        )?;
        debug!("EFUNDS {product_id}: {} points", series.len());
        Ok(series)
    }
}

/// Merge whichever parts arrived, in order. Fails only when every part failed.
fn merge_parts<'a, I>(product_id: &str, parts: I) -> Result<Series, FetchFailure>
where
    I: IntoIterator<Item = (&'a str, Result<Vec<NavPoint>, FetchFailure>)>,
{
    let mut ok = Vec::new();
    let mut last_err = None;
    for (url, part) in parts {
        match part {
            Ok(points) => ok.push(points),
            Err(e) => {
                warn!("EFUNDS {product_id}: {url} failed: {e}");
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(err) if ok.is_empty() => Err(err),
        _ => Ok(merge(ok)),
    }
}

fn parse_blob(re: &Regex, body: &str) -> Result<Vec<NavPoint>, FetchFailure> {
    let content = re
        .captures(body)
        .and_then(|c| c.get(1))
        .ok_or_else(|| FetchFailure::Parse("no quoted NAV blob in script".to_string()))?
        .as_str();

    Ok(content.split(';').filter_map(parse_entry).collect())
}

fn parse_entry(entry: &str) -> Option<NavPoint> {
    // `0_...` entries are placeholders.
    if entry.is_empty() || !entry.contains('_') || entry.starts_with("0_") {
        return None;
    }
    let fields: Vec<&str> = entry.split('_').collect();
    if fields.len() < 3 {
        return None;
    }
    let date = NaiveDate::parse_from_str(fields[0], "%Y%m%d").ok()?;
    let value = parse_nav(fields[2])?;
    Some(NavPoint::new(date, value))
}
