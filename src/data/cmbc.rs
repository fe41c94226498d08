//! CMBC Wealth: form POST returning a JSON `list` of daily NAVs.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::data::http::{build_client, points_from_entries};
use crate::data::{SourceAdapter, SourceSettings};
use crate::domain::{NavPoint, Series, SourceKind};
use crate::error::{AppError, FetchFailure};
use crate::series::merge;

const URL: &str = "https://www.cmbcwm.com.cn/gw/po_web/BTADailyQry";

/// How far back the history request reaches.
const HISTORY_DAYS: i64 = 1460;

pub struct CmbcAdapter {
    client: Client,
    timeout: Duration,
}

impl CmbcAdapter {
    pub fn new(settings: &SourceSettings) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(settings.slow_request_timeout, true)?,
            timeout: settings.slow_request_timeout,
        })
    }
}

impl SourceAdapter for CmbcAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Cmbc
    }

    fn request_budget(&self) -> Duration {
        self.timeout
    }

    fn fetch(&self, product_id: &str) -> Result<Series, FetchFailure> {
        let form = history_form(product_id, Local::now().date_naive());
        let body = self
            .client
            .post(URL)
            .form(&form)
            .send()?
            .error_for_status()?
            .text()?;

        let points = parse_daily_list(&body)?;
        debug!("CMBC {product_id}: {} points", points.len());
        Ok(merge([points]))
    }
}

fn history_form(product_id: &str, today: NaiveDate) -> [(&'static str, String); 4] {
    let begin = today - chrono::Duration::days(HISTORY_DAYS);
    [
        ("chart_type", "0".to_string()),
        ("real_prd_code", product_id.to_string()),
        ("begin_date", begin.format("%Y%m%d").to_string()),
        ("end_date", String::new()),
    ]
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(default)]
    list: Vec<Value>,
}

fn parse_daily_list(body: &str) -> Result<Vec<NavPoint>, FetchFailure> {
    let resp: DailyResponse = serde_json::from_str(body)?;
    Ok(points_from_entries(&resp.list, "ISS_DATE", "%Y%m%d", "NAV"))
}
