//! BOCOM Wealth: JSON envelope posted as a form field.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::data::http::{build_client, points_from_entries};
use crate::data::{SourceAdapter, SourceSettings};
use crate::domain::{NavPoint, Series, SourceKind};
use crate::error::{AppError, FetchFailure};
use crate::series::merge;

const URL: &str = "https://www.bocommwm.com/SITE/queryJylcBreakDetail.do";

pub struct BocomAdapter {
    client: Client,
    timeout: Duration,
    session: Option<String>,
}

impl BocomAdapter {
    pub fn new(settings: &SourceSettings) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(settings.request_timeout, true)?,
            timeout: settings.request_timeout,
            session: settings.bocom_session.clone(),
        })
    }
}

impl SourceAdapter for BocomAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Bocom
    }

    fn request_budget(&self) -> Duration {
        self.timeout
    }

    fn fetch(&self, product_id: &str) -> Result<Series, FetchFailure> {
        let message = request_message(product_id).to_string();
        let mut req = self
            .client
            .post(URL)
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&[("REQ_MESSAGE", message.as_str())]);
        if let Some(session) = &self.session {
            req = req.header("Cookie", format!("JSESSIONID={session}"));
        }

        let body = req.send()?.error_for_status()?.text()?;
        let points = parse_profit_list(&body)?;
        debug!("BOCOM {product_id}: {} points", points.len());
        Ok(merge([points]))
    }
}

fn request_message(product_id: &str) -> Value {
    json!({
        "REQ_HEAD": {"TRAN_PROCESS": "", "TRAN_ID": ""},
        "REQ_BODY": {
            "c_fundcode": product_id,
            "c_interestway": "0",
            "c_productcode": "undefined",
            "type": "max"
        }
    })
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "RSP_BODY", default)]
    body: Option<Body>,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(default)]
    result: Option<ProfitResult>,
}

#[derive(Debug, Deserialize)]
struct ProfitResult {
    #[serde(rename = "profitList", default)]
    profit_list: Vec<Value>,
}

/// A missing `profitList` is treated as an empty history.
fn parse_profit_list(body: &str) -> Result<Vec<NavPoint>, FetchFailure> {
    let envelope: Envelope = serde_json::from_str(body)?;
    let entries = envelope
        .body
        .and_then(|b| b.result)
        .map(|r| r.profit_list)
        .unwrap_or_default();
    Ok(points_from_entries(&entries, "d_cdate", "%Y-%m-%d", "f_netvalue"))
}
