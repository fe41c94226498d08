//! CITIC Wealth: JSON API with an application-level status code.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::data::http::{build_client, points_from_entries};
use crate::data::{SourceAdapter, SourceSettings};
use crate::domain::{NavPoint, Series, SourceKind};
use crate::error::{AppError, FetchFailure};
use crate::series::merge;

const URL: &str = "https://wechat.citic-wealth.com/cms.product/api/custom/productInfo/getTAProductNav";
const SUCCESS_CODE: &str = "0000";

pub struct CiticAdapter {
    client: Client,
    timeout: Duration,
    session: Option<String>,
}

impl CiticAdapter {
    pub fn new(settings: &SourceSettings) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(settings.request_timeout, true)?,
            timeout: settings.request_timeout,
            session: settings.citic_session.clone(),
        })
    }
}

impl SourceAdapter for CiticAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Citic
    }

    fn request_budget(&self) -> Duration {
        self.timeout
    }

    fn fetch(&self, product_id: &str) -> Result<Series, FetchFailure> {
        let mut req = self
            .client
            .get(URL)
            .query(&[("prodCode", product_id), ("queryUnit", "5")])
            .header("Accept", "application/json, text/plain, */*")
            .header("Origin", "https://www.citic-wealth.com")
            .header("Referer", "https://www.citic-wealth.com/")
            .header("channel", "h5_trade_service");
        if let Some(session) = &self.session {
            req = req.header("Cookie", format!("JSESSIONID={session}"));
        }

        let body = req.send()?.error_for_status()?.text()?;
        let points = parse_nav_response(&body)?;
        debug!("CITIC {product_id}: {} points", points.len());
        Ok(merge([points]))
    }
}

#[derive(Debug, Deserialize)]
struct NavResponse {
    #[serde(default)]
    code: Value,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<NavData>,
}

#[derive(Debug, Deserialize)]
struct NavData {
    #[serde(rename = "productNavList", default)]
    product_nav_list: Vec<Value>,
}

fn parse_nav_response(body: &str) -> Result<Vec<NavPoint>, FetchFailure> {
    let resp: NavResponse = serde_json::from_str(body)?;
    if resp.code.as_str() != Some(SUCCESS_CODE) {
        return Err(FetchFailure::Upstream(format!(
            "code {}: {}",
            resp.code,
            resp.msg.unwrap_or_default()
        )));
    }
    let entries = resp.data.map(|d| d.product_nav_list).unwrap_or_default();
    Ok(points_from_entries(&entries, "navDate", "%Y%m%d", "nav"))
}
