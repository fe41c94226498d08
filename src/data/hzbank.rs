//! Hangzhou Bank Wealth: static JSON array per product.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::data::http::{build_client, points_from_entries};
use crate::data::{SourceAdapter, SourceSettings};
use crate::domain::{NavPoint, Series, SourceKind};
use crate::error::{AppError, FetchFailure};
use crate::series::merge;

const BASE_URL: &str = "http://www.hzbankwealth.cn/content/detail";

pub struct HzbankAdapter {
    client: Client,
    timeout: Duration,
}

impl HzbankAdapter {
    pub fn new(settings: &SourceSettings) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(settings.request_timeout, true)?,
            timeout: settings.request_timeout,
        })
    }
}

impl SourceAdapter for HzbankAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Hzbank
    }

    fn request_budget(&self) -> Duration {
        self.timeout
    }

    fn fetch(&self, product_id: &str) -> Result<Series, FetchFailure> {
        let body = self
            .client
            .get(netval_url(product_id))
            .header("Accept", "application/json, text/javascript, */*; q=0.01")
            .header("Referer", format!("{BASE_URL}/{product_id}.html"))
            .header("X-Requested-With", "XMLHttpRequest")
            .send()?
            .error_for_status()?
            .text()?;

        let points = parse_netval(&body)?;
        debug!("HZBANK {product_id}: {} points", points.len());
        Ok(merge([points]))
    }
}

/// The JSON file name uses the lower-cased product code.
fn netval_url(product_id: &str) -> String {
    format!("{BASE_URL}/{}_netval.json", product_id.to_lowercase())
}

fn parse_netval(body: &str) -> Result<Vec<NavPoint>, FetchFailure> {
    match serde_json::from_str::<Value>(body)? {
        Value::Array(entries) => Ok(points_from_entries(&entries, "date", "%Y-%m-%d", "net_value")),
        Value::Null => Ok(Vec::new()),
        other => Err(FetchFailure::Parse(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn url_lowercases_the_code() {
        assert_eq!(
            netval_url("HYJX24A001"),
            "http://www.hzbankwealth.cn/content/detail/hyjx24a001_netval.json"
        );
    }

    #[test]
    fn parses_unsorted_array() {
        let body = r#"[
            {"date": "2024-03-02", "net_value": "1.0203"},
            {"date": "2024-03-01", "net_value": "1.0201"}
        ]"#;
        let series = merge([parse_netval(body).unwrap()]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.latest().unwrap().value, dec!(1.0203));
    }

    #[test]
    fn object_payload_is_a_parse_failure() {
        let err = parse_netval(r#"{"error": "not found"}"#).unwrap_err();
        assert_eq!(err, FetchFailure::Parse("expected a JSON array, got object".to_string()));
    }

    #[test]
    fn empty_array_is_empty() {
        assert!(parse_netval("[]").unwrap().is_empty());
    }
}
