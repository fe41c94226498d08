//! Bank of China fixed products: latest NAV scraped from a published HTML table.
//!
//! The page only shows the current NAV, so the series has a single point dated
//! on the day of the run.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use log::debug;
use reqwest::blocking::Client;
use scraper::{Html, Selector};

use crate::data::http::{build_client, parse_nav};
use crate::data::{SourceAdapter, SourceSettings};
use crate::domain::{NavPoint, Series, SourceKind};
use crate::error::{AppError, FetchFailure};
use crate::series::merge;

const URL: &str = "https://www.bankofchina.com/sourcedb/srfd6_2024/index_2.html";

/// Product code -> name as printed in the table.
const KNOWN_PRODUCTS: &[(&str, &str)] = &[("2501240100", "年年鑫最短持有期11号A")];

/// Product queried when no BOC catalogue file is present.
pub const DEFAULT_PRODUCT: &str = "2501240100";

pub struct BocFixedAdapter {
    client: Client,
    timeout: Duration,
}

impl BocFixedAdapter {
    pub fn new(settings: &SourceSettings) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(settings.request_timeout, false)?,
            timeout: settings.request_timeout,
        })
    }
}

impl SourceAdapter for BocFixedAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::BocFixed
    }

    fn request_budget(&self) -> Duration {
        self.timeout
    }

    fn fetch(&self, product_id: &str) -> Result<Series, FetchFailure> {
        let name = display_name(product_id)
            .ok_or_else(|| FetchFailure::Upstream(format!("no table name known for {product_id}")))?;

        let bytes = self.client.get(URL).send()?.error_for_status()?.bytes()?;
        // The page does not always declare its charset; it is UTF-8.
        let html = String::from_utf8_lossy(&bytes);

        let point = find_table_nav(&html, name, Local::now().date_naive())?;
        debug!("BOC {product_id}: {} on {}", point.value, point.date);
        Ok(merge([[point]]))
    }
}

fn display_name(product_id: &str) -> Option<&'static str> {
    KNOWN_PRODUCTS
        .iter()
        .find(|(code, _)| *code == product_id)
        .map(|(_, name)| *name)
}

/// Find the row whose second cell is `name` and read the NAV from the third.
fn find_table_nav(html: &str, name: &str, today: NaiveDate) -> Result<NavPoint, FetchFailure> {
    let document = Html::parse_document(html);
    let rows = Selector::parse("tr").map_err(|e| FetchFailure::Parse(e.to_string()))?;
    let cells = Selector::parse("td").map_err(|e| FetchFailure::Parse(e.to_string()))?;

    for row in document.select(&rows) {
        let texts: Vec<String> = row
            .select(&cells)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        if texts.len() >= 3 && texts[1] == name {
            let value = parse_nav(&texts[2])
                .ok_or_else(|| FetchFailure::Parse(format!("invalid NAV cell '{}'", texts[2])))?;
            return Ok(NavPoint::new(today, value));
        }
    }

    Err(FetchFailure::Upstream(format!("no table row for '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PAGE: &str = r#"
        <html><body><table>
          <tr><th>No.</th><th>Product</th><th>NAV</th></tr>
          <tr><td>1</td><td> 年年鑫最短持有期10号A </td><td>1.0301</td></tr>
          <tr><td>2</td><td> 年年鑫最短持有期11号A </td><td> 1.0456 </td></tr>
        </table></body></html>
    "#;

    #[test]
    fn finds_row_by_name() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let point = find_table_nav(PAGE, "年年鑫最短持有期11号A", today).unwrap();
        assert_eq!(point, NavPoint::new(today, dec!(1.0456)));
    }

    #[test]
    fn missing_row_is_an_upstream_failure() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let err = find_table_nav(PAGE, "unknown", today).unwrap_err();
        assert!(matches!(err, FetchFailure::Upstream(_)));
    }

    #[test]
    fn default_product_has_a_name() {
        assert_eq!(display_name(DEFAULT_PRODUCT), Some("年年鑫最短持有期11号A"));
        assert_eq!(display_name("0000000000"), None);
    }
}
