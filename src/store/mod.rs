//! Destination table store.
//!
//! - `TableStore`: the operations publishing needs (auth, list, delete, insert)
//! - `feishu`: the Feishu Bitable implementation
//! - `publish`: full-replace publishing of a run's records
//! - `token`: access token cache shared by the store's requests

use chrono::{Local, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::Record;
use crate::error::StoreError;

pub mod feishu;
pub mod publish;
pub mod token;

pub use feishu::{FeishuClient, FeishuConfig};
pub use publish::{PublishReport, publish};
pub use token::{IssuedToken, TokenCache};

/// A replace-only table.
pub trait TableStore {
    /// Obtain (or confirm) a valid access token.
    fn authenticate(&self) -> Result<(), StoreError>;

    /// Ids of every row currently in the table, across all pages.
    fn list_record_ids(&self) -> Result<Vec<String>, StoreError>;

    fn delete_records(&self, ids: &[String]) -> Result<(), StoreError>;

    fn insert_record(&self, row: &TableRow) -> Result<(), StoreError>;
}

/// One published row. Field names are the destination table's column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    #[serde(rename = "产品代码")]
    pub product_code: String,
    #[serde(rename = "当日净值")]
    pub latest_nav: Decimal,
    #[serde(rename = "30日前净值")]
    pub prior_nav_30d: Decimal,
    #[serde(rename = "购入当日净值", skip_serializing_if = "Option::is_none")]
    pub purchase_nav: Option<Decimal>,
    #[serde(rename = "赎回净值")]
    pub redeem_nav: Decimal,
    /// Epoch millis.
    #[serde(rename = "确认日", skip_serializing_if = "Option::is_none")]
    pub confirm_date: Option<i64>,
    /// Epoch millis.
    #[serde(rename = "数据更新日期")]
    pub as_of_date: i64,
}

impl TableRow {
    /// `None` for records without a real latest NAV (sentinels are not published).
    pub fn from_record(record: &Record) -> Option<Self> {
        let latest_nav = record.latest_nav.value()?;
        let as_of = record.as_of_date?;
        Some(Self {
            product_code: record.product_id.clone(),
            latest_nav,
            prior_nav_30d: record.prior_nav_30d.value().unwrap_or(Decimal::ZERO),
            purchase_nav: record.purchase_nav,
            redeem_nav: record.redeem_nav.unwrap_or(Decimal::ZERO),
            confirm_date: record.confirm_date.map(local_midnight_millis),
            as_of_date: local_midnight_millis(as_of),
        })
    }
}

/// Milliseconds since the epoch at local midnight of `date`.
pub fn local_midnight_millis(date: NaiveDate) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN);
    midnight
        .and_local_timezone(Local)
        .earliest()
        .map(|t| t.timestamp_millis())
        .unwrap_or_else(|| midnight.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NavValue, SourceKind};
    use crate::error::FailureKind;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record() -> Record {
        Record {
            product_id: "AF245337".to_string(),
            source: SourceKind::Citic,
            latest_nav: NavValue::Value(dec!(1.05)),
            prior_nav_30d: NavValue::Value(dec!(1.02)),
            as_of_date: Some(d(2024, 2, 5)),
            purchase_nav: None,
            redeem_nav: None,
            confirm_date: None,
            failure: None,
        }
    }

    #[test]
    fn row_omits_unrequested_fields() {
        let row = TableRow::from_record(&record()).unwrap();
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["产品代码"], "AF245337");
        assert_eq!(json["当日净值"], 1.05);
        assert_eq!(json["30日前净值"], 1.02);
        assert_eq!(json["赎回净值"], 0.0);
        assert!(json.get("购入当日净值").is_none());
        assert!(json.get("确认日").is_none());
        assert_eq!(json["数据更新日期"], local_midnight_millis(d(2024, 2, 5)));
    }

    #[test]
    fn row_carries_purchase_fields() {
        let mut rec = record();
        rec.purchase_nav = Some(dec!(1.02));
        rec.confirm_date = Some(d(2024, 1, 10));
        let row = TableRow::from_record(&rec).unwrap();

        assert_eq!(row.purchase_nav, Some(dec!(1.02)));
        assert_eq!(row.confirm_date, Some(local_midnight_millis(d(2024, 1, 10))));
    }

    #[test]
    fn sentinel_records_are_not_rows() {
        let mut rec = record();
        rec.latest_nav = NavValue::Error;
        rec.failure = Some(FailureKind::Timeout);
        assert!(TableRow::from_record(&rec).is_none());

        let mut rec = record();
        rec.latest_nav = NavValue::NoData;
        rec.as_of_date = None;
        assert!(TableRow::from_record(&rec).is_none());
    }

    #[test]
    fn consecutive_days_are_one_day_apart() {
        let a = local_midnight_millis(d(2024, 1, 10));
        let b = local_midnight_millis(d(2024, 1, 11));
        assert_eq!(b - a, 86_400_000);
    }
}
