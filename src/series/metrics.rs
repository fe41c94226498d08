//! Point-in-time metrics derived from a normalized series.
//!
//! Every lookup uses the same forward-fill floor: when the exact date is missing,
//! take the first later point. Never interpolate, never step backward.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::domain::{NavValue, ProductTask, Record, Series};

/// Look-back window for the lagged NAV.
pub const PRIOR_WINDOW_DAYS: i64 = 30;

/// Derive the record for `task` from its series. Never fails.
pub fn derive(task: &ProductTask, series: &Series) -> Record {
    let Some(latest) = series.latest() else {
        return Record {
            product_id: task.product_id.clone(),
            source: task.source,
            latest_nav: NavValue::NoData,
            prior_nav_30d: NavValue::NoData,
            as_of_date: None,
            purchase_nav: Some(Decimal::ZERO),
            redeem_nav: Some(Decimal::ZERO),
            confirm_date: task.dates.purchase,
            failure: None,
        };
    };

    Record {
        product_id: task.product_id.clone(),
        source: task.source,
        latest_nav: NavValue::Value(latest.value),
        prior_nav_30d: NavValue::Value(prior_nav(series, latest.date)),
        as_of_date: Some(latest.date),
        purchase_nav: nav_on(series, task.dates.purchase),
        redeem_nav: nav_on(series, task.dates.redeem),
        confirm_date: task.dates.purchase,
        failure: None,
    }
}

/// Value of the first point on or after `as_of - 30 days`.
fn prior_nav(series: &Series, as_of: NaiveDate) -> Decimal {
    let target = as_of - Duration::days(PRIOR_WINDOW_DAYS);
    series
        .first_on_or_after(target)
        .map(|p| p.value)
        .unwrap_or(Decimal::ZERO)
}

/// `None` when not requested; `Some(0)` when the date is past the last point.
fn nav_on(series: &Series, target: Option<NaiveDate>) -> Option<Decimal> {
    let target = target?;
    Some(
        series
            .first_on_or_after(target)
            .map(|p| p.value)
            .unwrap_or(Decimal::ZERO),
    )
}
