//! Merge raw upstream points into a canonical series.
//!
//! Adapters may hit several endpoints for one product (e.g. a full history plus a
//! recent window). Parts are folded in the order given; when two parts disagree on
//! a date, the later part wins.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{NavPoint, Series};
use crate::error::EmptySeries;

/// Fold `parts` into one sorted, date-unique series. May be empty.
pub fn merge<I, P>(parts: I) -> Series
where
    I: IntoIterator<Item = P>,
    P: IntoIterator<Item = NavPoint>,
{
    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for part in parts {
        for point in part {
            by_date.insert(point.date, point.value);
        }
    }

    Series::from_sorted(
        by_date
            .into_iter()
            .map(|(date, value)| NavPoint::new(date, value))
            .collect(),
    )
}

/// Like [`merge`], but an empty result is reported as [`EmptySeries`].
pub fn normalize<I, P>(parts: I) -> Result<Series, EmptySeries>
where
    I: IntoIterator<Item = P>,
    P: IntoIterator<Item = NavPoint>,
{
    let series = merge(parts);
    if series.is_empty() {
        return Err(EmptySeries);
    }
    Ok(series)
}
