//! Shared domain types.
//!
//! Small value types that move freely between worker threads: a task goes in,
//! a record comes out.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Upstream provider families. Each variant has exactly one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    Bocom,
    Cmbc,
    Efunds,
    Citic,
    Hzbank,
    BocFixed,
}

impl SourceKind {
    /// Catalogue processing order.
    pub const ALL: [SourceKind; 6] = [
        SourceKind::Bocom,
        SourceKind::Cmbc,
        SourceKind::Efunds,
        SourceKind::Citic,
        SourceKind::Hzbank,
        SourceKind::BocFixed,
    ];

    /// Human-readable label for logs and terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            SourceKind::Bocom => "BOCOM",
            SourceKind::Cmbc => "CMBC",
            SourceKind::Efunds => "EFUNDS",
            SourceKind::Citic => "CITIC",
            SourceKind::Hzbank => "HZBANK",
            SourceKind::BocFixed => "BOC_FIXED",
        }
    }

    /// Name of the catalogue file listing this kind's product ids.
    pub fn catalog_file(self) -> &'static str {
        match self {
            SourceKind::Bocom => "bocom.txt",
            SourceKind::Cmbc => "cmbc.txt",
            SourceKind::Efunds => "efunds.txt",
            SourceKind::Citic => "citic.txt",
            SourceKind::Hzbank => "hzbank.txt",
            SourceKind::BocFixed => "boc_fixed.txt",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One NAV observation. `value` is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

impl NavPoint {
    pub fn new(date: NaiveDate, value: Decimal) -> Self {
        Self { date, value }
    }
}

/// NAV points sorted by strictly increasing date.
///
/// Only the normalizer builds these (`crate::series::merge`), so every
/// `Series` in the program already satisfies the ordering invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Series {
    points: Vec<NavPoint>,
}

impl Series {
    /// Wrap points that are already sorted with unique dates.
    pub(crate) fn from_sorted(points: Vec<NavPoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        Self { points }
    }

    pub fn points(&self) -> &[NavPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point with the maximum date.
    pub fn latest(&self) -> Option<&NavPoint> {
        self.points.last()
    }

    /// First point whose date is on or after `date` (forward fill, never backward).
    pub fn first_on_or_after(&self, date: NaiveDate) -> Option<&NavPoint> {
        let idx = self.points.partition_point(|p| p.date < date);
        self.points.get(idx)
    }
}

impl IntoIterator for Series {
    type Item = NavPoint;
    type IntoIter = std::vec::IntoIter<NavPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a NavPoint;
    type IntoIter = std::slice::Iter<'a, NavPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Purchase / redemption dates requested for one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub purchase: Option<NaiveDate>,
    pub redeem: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(purchase: Option<NaiveDate>, redeem: Option<NaiveDate>) -> Self {
        Self { purchase, redeem }
    }
}

/// One independent fetch-and-derive unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTask {
    pub product_id: String,
    pub source: SourceKind,
    pub dates: DateRange,
}

/// Product ids grouped by source kind, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogue {
    entries: Vec<(SourceKind, Vec<String>)>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append ids under `kind`; a repeated kind extends its existing list.
    pub fn push(&mut self, kind: SourceKind, ids: impl IntoIterator<Item = String>) {
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, existing)) => existing.extend(ids),
            None => self.entries.push((kind, ids.into_iter().collect())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceKind, &[String])> {
        self.entries.iter().map(|(k, ids)| (*k, ids.as_slice()))
    }

    pub fn ids(&self, kind: SourceKind) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn product_count(&self) -> usize {
        self.entries.iter().map(|(_, ids)| ids.len()).sum()
    }
}

/// Purchase / redemption events per product id, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseBook {
    by_product: HashMap<String, Vec<DateRange>>,
}

impl PurchaseBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, product_id: impl Into<String>, range: DateRange) {
        self.by_product.entry(product_id.into()).or_default().push(range);
    }

    /// Events for `product_id`; empty when none were recorded.
    pub fn events(&self, product_id: &str) -> &[DateRange] {
        self.by_product
            .get(product_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn event_count(&self) -> usize {
        self.by_product.values().map(Vec::len).sum()
    }
}

/// A NAV figure or the reason there is none.
///
/// `NoData` and `Error` are distinct from a genuine zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavValue {
    Value(Decimal),
    NoData,
    Error,
}

impl NavValue {
    pub fn value(self) -> Option<Decimal> {
        match self {
            NavValue::Value(v) => Some(v),
            NavValue::NoData | NavValue::Error => None,
        }
    }
}

impl fmt::Display for NavValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavValue::Value(v) => write!(f, "{v}"),
            NavValue::NoData => f.write_str("No Data"),
            NavValue::Error => f.write_str("Error"),
        }
    }
}

/// Derived metrics for one task; exactly one per task.
///
/// `purchase_nav` / `redeem_nav`:
/// - `None`: not requested
/// - `Some(0)`: requested, but the date is past the last known point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub product_id: String,
    pub source: SourceKind,
    pub latest_nav: NavValue,
    pub prior_nav_30d: NavValue,
    pub as_of_date: Option<NaiveDate>,
    pub purchase_nav: Option<Decimal>,
    pub redeem_nav: Option<Decimal>,
    /// The task's purchase date, published as the confirmation date.
    pub confirm_date: Option<NaiveDate>,
    /// Set on `Error` records.
    pub failure: Option<crate::error::FailureKind>,
}

impl Record {
    /// The record emitted when a task's fetch failed.
    pub fn failed(task: &ProductTask, kind: crate::error::FailureKind) -> Self {
        Self {
            product_id: task.product_id.clone(),
            source: task.source,
            latest_nav: NavValue::Error,
            prior_nav_30d: NavValue::Error,
            as_of_date: None,
            purchase_nav: Some(Decimal::ZERO),
            redeem_nav: Some(Decimal::ZERO),
            confirm_date: task.dates.purchase,
            failure: Some(kind),
        }
    }

    /// Whether the record carries a real latest NAV and as-of date.
    pub fn is_publishable(&self) -> bool {
        matches!(self.latest_nav, NavValue::Value(_)) && self.as_of_date.is_some()
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// Derived from CLI flags (plus defaults); credentials come from the environment.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub catalog_dir: PathBuf,
    pub dates_file: PathBuf,
    /// Worker threads fetching in parallel.
    pub workers: usize,
    /// Deadline for a single task (all of its upstream requests).
    pub task_timeout: Duration,
    pub delete_batch_size: usize,
    /// Print results without touching the destination table.
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn first_on_or_after_steps_forward_only() {
        let series = Series::from_sorted(vec![
            NavPoint::new(d(2024, 1, 1), dec!(1.0)),
            NavPoint::new(d(2024, 1, 15), dec!(1.02)),
        ]);
        assert_eq!(series.first_on_or_after(d(2024, 1, 1)).unwrap().value, dec!(1.0));
        assert_eq!(series.first_on_or_after(d(2024, 1, 2)).unwrap().value, dec!(1.02));
        assert!(series.first_on_or_after(d(2024, 1, 16)).is_none());
    }

    #[test]
    fn sentinels_are_not_values() {
        assert_eq!(NavValue::NoData.value(), None);
        assert_eq!(NavValue::Error.value(), None);
        assert_eq!(NavValue::Value(Decimal::ZERO).value(), Some(Decimal::ZERO));
        assert_eq!(NavValue::NoData.to_string(), "No Data");
    }

    #[test]
    fn catalogue_order_is_stable() {
        assert_eq!(SourceKind::ALL[0], SourceKind::Bocom);
        assert_eq!(SourceKind::ALL[5], SourceKind::BocFixed);
        assert_eq!(SourceKind::BocFixed.catalog_file(), "boc_fixed.txt");
    }
}
