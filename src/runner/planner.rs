//! Expand the catalogue into independent tasks.

use crate::domain::{Catalogue, DateRange, ProductTask, PurchaseBook};

/// One task per purchase event, or a single latest-only task when a product
/// has none.
///
/// Order: source kinds as inserted, then catalogue order, then event order.
/// Purchase entries for products missing from the catalogue are ignored.
pub fn plan(catalogue: &Catalogue, purchases: &PurchaseBook) -> Vec<ProductTask> {
    let mut tasks = Vec::new();

    for (source, ids) in catalogue.iter() {
        for product_id in ids {
            let events = purchases.events(product_id);
            if events.is_empty() {
                tasks.push(ProductTask {
                    product_id: product_id.clone(),
                    source,
                    dates: DateRange::default(),
                });
                continue;
            }
            tasks.extend(events.iter().map(|dates| ProductTask {
                product_id: product_id.clone(),
                source,
                dates: *dates,
            }));
        }
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceKind;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn expands_purchase_events_in_order() {
        let mut catalogue = Catalogue::new();
        catalogue.push(SourceKind::Cmbc, ids(&["C1"]));
        catalogue.push(SourceKind::Bocom, ids(&["B1", "B2"]));

        let mut purchases = PurchaseBook::new();
        purchases.add("B2", DateRange::new(Some(d(2024, 1, 1)), None));
        purchases.add("B2", DateRange::new(Some(d(2024, 2, 1)), Some(d(2024, 5, 1))));
        purchases.add("UNLISTED", DateRange::new(Some(d(2024, 3, 1)), None));

        let tasks = plan(&catalogue, &purchases);
        let summary: Vec<(&str, SourceKind, Option<NaiveDate>)> = tasks
            .iter()
            .map(|t| (t.product_id.as_str(), t.source, t.dates.purchase))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("C1", SourceKind::Cmbc, None),
                ("B1", SourceKind::Bocom, None),
                ("B2", SourceKind::Bocom, Some(d(2024, 1, 1))),
                ("B2", SourceKind::Bocom, Some(d(2024, 2, 1))),
            ]
        );
        assert_eq!(tasks[3].dates.redeem, Some(d(2024, 5, 1)));
    }

    #[test]
    fn product_without_events_gets_one_latest_only_task() {
        let mut catalogue = Catalogue::new();
        catalogue.push(SourceKind::Hzbank, ids(&["H1"]));

        let tasks = plan(&catalogue, &PurchaseBook::new());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].dates, DateRange::default());
    }

    #[test]
    fn empty_catalogue_plans_nothing() {
        let mut purchases = PurchaseBook::new();
        purchases.add("X", DateRange::new(Some(d(2024, 1, 1)), None));
        assert!(plan(&Catalogue::new(), &purchases).is_empty());
    }
}
