//! The sync workflow shared by the CLI and tests.
//!
//! catalogue + purchase dates -> tasks -> fetch/normalize/derive -> publish
//!
//! `run_sync` wires in the real adapters and the Feishu client; `run_with`
//! takes them as arguments so the whole flow can run against fakes.

use log::info;

use crate::data::{AdapterRegistry, SourceSettings};
use crate::domain::{Record, RunConfig};
use crate::error::AppError;
use crate::io::{load_catalogue, load_purchase_dates};
use crate::runner::{Runner, plan};
use crate::store::{FeishuClient, PublishReport, TableStore, publish};

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// One per task, in task order.
    pub records: Vec<Record>,
    /// `None` on a dry run.
    pub published: Option<PublishReport>,
}

/// Execute a full run with the production adapters and store.
pub fn run_sync(config: &RunConfig) -> Result<SyncOutcome, AppError> {
    // Credentials are checked before any fetching so a misconfigured run fails fast.
    let store = if config.dry_run {
        None
    } else {
        Some(FeishuClient::from_env()?)
    };

    let registry = AdapterRegistry::with_default_adapters(&SourceSettings::from_env())?;
    run_with(config, &registry, store.as_ref().map(|s| s as &dyn TableStore))
}

/// Execute a run against the given adapters and (optionally) store.
pub fn run_with(
    config: &RunConfig,
    registry: &AdapterRegistry,
    store: Option<&dyn TableStore>,
) -> Result<SyncOutcome, AppError> {
    let catalogue = load_catalogue(&config.catalog_dir)?;
    let purchases = load_purchase_dates(&config.dates_file)?;

    let tasks = plan(&catalogue, &purchases.book);
    info!(
        "Planned {} task(s) for {} product(s)",
        tasks.len(),
        catalogue.product_count()
    );

    let runner = Runner::new(registry, config.workers, config.task_timeout);
    let records = runner.run(&tasks)?;

    let published = match store {
        Some(store) if !config.dry_run => {
            let report = publish(store, &records, config.delete_batch_size)?;
            info!(
                "Publish finished: {} inserted, {} skipped, {} failed",
                report.inserted, report.skipped, report.failed
            );
            Some(report)
        }
        _ => {
            info!("Dry run: destination table left untouched");
            None
        }
    };

    Ok(SyncOutcome { records, published })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::data::SourceAdapter;
    use crate::domain::{NavPoint, NavValue, Series, SourceKind};
    use crate::error::{FetchFailure, StoreError};
    use crate::series::merge;
    use crate::store::TableRow;

    struct FixedAdapter(SourceKind);

    impl SourceAdapter for FixedAdapter {
        fn kind(&self) -> SourceKind {
            self.0
        }

        fn fetch(&self, product_id: &str) -> Result<Series, FetchFailure> {
            if product_id == "DOWN" {
                return Err(FetchFailure::Transport("connection refused".to_string()));
            }
            let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
            Ok(merge([vec![
                NavPoint::new(d(1, 1), dec!(1.0)),
                NavPoint::new(d(1, 15), dec!(1.02)),
                NavPoint::new(d(2, 5), dec!(1.05)),
            ]]))
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        fail_delete: bool,
        inserted: RefCell<Vec<TableRow>>,
    }

    impl TableStore for RecordingStore {
        fn authenticate(&self) -> Result<(), StoreError> {
            Ok(())
        }

        fn list_record_ids(&self) -> Result<Vec<String>, StoreError> {
            Ok(vec!["rec_old".to_string()])
        }

        fn delete_records(&self, _ids: &[String]) -> Result<(), StoreError> {
            if self.fail_delete {
                return Err(StoreError::Write("code 1254291: write conflict".to_string()));
            }
            Ok(())
        }

        fn insert_record(&self, row: &TableRow) -> Result<(), StoreError> {
            self.inserted.borrow_mut().push(row.clone());
            Ok(())
        }
    }

    fn workspace() -> (tempfile::TempDir, RunConfig) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bocom.txt"), "5811221077\nDOWN\n").unwrap();
        fs::write(dir.path().join("citic.txt"), "AF245337\n").unwrap();
        fs::write(
            dir.path().join("dates.txt"),
            "5811221077 2024-01-10\n5811221077 2024-01-10 2024-02-01\n",
        )
        .unwrap();

        let config = RunConfig {
            catalog_dir: dir.path().to_path_buf(),
            dates_file: dir.path().join("dates.txt"),
            workers: 2,
            task_timeout: Duration::from_secs(5),
            delete_batch_size: 100,
            dry_run: false,
        };
        (dir, config)
    }

    fn registry() -> AdapterRegistry {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(FixedAdapter(SourceKind::Bocom)));
        registry.register(Arc::new(FixedAdapter(SourceKind::Citic)));
        registry
    }

    #[test]
    fn full_run_publishes_good_records() {
        let (_dir, config) = workspace();
        let store = RecordingStore::default();

        let outcome = run_with(&config, &registry(), Some(&store)).unwrap();

        // Two purchase events, one failing product, one CITIC product, and the
        // default BOC product with no adapter registered.
        assert_eq!(outcome.records.len(), 5);
        assert_eq!(outcome.records[0].purchase_nav, Some(dec!(1.02)));
        assert_eq!(outcome.records[1].redeem_nav, Some(dec!(1.05)));
        assert_eq!(outcome.records[2].latest_nav, NavValue::Error);

        let report = outcome.published.unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.inserted, 3);
        assert_eq!(report.skipped, 2);
        assert_eq!(store.inserted.borrow().len(), 3);
    }

    #[test]
    fn dry_run_skips_publishing() {
        let (_dir, mut config) = workspace();
        config.dry_run = true;
        let store = RecordingStore::default();

        let outcome = run_with(&config, &registry(), Some(&store)).unwrap();

        assert!(outcome.published.is_none());
        assert!(store.inserted.borrow().is_empty());
    }

    #[test]
    fn delete_failure_is_a_publish_error() {
        let (_dir, config) = workspace();
        let store = RecordingStore {
            fail_delete: true,
            ..RecordingStore::default()
        };

        let err = run_with(&config, &registry(), Some(&store)).unwrap_err();

        assert_eq!(err.exit_code(), 3);
        assert!(store.inserted.borrow().is_empty());
    }
}
