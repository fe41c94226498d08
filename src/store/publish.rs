//! Full-replace publishing.
//!
//! Order matters: authenticate, delete every existing row, then insert. If
//! anything before the first insert fails the table is left as it was (or
//! partially emptied) and nothing new is written.

use log::{info, warn};

use crate::domain::Record;
use crate::error::StoreError;
use crate::store::{TableRow, TableStore};

/// Rows per batch delete request.
pub const DEFAULT_DELETE_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub deleted: usize,
    pub inserted: usize,
    /// Records not published because they carry a sentinel.
    pub skipped: usize,
    /// Rows the store rejected.
    pub failed: usize,
}

/// Replace the table's contents with `records`.
///
/// Auth, list and delete failures abort before any insert. Individual insert
/// failures are logged and counted.
pub fn publish<S>(store: &S, records: &[Record], delete_batch_size: usize) -> Result<PublishReport, StoreError>
where
    S: TableStore + ?Sized,
{
    let mut report = PublishReport::default();

    store.authenticate()?;

    let ids = store.list_record_ids()?;
    if ids.is_empty() {
        info!("Destination table is already empty");
    }
    for (batch_no, batch) in ids.chunks(delete_batch_size.max(1)).enumerate() {
        store.delete_records(batch).map_err(|e| {
            warn!("Delete batch {} failed: {e}", batch_no + 1);
            e
        })?;
        report.deleted += batch.len();
    }
    if report.deleted > 0 {
        info!("Cleared {} existing row(s)", report.deleted);
    }

    for record in records {
        let Some(row) = TableRow::from_record(record) else {
            warn!(
                "Skipping {} {}: latest NAV is {}",
                record.source, record.product_id, record.latest_nav
            );
            report.skipped += 1;
            continue;
        };
        match store.insert_record(&row) {
            Ok(()) => {
                info!("Wrote {}", row.product_code);
                report.inserted += 1;
            }
            Err(e) => {
                warn!("Failed to write {}: {e}", row.product_code);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
