//! Formatted terminal output for a sync run.

use std::collections::BTreeMap;

use crate::domain::{NavValue, Record};
use crate::store::PublishReport;

/// Per-record table followed by outcome counts.
pub fn format_run_summary(records: &[Record]) -> String {
    let mut out = String::new();

    out.push_str("=== navsync - NAV sync ===\n");
    out.push_str(&format_table(records));
    out.push('\n');

    let ok = records.iter().filter(|r| r.is_publishable()).count();
    let no_data = records.iter().filter(|r| r.latest_nav == NavValue::NoData).count();
    let mut failures: BTreeMap<&'static str, usize> = BTreeMap::new();
    for kind in records.iter().filter_map(|r| r.failure) {
        *failures.entry(kind.label()).or_default() += 1;
    }

    out.push_str(&format!(
        "Tasks: {} | ok={} | no data={} | errors={}\n",
        records.len(),
        ok,
        no_data,
        failures.values().sum::<usize>()
    ));
    if !failures.is_empty() {
        let parts: Vec<String> = failures.iter().map(|(k, n)| format!("{k}={n}")).collect();
        out.push_str(&format!("Errors by kind: {}\n", parts.join(", ")));
    }

    out
}

/// One line describing what publishing did.
pub fn format_publish_report(report: &PublishReport) -> String {
    format!(
        "Published: deleted={} inserted={} skipped={} failed={}",
        report.deleted, report.inserted, report.skipped, report.failed
    )
}

fn format_table(records: &[Record]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<10} {:<20} {:>10} {:>10} {:<10} {:>10} {:>10} {:<10}",
            "source", "product", "latest", "prior30d", "as_of", "purchase", "redeem", "status"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<10} {:-<20} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10}",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in records {
        let status = match r.failure {
            Some(kind) => kind.label(),
            None if r.is_publishable() => "ok",
            None => "no data",
        };
        out.push_str(
            format!(
                "{:<10} {:<20} {:>10} {:>10} {:<10} {:>10} {:>10} {:<10}",
                r.source.display_name(),
                truncate(&r.product_id, 20),
                r.latest_nav.to_string(),
                r.prior_nav_30d.to_string(),
                r.as_of_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
                fmt_optional(r.purchase_nav),
                fmt_optional(r.redeem_nav),
                status,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_optional(v: Option<rust_decimal::Decimal>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
