//! `ifta report` -- state-by-state worksheet from the on-disk store.

use std::process;

use ifta_engine::IftaReport;
use ifta_tracker::{date_scope, ReportBuilder, TrackerConfig};
use time::Date;

use super::open_data_dir;
use crate::{print_json, report_failure, runtime, OutputFormat};

pub(crate) fn cmd_report(
    from: Date,
    to: Date,
    truck: Option<String>,
    config: &TrackerConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let rt = runtime(output, quiet);
    let store = open_data_dir(&rt, config, output, quiet);
    let scope = date_scope(from, to, truck);

    let report = match rt.block_on(ReportBuilder::new(store).get_report(&scope)) {
        Ok(r) => r,
        Err(e) => {
            report_failure(&e, output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => print_text(&report, quiet),
    }
}

fn print_text(report: &IftaReport, quiet: bool) {
    let scope = &report.scope;
    if !quiet {
        println!(
            "IFTA mileage {} to {}{}",
            scope.from.date(),
            scope.to.date(),
            scope
                .truck_identifier
                .as_deref()
                .map(|t| format!(" (truck {})", t))
                .unwrap_or_default()
        );
        println!();
    }

    println!(
        "{:<14} {:>12} {:>12} {:>12}",
        "JURISDICTION", "ROUTE", "DEADHEAD", "TOTAL"
    );
    for row in &report.totals.jurisdictions {
        println!(
            "{:<14} {:>12} {:>12} {:>12}",
            row.jurisdiction_code,
            row.route_miles.to_string(),
            row.deadhead_miles.to_string(),
            row.total_miles.to_string()
        );
    }
    println!(
        "{:<14} {:>12} {:>12} {:>12}",
        "TOTAL",
        report.totals.route_miles.to_string(),
        report.totals.deadhead_miles.to_string(),
        report.totals.total_miles.to_string()
    );

    if !quiet {
        println!();
        println!(
            "{} legs, {} jurisdictions",
            report.legs.len(),
            report.totals.jurisdiction_count
        );
        if !report.flagged_legs.is_empty() {
            println!("flagged for review: {}", report.flagged_legs.join(", "));
        }
        println!("fingerprint: {}", report.fingerprint);
    }
}
