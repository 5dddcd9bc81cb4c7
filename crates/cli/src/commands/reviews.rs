//! `ifta reviews` -- odometer review queue.

use std::process;

use ifta_storage::ReviewItem;
use ifta_tracker::{TrackerConfig, TrackerError};

use super::open_data_dir;
use crate::{print_json, report_failure, runtime, OutputFormat};

pub(crate) fn cmd_reviews(all: bool, config: &TrackerConfig, output: OutputFormat, quiet: bool) {
    let rt = runtime(output, quiet);
    let store = open_data_dir(&rt, config, output, quiet);

    let items = match rt.block_on(store.list_reviews(!all)) {
        Ok(items) => items,
        Err(e) => {
            report_failure(&TrackerError::from(e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&items),
        OutputFormat::Text => print_text(&items, quiet),
    }
}

fn print_text(items: &[ReviewItem], quiet: bool) {
    if items.is_empty() {
        if !quiet {
            println!("no review items");
        }
        return;
    }
    for item in items {
        let state = match &item.resolution {
            Some(r) => format!("resolved by {}", r.reviewer),
            None => "open".to_string(),
        };
        println!(
            "{}  leg {}  truck {}  {}  route {} mi  delta {}  variance {}  [{}]",
            item.id,
            item.leg_id,
            item.truck_identifier,
            item.verdict.as_str(),
            item.total_route_miles,
            item.odometer_delta
                .map(|d| d.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
            item.variance
                .map(|v| v.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
            state
        );
    }
}
