//! `ifta apportion` -- split a saved provider response by jurisdiction.

use std::path::Path;
use std::process;

use ifta_engine::{apportion_route, RouteApportionment, RouteResponse};
use ifta_tracker::{TrackerConfig, TrackerError};

use crate::{print_json, report_error, report_failure, OutputFormat};

pub(crate) fn cmd_apportion(
    response_path: &Path,
    config: &TrackerConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let raw = match std::fs::read_to_string(response_path) {
        Ok(s) => s,
        Err(e) => {
            report_error(
                &format!("error reading '{}': {}", response_path.display(), e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };

    let result = RouteResponse::from_json(&raw)
        .and_then(|response| apportion_route(&response, &config.policy));
    let apportionment = match result {
        Ok(a) => a,
        Err(e) => {
            log::warn!("apportionment of {} failed: {}", response_path.display(), e);
            report_failure(&TrackerError::from(e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&apportionment),
        OutputFormat::Text => print_text(&apportionment),
    }
}

fn print_text(apportionment: &RouteApportionment) {
    println!("{:<14} {:>10}", "JURISDICTION", "MILES");
    for entry in apportionment.miles_by_jurisdiction.iter() {
        println!("{:<14} {:>10}", entry.jurisdiction, entry.miles.to_string());
    }
    println!("{:<14} {:>10}", "TOTAL", apportionment.total_miles.to_string());
    println!("duration: {}s", apportionment.total_duration_seconds);
}
