//! `ifta reconcile` -- odometer delta vs. routed miles.

use std::process;

use ifta_engine::{reconcile, ApportionError, Reconciliation, Verdict};
use ifta_tracker::{TrackerConfig, TrackerError};
use rust_decimal::Decimal;

use crate::{print_json, report_failure, OutputFormat};

/// Prints the verdict. A non-`MATCH` verdict is still a successful check;
/// only unusable input exits non-zero.
pub(crate) fn cmd_reconcile(
    start: Decimal,
    end: Decimal,
    route_miles: Decimal,
    config: &TrackerConfig,
    output: OutputFormat,
    quiet: bool,
) {
    if route_miles < Decimal::ZERO {
        let err = TrackerError::InvalidRequest("route miles must not be negative".to_string());
        report_failure(&err, output, quiet);
        process::exit(1);
    }

    let tolerance = config.policy.reconciliation_tolerance;
    let result = match reconcile(start, end, route_miles, tolerance) {
        Ok(r) => r,
        Err(ApportionError::InvalidOdometer { .. }) => Reconciliation {
            verdict: Verdict::InvalidOdometer,
            odometer_delta: None,
            variance: None,
        },
        Err(e) => {
            report_failure(&TrackerError::from(e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => {
            println!("verdict: {}", result.verdict.as_str());
            if let Some(delta) = result.odometer_delta {
                println!("odometer delta: {}", delta);
            }
            match result.variance {
                Some(v) => println!("variance: {} (tolerance {})", v, tolerance),
                None => println!("variance: n/a"),
            }
        }
    }
}
