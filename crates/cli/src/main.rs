mod commands;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use ifta_tracker::{TrackerConfig, TrackerError};
use rust_decimal::Decimal;
use serde::Serialize;
use time::macros::format_description;
use time::Date;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// IFTA mileage apportionment and odometer reconciliation.
#[derive(Parser)]
#[command(
    name = "ifta",
    version,
    about = "IFTA mileage apportionment and odometer reconciliation"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to ifta.toml (default: ./ifta.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apportion a saved routing provider response by jurisdiction
    Apportion {
        /// Path to the provider response JSON
        response: PathBuf,
    },

    /// Check an odometer delta against routed miles
    Reconcile {
        /// Starting odometer reading
        #[arg(long)]
        start: Decimal,
        /// Ending odometer reading
        #[arg(long)]
        end: Decimal,
        /// Routed distance for the leg, in miles
        #[arg(long = "route-miles")]
        route_miles: Decimal,
    },

    /// Build the IFTA worksheet from the configured data directory
    Report {
        /// First day of the period (YYYY-MM-DD, inclusive)
        #[arg(long, value_parser = parse_date)]
        from: Date,
        /// Day after the period (YYYY-MM-DD, exclusive)
        #[arg(long, value_parser = parse_date)]
        to: Date,
        /// Restrict to one truck
        #[arg(long)]
        truck: Option<String>,
    },

    /// List legs waiting for odometer review
    Reviews {
        /// Include resolved items
        #[arg(long)]
        all: bool,
    },

    /// Start the HTTP JSON API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = match TrackerConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_failure(&e, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Apportion { response } => {
            commands::apportion::cmd_apportion(&response, &config, cli.output, cli.quiet);
        }
        Commands::Reconcile {
            start,
            end,
            route_miles,
        } => {
            commands::reconcile::cmd_reconcile(
                start,
                end,
                route_miles,
                &config,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Report { from, to, truck } => {
            commands::report::cmd_report(from, to, truck, &config, cli.output, cli.quiet);
        }
        Commands::Reviews { all } => {
            commands::reviews::cmd_reviews(all, &config, cli.output, cli.quiet);
        }
        Commands::Serve { port } => {
            let rt = runtime(cli.output, cli.quiet);
            if let Err(e) = rt.block_on(serve::start_server(port, config)) {
                report_error(&format!("server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub(crate) fn parse_date(s: &str) -> Result<Date, String> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("expected YYYY-MM-DD, got '{}': {}", s, e))
}

pub(crate) fn runtime(output: OutputFormat, quiet: bool) -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("failed to create tokio runtime: {}", e),
                output,
                quiet,
            );
            process::exit(1);
        }
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("serialization error: {}", e);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}

/// Like [`report_error`], carrying the error's machine code.
pub(crate) fn report_failure(err: &TrackerError, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error [{}]: {}", err.code(), err),
        OutputFormat::Json => eprintln!(
            "{}",
            serde_json::json!({ "error": err.to_string(), "code": err.code() })
        ),
    }
}
