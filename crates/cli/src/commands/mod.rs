pub(crate) mod apportion;
pub(crate) mod reconcile;
pub(crate) mod report;
pub(crate) mod reviews;

use std::process;
use std::sync::Arc;

use ifta_storage::LegStore;
use ifta_tracker::{TrackerConfig, TrackerError};

use crate::{report_failure, OutputFormat};

/// Open the on-disk store; offline commands have nothing to read without one.
pub(crate) fn open_data_dir(
    rt: &tokio::runtime::Runtime,
    config: &TrackerConfig,
    output: OutputFormat,
    quiet: bool,
) -> Arc<dyn LegStore> {
    if config.storage.data_dir.is_none() {
        let err = TrackerError::Config(
            "storage.data_dir is not set; offline commands need the on-disk leg store".to_string(),
        );
        report_failure(&err, output, quiet);
        process::exit(1);
    }
    match rt.block_on(config.open_store()) {
        Ok(store) => store,
        Err(e) => {
            report_failure(&e, output, quiet);
            process::exit(1);
        }
    }
}
