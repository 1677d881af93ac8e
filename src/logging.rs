//! Logging utilities for the regridder.
//!
//! Each stage of a run (load, build operator, apply, save) is logged as a
//! structured start/end pair so progress and timings can be followed on the
//! console or filtered with `RUST_LOG`.

use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Initialize the tracing subscriber with the given log level
pub fn init_tracing(log_level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(val) => val,
        Err(_) => log_level.to_string(),
    };

    // A subscriber may already be installed (tests, embedding applications)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Log a start message for a significant operation
pub fn log_operation_start(operation: &str, details: Option<&str>) {
    if let Some(details) = details {
        info!(
            operation = operation,
            details = details,
            "Starting operation"
        );
    } else {
        info!(operation = operation, "Starting operation");
    }
}

/// Log the completion of a significant operation
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration = start_time.elapsed();
    let duration_ms = duration.as_secs_f64() * 1000.0;

    if success {
        info!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed successfully"
        );
    } else {
        warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation failed"
        );
    }
}

/// Run a fallible stage between a start and an end record
pub fn log_timed_operation<F, T, E>(operation: &str, details: Option<&str>, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let start = Instant::now();
    let operation_id = generate_operation_id();

    log_operation_start(operation, details);
    debug!(operation = operation, operation_id = %operation_id, "Stage started");

    let result = f();
    log_operation_end(operation, start, result.is_ok());

    result
}

/// Log detailed information about the data loaded
pub fn log_data_load_stats(
    file_path: &str,
    var_count: usize,
    var_names: &[&str],
    dim_count: usize,
    dim_details: &str,
    memory_usage: usize,
    lazy: bool,
) {
    info!(
        operation = "data_load",
        file_path = file_path,
        var_count = var_count,
        vars = %var_names.join(", "),
        dim_count = dim_count,
        dims = dim_details,
        memory_mb = memory_usage / (1024 * 1024),
        lazy = lazy,
        "Data loaded successfully"
    );
}

/// Log an error with context
pub fn log_error(error: &crate::error::RegridError, context: &str) {
    error!(
        error = %error,
        context = context,
        "Error occurred"
    );
}

/// Generate a unique operation ID
pub fn generate_operation_id() -> String {
    Uuid::new_v4().to_string()
}
