pub mod cli;
mod errors;
pub mod ingest;
pub mod output;
pub mod probe;
pub mod provider;
mod report;
mod types;

pub use errors::ReportError;
pub use ingest::LogIngest;
pub use report::{
    build_report, enumerate_reservations, last_match, normalize_hw_address, resolve_log_directory,
    run_report, scan_stats,
};
pub use types::{
    ActivityResult, LastActivity, LeaseState, LogRecord, Reservation, ReportOptions, ScanStats,
    Scope,
};
