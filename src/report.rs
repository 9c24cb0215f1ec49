use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::ingest::{self, LogIngest};
use crate::probe::Prober;
use crate::provider::{DhcpProvider, DEFAULT_LOG_DIRECTORY};
use crate::{ActivityResult, LogRecord, Reservation, ReportOptions, ScanStats, Scope};

/// Strip delimiter characters from a hardware address, leaving bare
/// uppercase hex comparable across the server's and the log's conventions.
pub fn normalize_hw_address(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '-' | ':' | '.') && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Last record in ingestion order whose hardware address matches `key`.
///
/// Ingestion order is oldest file first with in-file append order kept, so
/// the last match is the most recent activity even when individual date
/// fields are unparseable.
pub fn last_match<'a>(records: &'a [LogRecord], key: &str) -> Option<&'a LogRecord> {
    records.iter().rev().find(|record| {
        record
            .mac_address
            .as_deref()
            .is_some_and(|mac| normalize_hw_address(mac) == key)
    })
}

/// Enumerate every scope's reservations from the provider.
///
/// Enumeration failures are fatal: without the reservation list there is
/// nothing to report on.
pub fn enumerate_reservations(
    provider: &dyn DhcpProvider,
) -> Result<Vec<(Scope, Vec<Reservation>)>> {
    let scopes = provider
        .list_scopes()
        .context("Failed to enumerate DHCP scopes")?;

    let mut enumerated = Vec::with_capacity(scopes.len());
    for scope in scopes {
        let reservations = provider
            .list_reservations(&scope.id)
            .with_context(|| format!("Failed to enumerate reservations for scope {}", scope.id))?;
        enumerated.push((scope, reservations));
    }

    Ok(enumerated)
}

/// Resolve the audit log directory: explicit override, then the server's
/// configured path, then the stock install location.
pub fn resolve_log_directory(provider: &dyn DhcpProvider, override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    provider
        .audit_log_directory()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIRECTORY))
}

/// Build one ActivityResult per reservation across all scopes.
///
/// The reservation total is known up front from the enumeration, so every
/// result carries its `ordinal/total` progress counter.
pub fn build_report(
    server: &str,
    enumerated: &[(Scope, Vec<Reservation>)],
    logs: &LogIngest,
    prober: &dyn Prober,
    options: &ReportOptions,
) -> Vec<ActivityResult> {
    let total: usize = enumerated
        .iter()
        .map(|(_, reservations)| reservations.len())
        .sum();

    // Warn once, not per reservation, when the log schema is unusable
    let correlate = logs.mac_field_present;
    if !correlate && !logs.records.is_empty() {
        eprintln!(
            "Warning: audit logs expose no hardware address column; \
             reporting no activity for all reservations"
        );
    }

    let mut results = Vec::with_capacity(total);
    for (scope, reservations) in enumerated {
        for reservation in reservations {
            let key = normalize_hw_address(&reservation.client_id);
            let record = if correlate {
                last_match(&logs.records, &key).cloned()
            } else {
                None
            };

            let result = ActivityResult {
                ordinal: results.len() + 1,
                total,
                client_name: reservation.name.clone(),
                ip_address: reservation.ip_address.clone(),
                scope_id: scope.id.clone(),
                server: server.to_string(),
                mac_address: reservation.client_id.clone(),
                state: reservation.state.clone(),
                last_record: record,
                online: prober.is_online(&reservation.ip_address),
            };

            if options.verbose {
                eprintln!(
                    "  [{}/{}] {} ({}) last activity: {}, online: {}",
                    result.ordinal,
                    result.total,
                    result.ip_address,
                    result.mac_address,
                    result.last_activity(),
                    if result.online { "yes" } else { "no" }
                );
            }

            results.push(result);
        }
    }

    results
}

/// Full pipeline: enumerate, ingest, correlate, probe.
pub fn run_report(
    provider: &dyn DhcpProvider,
    prober: &dyn Prober,
    server: &str,
    log_dir: Option<&Path>,
    options: &ReportOptions,
) -> Result<Vec<ActivityResult>> {
    let enumerated = enumerate_reservations(provider)?;

    let log_dir = resolve_log_directory(provider, log_dir);
    if options.verbose {
        eprintln!("Reading audit logs from {}", log_dir.display());
    }

    let logs = ingest::ingest(&log_dir);
    if options.verbose {
        eprintln!(
            "Parsed {} records from {} log files ({} skipped)",
            logs.records.len(),
            logs.files_read,
            logs.files_skipped
        );
    }

    Ok(build_report(server, &enumerated, &logs, prober, options))
}

/// Read-only counts for the scan subcommand.
pub fn scan_stats(provider: &dyn DhcpProvider, log_dir: Option<&Path>) -> Result<ScanStats> {
    let enumerated = enumerate_reservations(provider)?;
    let logs = ingest::ingest(&resolve_log_directory(provider, log_dir));

    Ok(ScanStats {
        scopes_found: enumerated.len(),
        reservations_found: enumerated.iter().map(|(_, r)| r.len()).sum(),
        log_files_read: logs.files_read,
        log_files_skipped: logs.files_skipped,
        log_records_parsed: logs.records.len(),
    })
}
