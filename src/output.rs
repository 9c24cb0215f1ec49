use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use crate::ActivityResult;

#[derive(Debug, Clone, Default, clap::ValueEnum)]
pub enum Format {
    /// Fixed-width text table (default)
    #[default]
    Table,
    /// CSV with a header row
    Csv,
    /// Pretty-printed JSON array
    Json,
}

/// Display projection of an [`ActivityResult`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub progress: String,
    pub client_name: String,
    pub ip_address: String,
    pub scope: String,
    pub server: String,
    pub mac_address: String,
    pub lease_state: String,
    pub online: bool,
    pub last_activity: String,
}

/// Project results into the display shape, deriving last-activity text.
pub fn project(results: &[ActivityResult]) -> Vec<ReportRow> {
    results
        .iter()
        .map(|result| ReportRow {
            progress: format!("{}/{}", result.ordinal, result.total),
            client_name: result.client_name.clone(),
            ip_address: result.ip_address.clone(),
            scope: result.scope_id.clone(),
            server: result.server.clone(),
            mac_address: result.mac_address.clone(),
            lease_state: result.state.to_string(),
            online: result.online,
            last_activity: result.last_activity().to_string(),
        })
        .collect()
}

/// Render the report rows in the requested format.
pub fn write_report<W: Write>(rows: &[ReportRow], format: &Format, writer: W) -> Result<()> {
    match format {
        Format::Table => write_table(rows, writer),
        Format::Csv => write_csv(rows, writer),
        Format::Json => write_json(rows, writer),
    }
}

const HEADERS: [&str; 9] = [
    "#",
    "Name",
    "IP address",
    "Scope",
    "Server",
    "MAC address",
    "State",
    "Online",
    "Last activity",
];

fn cells(row: &ReportRow) -> [&str; 9] {
    [
        &row.progress,
        &row.client_name,
        &row.ip_address,
        &row.scope,
        &row.server,
        &row.mac_address,
        &row.lease_state,
        if row.online { "yes" } else { "no" },
        &row.last_activity,
    ]
}

fn write_table<W: Write>(rows: &[ReportRow], mut writer: W) -> Result<()> {
    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(cells(row)) {
            *width = (*width).max(cell.len());
        }
    }

    write_padded(&mut writer, &HEADERS, &widths)?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let rule: Vec<&str> = rule.iter().map(String::as_str).collect();
    write_padded(&mut writer, &rule, &widths)?;
    for row in rows {
        write_padded(&mut writer, &cells(row), &widths)?;
    }

    Ok(())
}

fn write_padded<W: Write>(writer: &mut W, cells: &[&str], widths: &[usize]) -> Result<()> {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths.iter().copied()).enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(&format!("{cell:<width$}"));
    }
    writeln!(writer, "{}", line.trim_end())?;
    Ok(())
}

fn write_csv<W: Write>(rows: &[ReportRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record([
        "progress",
        "client_name",
        "ip_address",
        "scope",
        "server",
        "mac_address",
        "lease_state",
        "online",
        "last_activity",
    ])?;

    for row in rows {
        wtr.write_record(cells(row))?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_json<W: Write>(rows: &[ReportRow], mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LeaseState, LogRecord};

    fn sample_results() -> Vec<ActivityResult> {
        vec![
            ActivityResult {
                ordinal: 1,
                total: 2,
                client_name: "printer".to_string(),
                ip_address: "192.168.1.50".to_string(),
                scope_id: "192.168.1.0".to_string(),
                server: "dhcp01".to_string(),
                mac_address: "00-17-3F-8E-9C-3A".to_string(),
                state: LeaseState::ActiveReservation,
                last_record: Some(LogRecord {
                    date: Some("03/15/24".to_string()),
                    ..Default::default()
                }),
                online: true,
            },
            ActivityResult {
                ordinal: 2,
                total: 2,
                client_name: "scanner".to_string(),
                ip_address: "192.168.1.51".to_string(),
                scope_id: "192.168.1.0".to_string(),
                server: "dhcp01".to_string(),
                mac_address: "00-17-3F-8E-9C-3B".to_string(),
                state: LeaseState::InactiveReservation,
                last_record: None,
                online: false,
            },
        ]
    }

    #[test]
    fn test_projection_carries_sentinels() {
        let rows = project(&sample_results());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].progress, "1/2");
        assert_eq!(rows[0].last_activity, "2024-03-15");
        assert_eq!(rows[1].progress, "2/2");
        assert_eq!(rows[1].last_activity, "no activity found");
    }

    #[test]
    fn test_table_output() {
        let rows = project(&sample_results());
        let mut buffer = Vec::new();
        write_report(&rows, &Format::Table, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("#"));
        assert!(lines[0].contains("Last activity"));
        assert!(lines[1].starts_with("-"));
        assert!(lines[2].contains("printer"));
        assert!(lines[3].contains("no activity found"));
    }

    #[test]
    fn test_csv_output() {
        let rows = project(&sample_results());
        let mut buffer = Vec::new();
        write_report(&rows, &Format::Csv, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "progress,client_name,ip_address,scope,server,mac_address,lease_state,online,last_activity"
        );
        assert!(lines[1].contains("1/2"));
        assert!(lines[1].ends_with("yes,2024-03-15"));
        assert!(lines[2].contains("no activity found"));
    }

    #[test]
    fn test_json_output() {
        let rows = project(&sample_results());
        let mut buffer = Vec::new();
        write_report(&rows, &Format::Json, &mut buffer).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["client_name"], "printer");
        assert_eq!(items[0]["online"], true);
        assert_eq!(items[1]["last_activity"], "no activity found");
    }
}
