use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::LogRecord;

/// Fixed prefix of the server's rotating audit log files
/// (`DhcpSrvLog-Mon.log` through `DhcpSrvLog-Sun.log`).
pub const LOG_FILE_PREFIX: &str = "DhcpSrvLog";

/// Lines of descriptive banner preceding the CSV header in every log file.
pub const HEADER_PREAMBLE_LINES: usize = 32;

/// Everything one pass over the audit log directory produced.
#[derive(Debug, Default)]
pub struct LogIngest {
    /// Parsed rows, oldest file first, in-file append order kept.
    pub records: Vec<LogRecord>,
    /// True when at least one file's header row exposed the hardware
    /// address column. The correlator warns once when it is missing.
    pub mac_field_present: bool,
    pub files_read: usize,
    pub files_skipped: usize,
}

/// Read every rotating audit log in `dir` into one record sequence.
///
/// A file that cannot be read or parsed is skipped with a warning, and an
/// unreadable directory degrades to an empty ingest; the report still gets
/// one row per reservation either way.
pub fn ingest(dir: &Path) -> LogIngest {
    let mut ingest = LogIngest::default();

    let files = match discover_log_files(dir) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Warning: skipping audit logs: {e:#}");
            return ingest;
        }
    };

    for path in files {
        match parse_log_file(&path) {
            Ok(parsed) => {
                ingest.files_read += 1;
                ingest.mac_field_present |= parsed.mac_field_present;
                ingest.records.extend(parsed.records);
            }
            Err(e) => {
                ingest.files_skipped += 1;
                eprintln!("Warning: skipping {}: {e:#}", path.display());
            }
        }
    }

    ingest
}

/// List the non-empty rotating log files in `dir`, last-modified ascending.
pub fn discover_log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to list log directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to list log directory: {}", dir.display()))?;

        let name = entry.file_name();
        if !is_rotating_log_name(&name.to_string_lossy()) {
            continue;
        }

        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to stat log file: {}", entry.path().display()))?;
        // Zero-byte files are not even opened
        if !metadata.is_file() || metadata.len() == 0 {
            continue;
        }

        let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((mtime, entry.path()));
    }

    // Ties on mtime fall back to the name so ordering stays deterministic
    files.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn is_rotating_log_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with(&LOG_FILE_PREFIX.to_ascii_lowercase()) && lower.ends_with(".log")
}

#[derive(Debug, Default)]
struct ParsedFile {
    records: Vec<LogRecord>,
    mac_field_present: bool,
}

fn parse_log_file(path: &Path) -> Result<ParsedFile> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read log file: {}", path.display()))?;
    // The server writes the system ANSI code page; the fields this report
    // cares about are plain ASCII, so decode lossily
    let text = String::from_utf8_lossy(&bytes);
    parse_log_text(&text)
}

/// Discard the banner, treat the next line as the CSV field-name header,
/// and parse the remainder as data rows.
fn parse_log_text(text: &str) -> Result<ParsedFile> {
    let mut lines = text.lines();
    for _ in 0..HEADER_PREAMBLE_LINES {
        if lines.next().is_none() {
            return Ok(ParsedFile::default());
        }
    }

    let remainder = lines.collect::<Vec<_>>().join("\n");
    if remainder.trim().is_empty() {
        return Ok(ParsedFile::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(remainder.as_bytes());

    let columns = Columns::from_headers(reader.headers().context("Failed to read header row")?);

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.context("Malformed data row")?;
        records.push(columns.record(&row));
    }

    Ok(ParsedFile {
        records,
        mac_field_present: columns.mac_address.is_some(),
    })
}

/// Column positions resolved from a file's header row. Files whose schema
/// lacks a column simply produce `None` for that field on every record.
struct Columns {
    event_id: Option<usize>,
    date: Option<usize>,
    time: Option<usize>,
    description: Option<usize>,
    ip_address: Option<usize>,
    host_name: Option<usize>,
    mac_address: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |wanted: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(wanted));

        Self {
            event_id: find("ID"),
            date: find("Date"),
            time: find("Time"),
            description: find("Description"),
            ip_address: find("IP Address"),
            host_name: find("Host Name"),
            mac_address: find("MAC Address"),
        }
    }

    fn record(&self, row: &csv::StringRecord) -> LogRecord {
        let field = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        LogRecord {
            event_id: field(self.event_id),
            date: field(self.date),
            time: field(self.time),
            description: field(self.description),
            ip_address: field(self.ip_address),
            host_name: field(self.host_name),
            mac_address: field(self.mac_address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANNER_LINE: &str = "\tMicrosoft DHCP Service Activity Log";

    fn log_text(header: &str, rows: &[&str]) -> String {
        let mut text = String::new();
        for _ in 0..HEADER_PREAMBLE_LINES {
            text.push_str(BANNER_LINE);
            text.push('\n');
        }
        text.push_str(header);
        text.push('\n');
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_parse_full_rows() {
        let text = log_text(
            "ID,Date,Time,Description,IP Address,Host Name,MAC Address",
            &[
                "10,03/15/24,09:30:12,Assign,192.168.1.10,host-a.example.lan,00173F8E9C3A",
                "11,03/15/24,10:02:44,Renew,192.168.1.11,host-b.example.lan,00173F8E9C3B",
            ],
        );

        let parsed = parse_log_text(&text).unwrap();
        assert!(parsed.mac_field_present);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].event_id.as_deref(), Some("10"));
        assert_eq!(parsed.records[0].date.as_deref(), Some("03/15/24"));
        assert_eq!(parsed.records[1].mac_address.as_deref(), Some("00173F8E9C3B"));
    }

    #[test]
    fn test_short_file_yields_no_records() {
        let mut text = String::new();
        for _ in 0..HEADER_PREAMBLE_LINES {
            text.push_str(BANNER_LINE);
            text.push('\n');
        }

        let parsed = parse_log_text(&text).unwrap();
        assert!(parsed.records.is_empty());
        assert!(!parsed.mac_field_present);

        let parsed = parse_log_text("just one line\n").unwrap();
        assert!(parsed.records.is_empty());
    }

    #[test]
    fn test_header_only_yields_no_records() {
        let text = log_text("ID,Date,Time,Description,IP Address,Host Name,MAC Address", &[]);
        let parsed = parse_log_text(&text).unwrap();
        assert!(parsed.records.is_empty());
        assert!(parsed.mac_field_present);
    }

    #[test]
    fn test_missing_mac_column() {
        let text = log_text(
            "ID,Date,Time,Description,IP Address,Host Name",
            &["10,03/15/24,09:30:12,Assign,192.168.1.10,host-a"],
        );

        let parsed = parse_log_text(&text).unwrap();
        assert!(!parsed.mac_field_present);
        assert_eq!(parsed.records.len(), 1);
        assert!(parsed.records[0].mac_address.is_none());
    }

    #[test]
    fn test_short_row_fields_become_none() {
        let text = log_text(
            "ID,Date,Time,Description,IP Address,Host Name,MAC Address",
            &["10,03/15/24"],
        );

        let parsed = parse_log_text(&text).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].event_id.as_deref(), Some("10"));
        assert!(parsed.records[0].description.is_none());
        assert!(parsed.records[0].mac_address.is_none());
    }

    #[test]
    fn test_rotating_log_names() {
        assert!(is_rotating_log_name("DhcpSrvLog-Mon.log"));
        assert!(is_rotating_log_name("dhcpsrvlog-sat.LOG"));
        assert!(!is_rotating_log_name("DhcpV6SrvLog-Mon.txt"));
        assert!(!is_rotating_log_name("system.log"));
        assert!(!is_rotating_log_name("DhcpSrvLog-Mon.bak"));
    }
}
