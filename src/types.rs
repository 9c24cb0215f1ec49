use chrono::NaiveDate;
use std::fmt;

/// A DHCP address pool as enumerated from the server.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: String,
    pub name: String,
}

/// A configured address reservation within a scope.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub name: String,
    pub ip_address: String,
    pub scope_id: String,
    pub client_id: String,
    pub state: LeaseState,
}

/// The server's address state for a reservation's current binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseState {
    Active,
    ActiveReservation,
    Inactive,
    InactiveReservation,
    Declined,
    Expired,
    Other(String),
}

impl From<&str> for LeaseState {
    // Unknown server-side values must not abort enumeration
    fn from(s: &str) -> Self {
        match s {
            "Active" => LeaseState::Active,
            "ActiveReservation" => LeaseState::ActiveReservation,
            "Inactive" => LeaseState::Inactive,
            "InactiveReservation" => LeaseState::InactiveReservation,
            "Declined" => LeaseState::Declined,
            "Expired" => LeaseState::Expired,
            other => LeaseState::Other(other.to_string()),
        }
    }
}

impl std::str::FromStr for LeaseState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LeaseState::from(s))
    }
}

impl fmt::Display for LeaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LeaseState::Active => "Active",
            LeaseState::ActiveReservation => "ActiveReservation",
            LeaseState::Inactive => "Inactive",
            LeaseState::InactiveReservation => "InactiveReservation",
            LeaseState::Declined => "Declined",
            LeaseState::Expired => "Expired",
            LeaseState::Other(other) => other,
        };
        write!(f, "{text}")
    }
}

/// One parsed line from a rotating audit log file.
///
/// Every field is optional: a column missing from the file's schema or an
/// empty cell becomes `None` rather than a lookup failure later on.
#[derive(Debug, Clone, Default)]
pub struct LogRecord {
    pub event_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub host_name: Option<String>,
    pub mac_address: Option<String>,
}

/// Outcome of deriving a last-activity date from a reservation's matched
/// log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastActivity {
    On(NaiveDate),
    /// A record matched but its date field was absent or unparseable
    NoDate,
    /// No log record matched the reservation's hardware address
    NoActivity,
}

impl fmt::Display for LastActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastActivity::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            LastActivity::NoDate => write!(f, "no date found"),
            LastActivity::NoActivity => write!(f, "no activity found"),
        }
    }
}

/// One report row per reservation.
#[derive(Debug, Clone)]
pub struct ActivityResult {
    pub ordinal: usize,
    pub total: usize,
    pub client_name: String,
    pub ip_address: String,
    pub scope_id: String,
    pub server: String,
    pub mac_address: String,
    pub state: LeaseState,
    pub last_record: Option<LogRecord>,
    pub online: bool,
}

impl ActivityResult {
    /// Derive the last-activity date from the matched log record.
    pub fn last_activity(&self) -> LastActivity {
        match &self.last_record {
            None => LastActivity::NoActivity,
            Some(record) => match record.date.as_deref().and_then(parse_log_date) {
                Some(date) => LastActivity::On(date),
                None => LastActivity::NoDate,
            },
        }
    }
}

/// Audit logs write dates as MM/DD/YY; some builds write a four digit year.
fn parse_log_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%m/%d/%y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub verbose: bool,
}

/// Read-only counts reported by the scan subcommand.
#[derive(Debug, Default)]
pub struct ScanStats {
    pub scopes_found: usize,
    pub reservations_found: usize,
    pub log_files_read: usize,
    pub log_files_skipped: usize,
    pub log_records_parsed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_record(record: Option<LogRecord>) -> ActivityResult {
        ActivityResult {
            ordinal: 1,
            total: 1,
            client_name: "host-a".to_string(),
            ip_address: "192.168.1.10".to_string(),
            scope_id: "192.168.1.0".to_string(),
            server: "dhcp01".to_string(),
            mac_address: "00-11-22-33-44-55".to_string(),
            state: LeaseState::ActiveReservation,
            last_record: record,
            online: false,
        }
    }

    #[test]
    fn test_last_activity_no_record() {
        let result = result_with_record(None);
        assert_eq!(result.last_activity(), LastActivity::NoActivity);
        assert_eq!(result.last_activity().to_string(), "no activity found");
    }

    #[test]
    fn test_last_activity_missing_date() {
        let result = result_with_record(Some(LogRecord::default()));
        assert_eq!(result.last_activity(), LastActivity::NoDate);
        assert_eq!(result.last_activity().to_string(), "no date found");
    }

    #[test]
    fn test_last_activity_unparseable_date() {
        let record = LogRecord {
            date: Some("not-a-date".to_string()),
            ..Default::default()
        };
        let result = result_with_record(Some(record));
        assert_eq!(result.last_activity(), LastActivity::NoDate);
    }

    #[test]
    fn test_last_activity_two_and_four_digit_years() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        let record = LogRecord {
            date: Some("03/15/24".to_string()),
            ..Default::default()
        };
        let result = result_with_record(Some(record));
        assert_eq!(result.last_activity(), LastActivity::On(expected));
        assert_eq!(result.last_activity().to_string(), "2024-03-15");

        let record = LogRecord {
            date: Some("03/15/2024".to_string()),
            ..Default::default()
        };
        let result = result_with_record(Some(record));
        assert_eq!(result.last_activity(), LastActivity::On(expected));
    }

    #[test]
    fn test_lease_state_round_trip() {
        let state: LeaseState = "InactiveReservation".parse().unwrap();
        assert_eq!(state, LeaseState::InactiveReservation);
        assert_eq!(state.to_string(), "InactiveReservation");

        let state: LeaseState = "SomethingNew".parse().unwrap();
        assert_eq!(state, LeaseState::Other("SomethingNew".to_string()));
        assert_eq!(state.to_string(), "SomethingNew");
    }
}
