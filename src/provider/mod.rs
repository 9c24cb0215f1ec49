use anyhow::Result;
use std::path::PathBuf;

use crate::{Reservation, Scope};

mod powershell;

pub use powershell::PsDhcpProvider;

/// Stock location of the audit logs when the server does not report one.
pub const DEFAULT_LOG_DIRECTORY: &str = r"C:\Windows\System32\dhcp";

/// Host DHCP management capability.
///
/// Scope and reservation enumeration are required; without them there is
/// nothing to report on, so those failures abort the run. The audit log
/// directory is an optional capability and `None` falls back to
/// [`DEFAULT_LOG_DIRECTORY`].
pub trait DhcpProvider {
    fn list_scopes(&self) -> Result<Vec<Scope>>;

    fn list_reservations(&self, scope_id: &str) -> Result<Vec<Reservation>>;

    fn audit_log_directory(&self) -> Option<PathBuf>;
}
