use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::Command;
use std::str::FromStr;

use crate::{LeaseState, Reservation, ReportError, Scope};

use super::DhcpProvider;

const SCOPES_QUERY: &str = "Get-DhcpServerv4Scope | Select-Object \
     @{n='ScopeId';e={$_.ScopeId.IPAddressToString}},Name | ConvertTo-Json";

const AUDIT_LOG_QUERY: &str = "Get-DhcpServerAuditLog | Select-Object Path | ConvertTo-Json";

/// Enumerates scopes and reservations through the DHCP server cmdlets,
/// projected to flat JSON with `Select-Object` calculated properties.
pub struct PsDhcpProvider {
    shell: String,
}

impl PsDhcpProvider {
    pub fn new() -> Self {
        Self {
            shell: "powershell".to_string(),
        }
    }

    /// Use a different shell executable, e.g. `pwsh`.
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    fn run(&self, query: &str, script: &str) -> Result<String> {
        let output = Command::new(&self.shell)
            .args(["-NoProfile", "-NonInteractive", "-Command", script])
            .output()
            .map_err(|e| ReportError::PowerShellUnavailable(e.to_string()))?;

        if !output.status.success() {
            return Err(ReportError::QueryFailed {
                query: query.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for PsDhcpProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DhcpProvider for PsDhcpProvider {
    fn list_scopes(&self) -> Result<Vec<Scope>> {
        let raw = self.run("scopes", SCOPES_QUERY)?;
        let rows: Vec<ScopeRow> = parse_rows("scopes", &raw)?;

        Ok(rows
            .into_iter()
            .map(|row| Scope {
                id: row.scope_id,
                name: row.name.unwrap_or_default(),
            })
            .collect())
    }

    fn list_reservations(&self, scope_id: &str) -> Result<Vec<Reservation>> {
        // Scope ids are interpolated into the script, so only accept the
        // dotted-quad form the server hands out
        if Ipv4Addr::from_str(scope_id).is_err() {
            return Err(ReportError::MalformedResponse {
                query: "reservations".to_string(),
                detail: format!("invalid scope id: {scope_id}"),
            }
            .into());
        }

        let script = format!(
            "Get-DhcpServerv4Reservation -ScopeId {scope_id} | Select-Object \
             Name,@{{n='IPAddress';e={{$_.IPAddress.IPAddressToString}}}},\
             @{{n='ScopeId';e={{$_.ScopeId.IPAddressToString}}}},ClientId,\
             @{{n='AddressState';e={{\"$($_.AddressState)\"}}}} | ConvertTo-Json"
        );
        let raw = self.run("reservations", &script)?;
        let rows: Vec<ReservationRow> = parse_rows("reservations", &raw)?;

        Ok(rows
            .into_iter()
            .map(|row| Reservation {
                name: row.name.unwrap_or_default(),
                ip_address: row.ip_address,
                scope_id: row.scope_id,
                client_id: row.client_id,
                state: LeaseState::from(row.address_state.as_deref().unwrap_or_default()),
            })
            .collect())
    }

    fn audit_log_directory(&self) -> Option<PathBuf> {
        let raw = self.run("audit log", AUDIT_LOG_QUERY).ok()?;
        let rows: Vec<AuditLogRow> = parse_rows("audit log", &raw).ok()?;
        rows.into_iter().next().map(|row| PathBuf::from(row.path))
    }
}

#[derive(Debug, Deserialize)]
struct ScopeRow {
    #[serde(rename = "ScopeId")]
    scope_id: String,
    #[serde(rename = "Name", default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct ReservationRow {
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "IPAddress")]
    ip_address: String,
    #[serde(rename = "ScopeId")]
    scope_id: String,
    #[serde(rename = "ClientId")]
    client_id: String,
    #[serde(rename = "AddressState", default)]
    address_state: Option<String>,
}

#[derive(Deserialize)]
struct AuditLogRow {
    #[serde(rename = "Path")]
    path: String,
}

/// Parse a cmdlet's JSON output into rows.
///
/// `ConvertTo-Json` collapses a single-element pipeline to a bare object
/// and an empty pipeline to no output at all; both shapes are accepted.
fn parse_rows<T>(query: &str, raw: &str) -> Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
{
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| ReportError::MalformedResponse {
            query: query.to_string(),
            detail: e.to_string(),
        })?;

    let items = match value {
        Value::Array(items) => items,
        single => vec![single],
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|e| {
                ReportError::MalformedResponse {
                    query: query.to_string(),
                    detail: e.to_string(),
                }
                .into()
            })
        })
        .collect()
}
