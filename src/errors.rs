use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("PowerShell is not available: {0}")]
    PowerShellUnavailable(String),

    #[error("DHCP server query failed ({query}): {detail}")]
    QueryFailed { query: String, detail: String },

    #[error("Unexpected DHCP server response ({query}): {detail}")]
    MalformedResponse { query: String, detail: String },
}
