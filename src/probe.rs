use std::process::{Command, Stdio};

/// Single-attempt reachability check for a reserved address.
pub trait Prober {
    /// True when the address answered one echo request. Probe errors
    /// collapse to false. A response only proves some host answers on that
    /// address, not that it is the reserved client.
    fn is_online(&self, ip: &str) -> bool;
}

/// Probes with one invocation of the system ping utility.
#[derive(Debug, Clone)]
pub struct SystemPing {
    timeout_ms: u64,
}

impl SystemPing {
    pub fn new() -> Self {
        Self { timeout_ms: 1000 }
    }

    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }
}

impl Default for SystemPing {
    fn default() -> Self {
        Self::new()
    }
}

impl Prober for SystemPing {
    fn is_online(&self, ip: &str) -> bool {
        let mut command = Command::new("ping");
        if cfg!(windows) {
            command.args(["-n", "1", "-w", &self.timeout_ms.to_string()]);
        } else {
            // Unix ping takes whole seconds
            let secs = self.timeout_ms.div_ceil(1000).max(1);
            command.args(["-c", "1", "-W", &secs.to_string()]);
        }

        command
            .arg(ip)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}
