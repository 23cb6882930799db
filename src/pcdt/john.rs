//! Bounded-wait boundary around the external cracking tool.
//!
//! The tool is driven as a defined protocol, not ad hoc scripting: `spawn` an
//! incremental-mode run against a hash file, `wait_with_timeout` with forced
//! termination on expiry, then `show` to query recovered results. The child
//! can never block the calling task past its deadline.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::error::Error;

/// Default binary name, overridable via the config store.
pub const DEFAULT_BINARY: &str = "john";

/// Default `--format` specifier matching the lab's keyed digest scheme.
pub const DEFAULT_FORMAT: &str = "HMAC-SHA256";

/// Handle to one incremental-mode cracking run.
pub struct CrackSession {
    child: Child,
}

impl CrackSession {
    /// Wait for the child up to `limit`, force-killing it on expiry.
    ///
    /// Returns `true` if the child exited on its own within the limit.
    pub async fn wait_with_timeout(mut self, limit: Duration) -> bool {
        match tokio::time::timeout(limit, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!("cracking tool exited with {status}");
                true
            }
            Ok(Err(err)) => {
                warn!("failed waiting for cracking tool: {err}");
                false
            }
            Err(_) => {
                debug!("cracking tool hit the {limit:?} deadline, killing it");
                if let Err(err) = self.child.start_kill() {
                    warn!("failed to kill cracking tool: {err}");
                }
                // Reap the killed child so it does not linger as a zombie.
                let _ = self.child.wait().await;
                false
            }
        }
    }
}

/// Launcher for the external tool with a fixed binary and format specifier.
#[derive(Clone, Debug)]
pub struct JohnRunner {
    binary: String,
    format: String,
}

impl JohnRunner {
    #[must_use]
    pub fn new(binary: &str, format: &str) -> Self {
        Self {
            binary: binary.to_string(),
            format: format.to_string(),
        }
    }

    /// Start an incremental-mode run against `hash_file`.
    ///
    /// # Errors
    /// Returns [`Error::ToolUnavailable`] when the binary cannot be started;
    /// the audit engine reports this as a distinguished terminal outcome.
    pub fn spawn_incremental(&self, hash_file: &Path) -> Result<CrackSession, Error> {
        let child = Command::new(&self.binary)
            .arg("--incremental")
            .arg(format!("--format={}", self.format))
            .arg(hash_file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| Error::ToolUnavailable(format!("{}: {err}", self.binary)))?;

        Ok(CrackSession { child })
    }

    /// Query recovered results for `hash_file` via the tool's show interface.
    ///
    /// Output is line-oriented `identifier:plaintext`; lines without a colon
    /// (status summaries, blank lines) are ignored.
    ///
    /// # Errors
    /// Returns [`Error::ToolUnavailable`] when the binary cannot be run.
    pub async fn show(&self, hash_file: &Path) -> Result<Vec<(String, String)>, Error> {
        let output = Command::new(&self.binary)
            .arg("--show")
            .arg(format!("--format={}", self.format))
            .arg(hash_file)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| Error::ToolUnavailable(format!("{}: {err}", self.binary)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_show_output(&stdout))
    }
}

/// Parse colon-delimited `identifier:plaintext` lines.
fn parse_show_output(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| {
            let (identifier, plaintext) = line.split_once(':')?;
            if identifier.is_empty() {
                return None;
            }
            Some((identifier.to_string(), plaintext.to_string()))
        })
        .collect()
}
