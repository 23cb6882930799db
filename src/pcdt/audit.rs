//! Time/guess-bounded offline recovery attempts against stored digests.
//!
//! Three strictly ordered steps per credential, each short-circuiting on a
//! match or an exhausted budget: a fast pass over the shared common-password
//! table, a streamed dictionary pass, and an external-tool fallback when no
//! wordlist resolves. A batch replaces all prior results and isolates
//! per-user failures.

use anyhow::Result;
use sqlx::SqlitePool;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use super::error::Error;
use super::estimator::COMMON_PASSWORDS;
use super::hashing::Hashing;
use super::john::{JohnRunner, DEFAULT_BINARY, DEFAULT_FORMAT};
use super::storage::{self, CredentialRecord};
use super::wordlist::{self, FALLBACK_WORDLISTS};

/// Per-user wall-clock budget unless overridden.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(30);

/// Per-user guess ceiling unless overridden.
pub const DEFAULT_MAX_GUESSES: u64 = 200_000;

/// Environment-level wordlist default, between the config override and the
/// fixed fallback locations.
pub const WORDLIST_ENV: &str = "PCDT_WORDLIST";

pub const CONFIG_WORDLIST: &str = "audit.wordlist";
pub const CONFIG_TIME_BUDGET: &str = "audit.time_budget_secs";
pub const CONFIG_MAX_GUESSES: &str = "audit.max_guesses";
pub const CONFIG_JOHN_BINARY: &str = "audit.john_binary";
pub const CONFIG_JOHN_FORMAT: &str = "audit.john_format";

/// Resolved audit configuration: config-store overrides layered over
/// environment defaults over built-in constants.
#[derive(Clone, Debug)]
pub struct AuditConfig {
    pub time_budget: Duration,
    pub max_guesses: u64,
    pub wordlist_override: Option<PathBuf>,
    pub env_wordlist: Option<PathBuf>,
    pub fallback_wordlists: Vec<PathBuf>,
    pub john_binary: String,
    pub john_format: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            time_budget: DEFAULT_TIME_BUDGET,
            max_guesses: DEFAULT_MAX_GUESSES,
            wordlist_override: None,
            env_wordlist: None,
            fallback_wordlists: FALLBACK_WORDLISTS.iter().map(PathBuf::from).collect(),
            john_binary: DEFAULT_BINARY.to_string(),
            john_format: DEFAULT_FORMAT.to_string(),
        }
    }
}

impl AuditConfig {
    /// Layer config-store overrides and the environment default over the
    /// built-in defaults. Unparseable numeric overrides are ignored with a
    /// warning rather than failing the batch.
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = storage::config_get(pool, CONFIG_TIME_BUDGET).await? {
            match value.parse::<u64>() {
                Ok(secs) => config.time_budget = Duration::from_secs(secs),
                Err(_) => warn!("ignoring invalid {CONFIG_TIME_BUDGET}: {value}"),
            }
        }

        if let Some(value) = storage::config_get(pool, CONFIG_MAX_GUESSES).await? {
            match value.parse::<u64>() {
                Ok(max) => config.max_guesses = max,
                Err(_) => warn!("ignoring invalid {CONFIG_MAX_GUESSES}: {value}"),
            }
        }

        config.wordlist_override = storage::config_get(pool, CONFIG_WORDLIST)
            .await?
            .map(PathBuf::from);
        config.env_wordlist = std::env::var(WORDLIST_ENV).ok().map(PathBuf::from);

        if let Some(binary) = storage::config_get(pool, CONFIG_JOHN_BINARY).await? {
            config.john_binary = binary;
        }
        if let Some(format) = storage::config_get(pool, CONFIG_JOHN_FORMAT).await? {
            config.john_format = format;
        }

        Ok(config)
    }

    /// Wordlist candidates in resolution priority order.
    #[must_use]
    pub fn wordlist_candidates(&self) -> Vec<PathBuf> {
        self.wordlist_override
            .iter()
            .chain(self.env_wordlist.iter())
            .cloned()
            .chain(self.fallback_wordlists.iter().cloned())
            .collect()
    }
}

/// Terminal outcome of one audit invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditStatus {
    Cracked,
    NotCracked,
    Timeout,
    /// The external tool binary could not be started; distinguished so a
    /// misconfigured host is visible in the results.
    ToolUnavailable,
    /// Per-user I/O or subprocess error, degraded instead of aborting the
    /// batch.
    Failed,
}

impl AuditStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cracked => "cracked",
            Self::NotCracked => "not_cracked",
            Self::Timeout => "timeout",
            Self::ToolUnavailable => "tool_unavailable",
            Self::Failed => "failed",
        }
    }
}

/// What one audit invocation found, persisted exactly once per credential.
#[derive(Clone, Debug)]
pub struct AuditOutcome {
    pub guesses: u64,
    pub status: AuditStatus,
    pub plaintext: Option<String>,
    pub elapsed: Duration,
}

impl AuditOutcome {
    #[must_use]
    pub const fn cracked(&self) -> bool {
        matches!(self.status, AuditStatus::Cracked)
    }
}

/// Audit every registered credential, replacing all prior results.
///
/// # Errors
/// Only store-level failures propagate; per-user errors degrade to a
/// `failed` result for that user.
pub async fn run_full_audit(
    pool: &SqlitePool,
    hashing: &Hashing,
) -> Result<Vec<(String, AuditOutcome)>> {
    let config = AuditConfig::load(pool).await?;
    run_full_audit_with(pool, hashing, &config).await
}

/// Batch run with an already-resolved configuration.
pub async fn run_full_audit_with(
    pool: &SqlitePool,
    hashing: &Hashing,
    config: &AuditConfig,
) -> Result<Vec<(String, AuditOutcome)>> {
    storage::clear_audit_results(pool).await?;

    let credentials = storage::list_credentials(pool).await?;
    let mut results = Vec::with_capacity(credentials.len());

    for credential in credentials {
        let outcome = audit_credential(hashing, config, &credential).await;
        storage::append_audit_result(
            pool,
            credential.id,
            i64::try_from(outcome.guesses).unwrap_or(i64::MAX),
            outcome.cracked(),
            outcome.plaintext.as_deref(),
            i64::try_from(outcome.elapsed.as_secs()).unwrap_or(i64::MAX),
            outcome.status.as_str(),
        )
        .await?;

        info!(
            user = %credential.username,
            status = outcome.status.as_str(),
            guesses = outcome.guesses,
            "audit finished"
        );
        results.push((credential.username, outcome));
    }

    Ok(results)
}

/// Run the three-step audit for one credential. Never fails: internal errors
/// degrade to a [`AuditStatus::Failed`] outcome.
pub async fn audit_credential(
    hashing: &Hashing,
    config: &AuditConfig,
    credential: &CredentialRecord,
) -> AuditOutcome {
    let started = Instant::now();
    let mut guesses: u64 = 0;

    // Step 1: the ~20 passwords every attacker tries first.
    for candidate in COMMON_PASSWORDS {
        guesses += 1;
        if hashing.verify(candidate, &credential.digest) {
            return finish(guesses, AuditStatus::Cracked, Some(candidate.to_string()), started);
        }
    }
    if started.elapsed() > config.time_budget {
        return finish(guesses, AuditStatus::Timeout, None, started);
    }

    // Scratch artifact for steps 2/3. Dropping the handle removes the file on
    // every exit path, including panics unwinding through this frame.
    let scratch = match scratch_artifact(credential) {
        Ok(scratch) => scratch,
        Err(err) => {
            warn!(user = %credential.username, "scratch artifact failed: {err}");
            return finish(guesses, AuditStatus::Failed, None, started);
        }
    };

    match wordlist::resolve(config.wordlist_candidates()) {
        Some(path) => dictionary_pass(hashing, config, credential, guesses, started, &path).await,
        None => {
            debug!(user = %credential.username, "no wordlist resolved, falling back to the cracking tool");
            tool_pass(config, credential, guesses, started, scratch.path()).await
        }
    }
}

fn finish(
    guesses: u64,
    status: AuditStatus,
    plaintext: Option<String>,
    started: Instant,
) -> AuditOutcome {
    AuditOutcome {
        guesses,
        status,
        plaintext,
        elapsed: started.elapsed(),
    }
}

/// `identifier:digest`, uniquely named per invocation so concurrent batches
/// cannot collide.
fn scratch_artifact(credential: &CredentialRecord) -> Result<NamedTempFile, Error> {
    let mut scratch = tempfile::Builder::new()
        .prefix(&format!("pcdt-audit-{}-", credential.id))
        .suffix(".hash")
        .tempfile()
        .map_err(Error::ScratchArtifact)?;
    writeln!(scratch, "{}:{}", credential.username, credential.digest)
        .map_err(Error::ScratchArtifact)?;
    scratch.flush().map_err(Error::ScratchArtifact)?;
    Ok(scratch)
}

/// Step 2: stream the resolved wordlist, skipping empty lines, until a match
/// or an exhausted time/guess budget.
async fn dictionary_pass(
    hashing: &Hashing,
    config: &AuditConfig,
    credential: &CredentialRecord,
    mut guesses: u64,
    started: Instant,
    path: &Path,
) -> AuditOutcome {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(err) => {
            warn!(user = %credential.username, "wordlist {} unreadable: {err}", path.display());
            return finish(guesses, AuditStatus::Failed, None, started);
        }
    };

    let mut lines = BufReader::new(file).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(user = %credential.username, "wordlist read failed: {err}");
                return finish(guesses, AuditStatus::Failed, None, started);
            }
        };
        if line.is_empty() {
            continue;
        }

        guesses += 1;
        if hashing.verify(&line, &credential.digest) {
            return finish(guesses, AuditStatus::Cracked, Some(line), started);
        }
        if started.elapsed() > config.time_budget {
            return finish(guesses, AuditStatus::Timeout, None, started);
        }
        if guesses >= config.max_guesses {
            break;
        }
    }

    finish(guesses, AuditStatus::NotCracked, None, started)
}

/// Step 3: incremental-mode external tool against the scratch artifact,
/// bounded by the remaining budget, then query its recovered results.
async fn tool_pass(
    config: &AuditConfig,
    credential: &CredentialRecord,
    guesses: u64,
    started: Instant,
    hash_file: &Path,
) -> AuditOutcome {
    let runner = JohnRunner::new(&config.john_binary, &config.john_format);

    let session = match runner.spawn_incremental(hash_file) {
        Ok(session) => session,
        Err(Error::ToolUnavailable(reason)) => {
            debug!(user = %credential.username, "cracking tool unavailable: {reason}");
            return finish(guesses, AuditStatus::ToolUnavailable, None, started);
        }
        Err(err) => {
            warn!(user = %credential.username, "cracking tool spawn failed: {err}");
            return finish(guesses, AuditStatus::Failed, None, started);
        }
    };

    let remaining = config.time_budget.saturating_sub(started.elapsed());
    session.wait_with_timeout(remaining).await;

    match runner.show(hash_file).await {
        Ok(entries) => {
            let recovered = entries
                .into_iter()
                .find(|(identifier, _)| identifier == &credential.username);
            match recovered {
                Some((_, plaintext)) => {
                    finish(guesses, AuditStatus::Cracked, Some(plaintext), started)
                }
                None => finish(guesses, AuditStatus::NotCracked, None, started),
            }
        }
        Err(err) => {
            warn!(user = %credential.username, "cracking tool query failed: {err}");
            finish(guesses, AuditStatus::ToolUnavailable, None, started)
        }
    }
}
