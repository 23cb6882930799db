//! Sliding-window detection of brute-force and credential-stuffing patterns
//! in the login-attempt log.
//!
//! Each sweep is one self-contained, idempotent pass over the most recent
//! attempts. Cooldown state lives in the [`Detector`] value its scheduler
//! owns, so independent detectors (tests, replicas) cannot interfere; it
//! resets with the process.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, info};

use super::storage::{self, LoginAttemptRecord};

pub const BRUTE_FORCE: &str = "BRUTE_FORCE";
pub const CREDENTIAL_STUFFING: &str = "CREDENTIAL_STUFFING";

/// Thresholds and windows for one detector instance.
#[derive(Clone, Debug)]
pub struct DetectionConfig {
    /// Trailing window for counting failed attempts per IP.
    pub brute_force_window: Duration,
    /// Failed attempts from one IP that trigger an alert.
    pub brute_force_threshold: usize,
    /// Trailing window for correlating fingerprints.
    pub stuffing_window: Duration,
    /// Distinct usernames sharing a fingerprint that trigger an alert.
    pub stuffing_threshold: usize,
    /// Minimum gap between two alerts for the same key.
    pub cooldown: Duration,
    /// How many recent attempts one sweep examines.
    pub scan_limit: i64,
    /// Cap on usernames listed in a stuffing alert.
    pub max_listed_usernames: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            brute_force_window: Duration::from_secs(120),
            brute_force_threshold: 5,
            stuffing_window: Duration::from_secs(120),
            stuffing_threshold: 3,
            cooldown: Duration::from_secs(300),
            scan_limit: 500,
            max_listed_usernames: 10,
        }
    }
}

/// Detection engine state: rule thresholds plus per-key cooldown timestamps.
#[derive(Debug)]
pub struct Detector {
    config: DetectionConfig,
    brute_cooldown: HashMap<String, DateTime<Utc>>,
    stuffing_cooldown: HashMap<String, DateTime<Utc>>,
}

impl Detector {
    #[must_use]
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            brute_cooldown: HashMap::new(),
            stuffing_cooldown: HashMap::new(),
        }
    }

    /// One sweep relative to the current wall clock.
    ///
    /// # Errors
    /// Only store-level failures propagate; malformed records are skipped.
    pub async fn sweep(&mut self, pool: &SqlitePool) -> Result<usize> {
        self.sweep_at(pool, Utc::now()).await
    }

    /// One sweep relative to the supplied reference time. Returns the number
    /// of alerts emitted.
    pub async fn sweep_at(&mut self, pool: &SqlitePool, now: DateTime<Utc>) -> Result<usize> {
        let attempts = storage::recent_login_attempts(pool, self.config.scan_limit).await?;
        let mut emitted = 0;

        emitted += self.brute_force_rule(pool, &attempts, now).await?;
        emitted += self.stuffing_rule(pool, &attempts, now).await?;

        if emitted > 0 {
            info!("detection sweep emitted {emitted} alert(s)");
        } else {
            debug!("detection sweep emitted no alerts");
        }

        Ok(emitted)
    }

    /// Count failed attempts per source IP inside the trailing window; alert
    /// once per IP per cooldown.
    async fn brute_force_rule(
        &mut self,
        pool: &SqlitePool,
        attempts: &[LoginAttemptRecord],
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut per_ip: HashMap<&str, usize> = HashMap::new();
        for attempt in attempts {
            if !attempt.outcome.starts_with("fail") {
                continue;
            }
            if !in_window(&attempt.created_at, now, self.config.brute_force_window) {
                continue;
            }
            *per_ip.entry(attempt.ip.as_str()).or_default() += 1;
        }

        let mut emitted = 0;
        for (ip, count) in per_ip {
            if count < self.config.brute_force_threshold {
                continue;
            }
            if !cooldown_elapsed(self.brute_cooldown.get(ip), now, self.config.cooldown) {
                debug!("suppressing {BRUTE_FORCE} alert for {ip}: cooldown active");
                continue;
            }
            let details = format!("Detected {count} failed attempts from IP {ip}");
            storage::append_alert(pool, BRUTE_FORCE, &details, now).await?;
            self.brute_cooldown.insert(ip.to_string(), now);
            emitted += 1;
        }
        Ok(emitted)
    }

    /// Correlate fingerprints across usernames inside the trailing window;
    /// alert once per fingerprint per cooldown. All outcomes count, success
    /// included: a stuffing run that logs in is still a stuffing run.
    async fn stuffing_rule(
        &mut self,
        pool: &SqlitePool,
        attempts: &[LoginAttemptRecord],
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut per_fingerprint: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        for attempt in attempts {
            if !in_window(&attempt.created_at, now, self.config.stuffing_window) {
                continue;
            }
            per_fingerprint
                .entry(attempt.fingerprint.as_str())
                .or_default()
                .insert(attempt.username.as_str());
        }

        let mut emitted = 0;
        for (fingerprint, usernames) in per_fingerprint {
            if usernames.len() < self.config.stuffing_threshold {
                continue;
            }
            if !cooldown_elapsed(
                self.stuffing_cooldown.get(fingerprint),
                now,
                self.config.cooldown,
            ) {
                debug!("suppressing {CREDENTIAL_STUFFING} alert: cooldown active");
                continue;
            }
            let listed: Vec<&str> = usernames
                .iter()
                .copied()
                .take(self.config.max_listed_usernames)
                .collect();
            let details = format!("Same password used on accounts: {}", listed.join(", "));
            storage::append_alert(pool, CREDENTIAL_STUFFING, &details, now).await?;
            self.stuffing_cooldown.insert(fingerprint.to_string(), now);
            emitted += 1;
        }
        Ok(emitted)
    }
}

/// Records whose timestamp cannot be parsed are skipped, never fatal.
fn in_window(created_at: &str, now: DateTime<Utc>, window: Duration) -> bool {
    let Ok(timestamp) = DateTime::parse_from_rfc3339(created_at) else {
        debug!("skipping attempt with unparseable timestamp: {created_at}");
        return false;
    };
    let elapsed = now.signed_duration_since(timestamp.with_timezone(&Utc));
    elapsed.num_seconds() <= i64::try_from(window.as_secs()).unwrap_or(i64::MAX)
}

fn cooldown_elapsed(
    last: Option<&DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> bool {
    let Some(last) = last else {
        return true;
    };
    let elapsed = now.signed_duration_since(*last);
    elapsed.num_seconds() > i64::try_from(cooldown.as_secs()).unwrap_or(i64::MAX)
}
