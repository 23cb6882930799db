//! # PCDT (Password Credential Defense Toolkit)
//!
//! `pcdt` is a self-contained password-security lab. It accepts credentials,
//! estimates how guessable a chosen password is, scans authentication logs for
//! attack patterns, and can run a bounded offline audit (simulated cracking)
//! against stored credential digests.
//!
//! ## Storage
//!
//! Everything persists to a single local `SQLite` database: credentials (only
//! as keyed digests), guess estimates, login attempts, alerts, audit results,
//! and operator configuration overrides. Plaintext passwords are never stored;
//! the only persisted plaintext is one recovered by a successful audit.
//!
//! ## Engines
//!
//! - [`pcdt::estimator`] — common-password table + complexity heuristic.
//! - [`pcdt::audit`] — time/guess-bounded offline recovery attempt, with an
//!   external cracking-tool fallback behind a hard timeout.
//! - [`pcdt::detect`] — sliding-window brute-force and credential-stuffing
//!   detector with cooldown-gated alerting.

pub mod cli;
pub mod pcdt;
