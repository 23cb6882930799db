//! Password guessability estimation.
//!
//! This is a deliberately simple heuristic for demonstration, not a
//! probabilistic cracking model: a curated common-password table handles the
//! passwords any online attacker tries first, and everything else falls back
//! to a length/complexity formula.

use serde::Serialize;

use super::pattern::{classify, signature};

/// Passwords every attacker tries first, ordered by rank. The guess estimator
/// fast path and the audit engine fast path share this table so a password
/// rated "rank 3" is also cracked in 3 probes.
pub const COMMON_PASSWORDS: [&str; 20] = [
    "password",
    "123456",
    "123456789",
    "qwerty",
    "abc123",
    "password1",
    "111111",
    "12345678",
    "iloveyou",
    "letmein",
    "admin",
    "welcome",
    "monkey",
    "dragon",
    "sunshine",
    "princess",
    "football",
    "shadow",
    "master",
    "superman",
];

/// Weight applied per character of length in the fallback formula.
pub const LENGTH_WEIGHT: u64 = 1_000;

/// Weight applied to the squared distinct-class count in the fallback formula.
pub const COMPLEXITY_WEIGHT: u64 = 25_000;

/// Minimum guess count the fallback formula ever reports.
pub const GUESS_FLOOR: u64 = 1_000;

/// Result of estimating a single password.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Estimate {
    pub guesses: u64,
    pub pattern: String,
}

/// Estimate how many guesses an attacker needs for `password`.
///
/// Two tiers, first match wins: a case-insensitive hit in
/// [`COMMON_PASSWORDS`] returns that entry's fixed rank; otherwise
/// `LENGTH_WEIGHT * len + COMPLEXITY_WEIGHT * classes^2`, clamped to
/// [`GUESS_FLOOR`], where `classes` counts the distinct character classes
/// present. Pure and total: the same input always yields the same result.
#[must_use]
pub fn estimate(password: &str) -> Estimate {
    let groups = classify(password);
    let pattern = signature(&groups);

    if let Some(rank) = common_password_rank(password) {
        return Estimate {
            guesses: rank,
            pattern,
        };
    }

    let length = password.chars().count() as u64;
    let mut classes: Vec<_> = groups.iter().map(|(class, _)| *class).collect();
    classes.sort_by_key(|class| class.letter());
    classes.dedup();
    let distinct = classes.len() as u64;

    let guesses = (LENGTH_WEIGHT * length + COMPLEXITY_WEIGHT * distinct * distinct)
        .max(GUESS_FLOOR);

    Estimate { guesses, pattern }
}

/// 1-based rank of `password` in the common table, matched case-insensitively.
#[must_use]
pub fn common_password_rank(password: &str) -> Option<u64> {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS
        .iter()
        .position(|candidate| *candidate == lowered)
        .map(|index| index as u64 + 1)
}
