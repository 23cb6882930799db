//! Wordlist resolution for the audit engine's dictionary path.

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fixed fallback locations probed when neither the config override nor the
/// environment default resolves. Order matters.
pub const FALLBACK_WORDLISTS: [&str; 3] = [
    "/usr/share/wordlists/rockyou.txt",
    "/usr/share/wordlists/fasttrack.txt",
    "/usr/share/dict/words",
];

/// Pick the first candidate that is an existing, readable file.
///
/// Candidates are probed in the order given; unreadable or missing paths are
/// skipped. Returns `None` when nothing resolves, which sends the audit
/// engine to its external-tool fallback.
pub fn resolve<I, P>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    for candidate in candidates {
        let path = candidate.as_ref();
        if File::open(path).is_ok() {
            return Some(path.to_path_buf());
        }
        debug!("skipping unreadable wordlist candidate: {}", path.display());
    }
    None
}
