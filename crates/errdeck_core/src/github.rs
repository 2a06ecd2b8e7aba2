//! Source repository URL normalization.
//!
//! # Responsibility
//! - Canonicalize user-supplied GitHub repository URLs to one HTTPS form.
//! - Build browse links to files inside a linked repository.
//!
//! # Invariants
//! - Recognized inputs normalize to `https://github.com/OWNER/REPO` with no
//!   trailing slash and no `.git` suffix.
//! - Blank input normalizes to the empty string.
//! - Unrecognized input is returned unchanged; this is a best-effort
//!   normalizer, not a validator.
//! - Normalization is idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

const GITHUB_HTTPS_PREFIX: &str = "https://github.com";
const BROWSE_BRANCH: &str = "master";

static GITHUB_REPO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://github\.com/|git@github\.com:)([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)*/?$",
    )
    .expect("valid github repo regex")
});

/// Normalizes a repository URL.
///
/// Accepted forms:
/// - `git@github.com:OWNER/REPO.git`
/// - `http://github.com/OWNER/REPO[.git]`
/// - `https://github.com/OWNER/REPO[.git]`
pub fn normalize(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    match GITHUB_REPO_RE.captures(trimmed) {
        Some(caps) => format!("{GITHUB_HTTPS_PREFIX}/{}/{}", &caps[1], &caps[2]),
        None => url.to_string(),
    }
}

/// Returns whether a normalized URL links a repository.
pub fn has_repository(github_url: &str) -> bool {
    !github_url.is_empty()
}

/// Builds `{github_url}/blob/master/{path}`.
pub fn file_url(github_url: &str, path: &str) -> String {
    format!(
        "{github_url}/blob/{BROWSE_BRANCH}/{}",
        path.trim_start_matches('/')
    )
}
