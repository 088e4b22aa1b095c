//! Farcaster handle normalization.

use regex::Regex;

static HANDLE_RE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9-]{0,19}(\.eth)?$").expect("valid handle regex")
});

/// Normalize user input into a lookup handle.
///
/// Trims whitespace, strips leading `@` characters and lowercases. Returns
/// `None` when what remains cannot be a Farcaster username.
#[must_use]
pub fn normalize_handle(input: &str) -> Option<String> {
    let handle = input.trim().trim_start_matches('@').trim().to_lowercase();

    if HANDLE_RE.is_match(&handle) {
        Some(handle)
    } else {
        None
    }
}
