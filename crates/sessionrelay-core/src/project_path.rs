use std::path::MAIN_SEPARATOR;

/// Encodes an absolute project path into a stable string usable as a map
/// key (§4.3): the native path separator becomes `-`, so a leading
/// separator becomes a leading `-`.
///
/// This is used only as a cache key. The original path string is carried
/// alongside it (as `original_path` on whatever holds the encoded key) so
/// callers never need to invert the encoding to recover the real path.
pub fn encode_project_path(path: &str) -> String {
    path.chars()
        .map(|c| if c == MAIN_SEPARATOR { '-' } else { c })
        .collect()
}

/// Inverts `encode_project_path`. Only exact for paths whose segments
/// contain no literal `-`; kept for round-trip tests and debugging, not for
/// recovering a path the caller didn't already have.
pub fn decode_project_path(encoded: &str) -> String {
    encoded
        .chars()
        .map(|c| if c == '-' { MAIN_SEPARATOR } else { c })
        .collect()
}
