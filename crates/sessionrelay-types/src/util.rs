/// Collapse runs of ASCII/Unicode whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Truncate a string to at most `max` chars, counting by `char`, no ellipsis added.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Collapse whitespace, then truncate to `max` chars. Used for `first_prompt`/`summary`
/// fields on `SessionIndexEntry` (spec §3: "truncated ≤ 200 chars, whitespace collapsed").
pub fn collapse_and_truncate(s: &str, max: usize) -> String {
    truncate(&collapse_whitespace(s), max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(collapse_whitespace("hi\n\n  there\tfriend"), "hi there friend");
    }

    #[test]
    fn collapse_trims_ends() {
        assert_eq!(collapse_whitespace("  hi  "), "hi");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello world", 5), "hello");
        assert_eq!(truncate("hi", 5), "hi");
    }

    #[test]
    fn collapse_and_truncate_combines_both() {
        let long = "a".repeat(250);
        let s = format!("  {}  more\ntext ", long);
        let out = collapse_and_truncate(&s, 200);
        assert_eq!(out.chars().count(), 200);
    }
}
