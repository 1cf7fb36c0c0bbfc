//! Find and replace over a whole buffer.
//!
//! The pattern is a regular expression, not a literal. Callers that want a
//! literal search escape it first (`regex::escape`). Every non-overlapping
//! match is replaced left to right; the replacement may reference groups
//! with `$1` / `${name}`, and `$$` is a literal dollar.

use regex::Regex;

use crate::surface::{EditingSurface, TextEdit};
use crate::CoreResult;

/// Replaces every match of `pattern` in `text`.
///
/// An empty pattern is a no-op and returns the input unchanged.
pub fn find_replace(text: &str, pattern: &str, replacement: &str) -> CoreResult<String> {
    if pattern.is_empty() {
        return Ok(text.to_string());
    }
    let re = Regex::new(pattern)?;
    Ok(re.replace_all(text, replacement).into_owned())
}

/// Builds the single whole-buffer edit for a find/replace on `surface`.
///
/// Returns `None` when the pattern is empty or the surface has no content
/// model loaded.
pub fn replace_edit(
    surface: &dyn EditingSurface,
    pattern: &str,
    replacement: &str,
) -> CoreResult<Option<TextEdit>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    let Some(text) = surface.content() else {
        return Ok(None);
    };

    let len = text.chars().count();
    let updated = find_replace(&text, pattern, replacement)?;
    Ok(Some(TextEdit::whole(len, updated)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::BufferSurface;
    use crate::CoreError;

    #[test]
    fn test_replaces_every_match() {
        assert_eq!(find_replace("aaa", "a", "b").unwrap(), "bbb");
        assert_eq!(
            find_replace("let a = 1; let b = 2;", "let", "const").unwrap(),
            "const a = 1; const b = 2;"
        );
    }

    #[test]
    fn test_empty_pattern_is_noop() {
        assert_eq!(find_replace("abc", "", "x").unwrap(), "abc");
    }

    #[test]
    fn test_pattern_is_a_regex() {
        // `.` matches any character, not a literal dot.
        assert_eq!(find_replace("a.b", ".", "-").unwrap(), "---");
        assert_eq!(find_replace("a.b", &regex::escape("."), "-").unwrap(), "a-b");
    }

    #[test]
    fn test_group_references() {
        assert_eq!(
            find_replace("foo(1) foo(2)", r"foo\((\d)\)", "bar[$1]").unwrap(),
            "bar[1] bar[2]"
        );
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            find_replace("abc", "(", "x"),
            Err(CoreError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_replace_edit_covers_whole_buffer() {
        let mut surface = BufferSurface::default();
        surface.set_content("héllo héllo");

        let edit = replace_edit(&surface, "é", "e").unwrap().unwrap();
        assert_eq!(edit.range, 0..11);
        assert_eq!(edit.text, "hello hello");
    }

    #[test]
    fn test_replace_edit_without_model() {
        let surface = BufferSurface::default();
        assert_eq!(replace_edit(&surface, "a", "b").unwrap(), None);
    }

    #[test]
    fn test_replace_edit_empty_pattern() {
        let mut surface = BufferSurface::default();
        surface.set_content("abc");
        assert_eq!(replace_edit(&surface, "", "b").unwrap(), None);
    }
}
