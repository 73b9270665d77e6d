//! Glob patterns for plugin path matching.
//!
//! Patterns are compiled to anchored regular expressions at registration
//! time: `**/` matches any directory prefix (including none), `**` any
//! run of characters, `*` any run within one path segment, `?` one
//! character within a segment. Everything else is literal.

use regex::Regex;

/// A compiled path-matching pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob into its matcher.
    pub fn compile(pattern: &str) -> Result<Self, GlobError> {
        let mut translated = String::with_capacity(pattern.len() * 2);
        translated.push('^');

        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        if chars.peek() == Some(&'/') {
                            chars.next();
                            translated.push_str("(?:.*/)?");
                        } else {
                            translated.push_str(".*");
                        }
                    } else {
                        translated.push_str("[^/]*");
                    }
                }
                '?' => translated.push_str("[^/]"),
                other => translated.push_str(&regex::escape(&other.to_string())),
            }
        }
        translated.push('$');

        let regex = Regex::new(&translated).map_err(|e| GlobError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The source pattern as registered.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Errors from glob compilation.
#[derive(Debug, thiserror::Error)]
pub enum GlobError {
    #[error("invalid glob pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(pattern: &str) -> GlobPattern {
        GlobPattern::compile(pattern).expect("pattern should compile")
    }

    #[test]
    fn star_stays_within_one_segment() {
        let g = glob("*.json");
        assert!(g.matches("data.json"));
        assert!(!g.matches("nested/data.json"));
    }

    #[test]
    fn double_star_prefix_matches_any_depth() {
        let g = glob("**/*.md");
        assert!(g.matches("readme.md"));
        assert!(g.matches("docs/readme.md"));
        assert!(g.matches("docs/guides/setup.md"));
        assert!(!g.matches("docs/readme.txt"));
    }

    #[test]
    fn question_mark_matches_one_character() {
        let g = glob("file-?.txt");
        assert!(g.matches("file-a.txt"));
        assert!(!g.matches("file-ab.txt"));
        assert!(!g.matches("file-/.txt"));
    }

    #[test]
    fn literal_dots_are_not_wildcards() {
        let g = glob("notes.md");
        assert!(g.matches("notes.md"));
        assert!(!g.matches("notesxmd"));
    }

    #[test]
    fn bare_double_star_matches_everything() {
        let g = glob("**");
        assert!(g.matches("any/path/at/all.bin"));
    }
}
