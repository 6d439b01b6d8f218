use regex::bytes::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::errors::{SearchError, SearchResult};
use crate::results::{Location, Range};

/// What to search for, as given by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternInfo {
    pub pattern: String,
    /// The pattern is a regular expression (ignored for structural patterns)
    pub is_regexp: bool,
    /// The pattern is a comby match template
    pub is_structural: bool,
    pub is_case_sensitive: bool,
    /// Only match whole words
    pub is_word_match: bool,
    /// comby rule applied to structural matches
    pub comby_rule: Option<String>,
    /// Requested languages; only the first one selects the structural matcher
    pub languages: Vec<String>,
    /// Regexes a path must all match to be searched
    pub include_patterns: Vec<String>,
    /// Regex of paths to skip
    pub exclude_pattern: Option<String>,
    pub path_patterns_are_case_sensitive: bool,
    /// Maximum number of files with matches; 0 means no limit
    pub limit: usize,
}

impl PatternInfo {
    /// A literal, case-insensitive pattern with no filters
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    /// A regular expression pattern
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            is_regexp: true,
            ..Self::literal(pattern)
        }
    }

    /// A comby match template
    pub fn structural(pattern: impl Into<String>) -> Self {
        Self {
            is_structural: true,
            ..Self::literal(pattern)
        }
    }
}

/// A compiled content regex plus the path filters of a [`PatternInfo`]
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    content: Regex,
    include: Vec<Regex>,
    exclude: Option<Regex>,
}

impl PatternMatcher {
    /// Compiles the content and path regexes of `info`.
    ///
    /// Structural patterns cannot be compiled here; translate them first (see
    /// [`crate::comby::pattern::structural_pat_to_regexp_query`]).
    pub fn compile(info: &PatternInfo) -> SearchResult<Self> {
        if info.is_structural {
            return Err(SearchError::invalid_pattern(
                "structural patterns must be translated to a regex before compiling",
            ));
        }

        let mut expr = if info.is_regexp {
            info.pattern.clone()
        } else {
            regex::escape(&info.pattern)
        };
        if info.is_word_match {
            expr = format!(r"\b(?:{})\b", expr);
        }

        let content = RegexBuilder::new(&expr)
            .case_insensitive(!info.is_case_sensitive)
            .multi_line(true)
            .build()
            .map_err(|e| SearchError::invalid_pattern(e.to_string()))?;

        let path_regex = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(!info.path_patterns_are_case_sensitive)
                .build()
                .map_err(|e| SearchError::invalid_pattern(format!("path pattern {}: {}", pattern, e)))
        };

        let include = info
            .include_patterns
            .iter()
            .map(|p| path_regex(p))
            .collect::<SearchResult<Vec<_>>>()?;
        let exclude = info
            .exclude_pattern
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(path_regex)
            .transpose()?;

        Ok(Self {
            content,
            include,
            exclude,
        })
    }

    /// Whether a file at `path` should be searched at all
    pub fn matches_path(&self, path: &str) -> bool {
        self.include.iter().all(|re| re.is_match(path.as_bytes()))
            && !self
                .exclude
                .as_ref()
                .is_some_and(|re| re.is_match(path.as_bytes()))
    }

    /// Whether `content` contains at least one match
    pub fn is_match(&self, content: &[u8]) -> bool {
        self.content.is_match(content)
    }

    /// Finds every match in `content` as a range with 0-based lines and columns.
    ///
    /// Columns count UTF-8 characters from the start of the line.
    pub fn find_ranges(&self, content: &[u8]) -> Vec<Range> {
        let mut cursor = LineCursor::default();
        self.content
            .find_iter(content)
            .map(|m| {
                let start = cursor.advance_to(content, m.start());
                let end = cursor.advance_to(content, m.end());
                Range::new(start, end)
            })
            .collect()
    }
}

/// Walks forward through a buffer tracking the line of the current offset
#[derive(Debug, Default)]
struct LineCursor {
    offset: usize,
    line: u32,
    line_start: usize,
}

impl LineCursor {
    /// Moves to `target`, which must not be before the current offset
    fn advance_to(&mut self, buf: &[u8], target: usize) -> Location {
        for (i, &b) in buf[self.offset..target].iter().enumerate() {
            if b == b'\n' {
                self.line += 1;
                self.line_start = self.offset + i + 1;
            }
        }
        self.offset = target;

        let column = buf[self.line_start..target]
            .iter()
            .filter(|&&b| (b & 0xC0) != 0x80)
            .count();
        Location::new(target as u32, self.line, column as u32)
    }
}
