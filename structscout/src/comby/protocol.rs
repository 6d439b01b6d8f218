//! Records comby prints with `-json-lines`.
//!
//! Positions here are comby's: byte offsets plus 1-based lines and columns.
//! [`Location::to_location`] is the only place they become 0-based.

use serde::Deserialize;

use crate::results;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Location {
    pub offset: usize,
    /// 1-based
    pub line: usize,
    /// 1-based
    pub column: usize,
}

impl Location {
    /// Converts to a 0-based [`results::Location`]
    pub fn to_location(&self) -> results::Location {
        results::Location {
            offset: self.offset as u32,
            line: self.line.saturating_sub(1) as u32,
            column: self.column.saturating_sub(1) as u32,
        }
    }

    /// Converts a 0-based location back to comby's convention
    pub fn from_location(location: results::Location) -> Self {
        Self {
            offset: location.offset as usize,
            line: location.line as usize + 1,
            column: location.column as usize + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Range {
    pub start: Location,
    pub end: Location,
}

impl Range {
    pub fn to_range(&self) -> results::Range {
        results::Range {
            start: self.start.to_location(),
            end: self.end.to_location(),
        }
    }
}

/// One match of a `-match-only` record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Match {
    pub range: Range,
    #[serde(default)]
    pub matched: String,
}

/// A `-match-only` record: every match in one file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileMatch {
    pub uri: String,
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// A chunk of a `-chunk-matches` record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChunkMatch {
    pub content: String,
    pub start: Location,
    pub ranges: Vec<Range>,
}

/// A `-chunk-matches` record: every chunk in one file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileMatchWithChunks {
    pub uri: String,
    #[serde(rename = "matches", default)]
    pub chunk_matches: Vec<ChunkMatch>,
}

pub fn parse_file_match(line: &[u8]) -> serde_json::Result<FileMatch> {
    serde_json::from_slice(line)
}

pub fn parse_file_match_with_chunks(line: &[u8]) -> serde_json::Result<FileMatchWithChunks> {
    serde_json::from_slice(line)
}
