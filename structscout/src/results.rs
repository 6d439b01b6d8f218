/// Search result types.
///
/// All positions held here are 0-based. comby reports 1-based lines and columns;
/// those are converted exactly once where comby output is parsed (see
/// [`crate::comby::protocol`]), so nothing downstream of that boundary ever
/// adjusts a line or column again.
///
/// Results leave the engine one file at a time through a [`MatchSender`]. A
/// sender always receives a complete [`FileMatch`]; partial files are never sent.
use serde::{Deserialize, Serialize};

/// A position in a file's byte content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Byte offset from the start of the file
    pub offset: u32,
    /// 0-based line number
    pub line: u32,
    /// 0-based column
    pub column: u32,
}

impl Location {
    pub fn new(offset: u32, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

/// A half-open byte interval `[start, end)` into a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Location,
    pub end: Location,
}

impl Range {
    pub fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }
}

/// A whole-line span of file content containing one or more nearby matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMatch {
    /// The chunk's content, expanded to whole lines
    pub content: String,
    /// Location of the first byte of `content`; the column is always 0
    pub content_start: Location,
    /// Match ranges inside the chunk, relative to the start of the file
    pub ranges: Vec<Range>,
}

/// All matches found in a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatch {
    /// Path of the file relative to the search root
    pub path: String,
    pub chunk_matches: Vec<ChunkMatch>,
    /// Whether matches in this file were dropped because of a limit
    pub limit_hit: bool,
}

impl FileMatch {
    /// Number of individual match ranges across all chunks
    pub fn match_count(&self) -> usize {
        self.chunk_matches.iter().map(|cm| cm.ranges.len()).sum()
    }
}

/// Receives search results, one complete file at a time.
///
/// The engine never calls a sender from more than one thread at a time within a
/// single search, but a streaming search does call it from a worker thread, so
/// senders handed to the engine must be `Send`.
pub trait MatchSender {
    fn send(&mut self, file_match: FileMatch);
}

impl<S: MatchSender + ?Sized> MatchSender for &mut S {
    fn send(&mut self, file_match: FileMatch) {
        (**self).send(file_match)
    }
}

impl MatchSender for crossbeam_channel::Sender<FileMatch> {
    fn send(&mut self, file_match: FileMatch) {
        // A dropped receiver means nobody wants the rest of the results.
        let _ = crossbeam_channel::Sender::send(self, file_match);
    }
}

/// A sender that collects every result in memory
#[derive(Debug, Clone, Default)]
pub struct SearchOutput {
    /// Results per file, in the order they were sent
    pub file_matches: Vec<FileMatch>,
    /// Total number of match ranges found
    pub total_matches: usize,
    /// Number of files with at least one match
    pub files_with_matches: usize,
}

impl SearchOutput {
    /// Creates a new empty search output
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a file match to the output
    pub fn add_file_match(&mut self, file_match: FileMatch) {
        let count = file_match.match_count();
        if count > 0 {
            self.total_matches += count;
            self.files_with_matches += 1;
        }
        self.file_matches.push(file_match);
    }

    /// Paths of every collected file, in send order
    pub fn paths(&self) -> Vec<&str> {
        self.file_matches.iter().map(|fm| fm.path.as_str()).collect()
    }
}

impl MatchSender for SearchOutput {
    fn send(&mut self, file_match: FileMatch) {
        self.add_file_match(file_match);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32, line: u32) -> Range {
        Range::new(Location::new(start, line, 0), Location::new(end, line, end - start))
    }

    fn file_match(path: &str, ranges: Vec<Range>) -> FileMatch {
        FileMatch {
            path: path.to_string(),
            chunk_matches: vec![ChunkMatch {
                content: "content".to_string(),
                content_start: Location::default(),
                ranges,
            }],
            limit_hit: false,
        }
    }

    #[test]
    fn test_match_count() {
        let fm = file_match("a.go", vec![range(0, 3, 0), range(5, 8, 0)]);
        assert_eq!(fm.match_count(), 2);

        let empty = FileMatch {
            path: "b.go".to_string(),
            chunk_matches: vec![],
            limit_hit: false,
        };
        assert_eq!(empty.match_count(), 0);
    }

    #[test]
    fn test_search_output_collects_in_order() {
        let mut output = SearchOutput::new();
        output.send(file_match("b.go", vec![range(0, 3, 0)]));
        output.send(file_match("a.go", vec![range(0, 3, 0), range(4, 6, 1)]));

        assert_eq!(output.paths(), vec!["b.go", "a.go"]);
        assert_eq!(output.total_matches, 3);
        assert_eq!(output.files_with_matches, 2);
    }

    #[test]
    fn test_channel_sender() {
        let (mut tx, rx) = crossbeam_channel::unbounded::<FileMatch>();
        MatchSender::send(&mut tx, file_match("a.go", vec![range(0, 1, 0)]));
        drop(tx);

        let received: Vec<FileMatch> = rx.iter().collect();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].path, "a.go");
    }

    #[test]
    fn test_channel_sender_with_dropped_receiver() {
        let (mut tx, rx) = crossbeam_channel::unbounded::<FileMatch>();
        drop(rx);
        // Must not panic
        MatchSender::send(&mut tx, file_match("a.go", vec![]));
    }

    #[test]
    fn test_file_match_serializes() {
        let fm = file_match("a.go", vec![range(0, 3, 2)]);
        let json = serde_json::to_string(&fm).unwrap();
        assert!(json.contains("\"path\":\"a.go\""));
        assert!(json.contains("\"content_start\""));
        let back: FileMatch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fm);
    }
}
