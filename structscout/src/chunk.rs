use crate::results::{ChunkMatch, Location, Range};

/// A set of adjacent ranges.
///
/// `cover` is the smallest range containing every range in `ranges`:
/// `cover.start` is the minimum start and `cover.end` the maximum end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeChunk {
    pub cover: Range,
    pub ranges: Vec<Range>,
}

impl RangeChunk {
    fn new(range: Range) -> Self {
        Self {
            cover: range,
            ranges: vec![range],
        }
    }
}

/// Groups ranges into chunks of adjacent ranges.
///
/// `inter_chunk_lines` is the minimum number of lines allowed between chunks.
/// Two ranges whose lines are closer than that end up in the same chunk, so
/// with `inter_chunk_lines == 0` only ranges that share a line are merged and
/// ranges on two adjacent lines come back as two chunks.
///
/// The returned chunks are ordered by start offset and for every pair of
/// neighbours `chunks[i].cover.end.line + inter_chunk_lines < chunks[i + 1].cover.start.line`.
pub fn chunk_ranges(mut ranges: Vec<Range>, inter_chunk_lines: u32) -> Vec<RangeChunk> {
    ranges.sort_by_key(|r| r.start.offset);

    let mut chunks: Vec<RangeChunk> = Vec::new();
    for range in ranges {
        match chunks.last_mut() {
            Some(last)
                if u64::from(last.cover.end.line) + u64::from(inter_chunk_lines)
                    >= u64::from(range.start.line) =>
            {
                last.ranges.push(range);
                // Ranges arrive in start order, so only the end can grow.
                if range.end.offset > last.cover.end.offset {
                    last.cover.end = range.end;
                }
            }
            _ => chunks.push(RangeChunk::new(range)),
        }
    }
    chunks
}

/// Expands every chunk to whole lines of `buf` and builds its [`ChunkMatch`].
///
/// The content runs from the byte after the last newline before the chunk (or
/// the start of the file) up to the first newline at or after the chunk's end
/// (or the end of the file).
pub fn chunks_to_matches(buf: &[u8], chunks: Vec<RangeChunk>) -> Vec<ChunkMatch> {
    chunks
        .into_iter()
        .map(|chunk| {
            let start = (chunk.cover.start.offset as usize).min(buf.len());
            let end = (chunk.cover.end.offset as usize).clamp(start, buf.len());

            let first_line_start = memrchr_newline(&buf[..start]).map_or(0, |off| off + 1);
            let last_line_end = memchr_newline(&buf[end..]).map_or(buf.len(), |off| end + off);

            ChunkMatch {
                content: String::from_utf8_lossy(&buf[first_line_start..last_line_end])
                    .into_owned(),
                content_start: Location {
                    offset: first_line_start as u32,
                    line: chunk.cover.start.line,
                    column: 0,
                },
                ranges: chunk.ranges,
            }
        })
        .collect()
}

fn memrchr_newline(haystack: &[u8]) -> Option<usize> {
    haystack.iter().rposition(|&b| b == b'\n')
}

fn memchr_newline(haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| b == b'\n')
}
