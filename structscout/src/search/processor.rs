use rayon::prelude::*;
use tracing::{debug, trace};

use super::matcher::PatternMatcher;
use crate::archive::{ArchiveFile, ZipFile};
use crate::cancel::Cancellation;
use crate::chunk::{chunk_ranges, chunks_to_matches};
use crate::errors::{SearchError, SearchResult};
use crate::results::FileMatch;

/// Searches every file of `zip` with a regex and returns the files with
/// matches, in archive order.
///
/// At most `limit` files are returned (0 means no limit); the flag is `true`
/// when more files matched than were returned.
pub fn regex_search_batch(
    matcher: &PatternMatcher,
    zip: &ZipFile,
    limit: usize,
    cancel: &Cancellation,
) -> SearchResult<(Vec<FileMatch>, bool)> {
    let mut file_matches: Vec<FileMatch> = zip
        .files()
        .par_iter()
        .filter_map(|file| {
            if cancel.is_cancelled() {
                return None;
            }
            search_file(matcher, file)
        })
        .collect();

    if cancel.is_cancelled() {
        return Err(SearchError::Cancelled);
    }

    let limit_hit = truncate_to_limit(&mut file_matches, limit);
    Ok((file_matches, limit_hit))
}

/// Paths of the files of `zip` the regex matches, in archive order.
///
/// Like [`regex_search_batch`] but stops at the first match in each file and
/// builds no ranges or chunks.
pub fn regex_match_paths(
    matcher: &PatternMatcher,
    zip: &ZipFile,
    limit: usize,
    cancel: &Cancellation,
) -> SearchResult<(Vec<String>, bool)> {
    let mut paths: Vec<String> = zip
        .files()
        .par_iter()
        .filter_map(|file| {
            if cancel.is_cancelled() || !matcher.matches_path(&file.path) {
                return None;
            }
            matcher.is_match(&file.data).then(|| file.path.clone())
        })
        .collect();

    if cancel.is_cancelled() {
        return Err(SearchError::Cancelled);
    }

    let limit_hit = truncate_to_limit(&mut paths, limit);
    Ok((paths, limit_hit))
}

/// Keeps the first `limit` items (all of them when `limit` is 0) and reports
/// whether any were dropped
fn truncate_to_limit<T>(items: &mut Vec<T>, limit: usize) -> bool {
    let limit_hit = limit > 0 && items.len() > limit;
    if limit_hit {
        debug!(
            "Regex search matched {} files, keeping the first {}",
            items.len(),
            limit
        );
        items.truncate(limit);
    }
    limit_hit
}

fn search_file(matcher: &PatternMatcher, file: &ArchiveFile) -> Option<FileMatch> {
    if !matcher.matches_path(&file.path) {
        trace!("Skipping {} (path filter)", file.path);
        return None;
    }

    let ranges = matcher.find_ranges(&file.data);
    if ranges.is_empty() {
        return None;
    }

    Some(FileMatch {
        path: file.path.clone(),
        chunk_matches: chunks_to_matches(&file.data, chunk_ranges(ranges, 0)),
        limit_hit: false,
    })
}
