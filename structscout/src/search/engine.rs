use crossbeam_channel::Receiver;
use std::path::PathBuf;
use tracing::{debug, info};

use super::matcher::{PatternInfo, PatternMatcher};
use super::prefilter::filtered_structural_search;
use super::processor::regex_search_batch;
use super::structural::{structural_search, FilePatterns};
use super::SearchContext;
use crate::archive::{TarEntry, ZipFile};
use crate::comby::Input;
use crate::errors::{SearchError, SearchResult};
use crate::results::{FileMatch, MatchSender};

/// Where the files to search come from
#[derive(Debug)]
pub enum SearchInput {
    /// A zip archive on disk
    Archive(PathBuf),
    /// Files sent one at a time; the search ends when the sender is dropped
    Stream(Receiver<TarEntry>),
}

/// A pattern and the files to search with it
#[derive(Debug)]
pub struct SearchRequest {
    pub pattern: PatternInfo,
    pub input: SearchInput,
}

/// Totals over everything a search sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchSummary {
    /// Files sent
    pub files: usize,
    /// Match ranges across all files sent
    pub matches: usize,
    /// Whether the file limit cut the results short
    pub limit_hit: bool,
}

/// Counts what passes through to the caller's sender
struct CountingSender<'s, S> {
    inner: &'s mut S,
    summary: SearchSummary,
}

impl<S: MatchSender> MatchSender for CountingSender<'_, S> {
    fn send(&mut self, file_match: FileMatch) {
        self.summary.files += 1;
        self.summary.matches += file_match.match_count();
        self.summary.limit_hit |= file_match.limit_hit;
        self.inner.send(file_match);
    }
}

/// Runs one search request and sends every file with matches to `sender`.
///
/// Structural patterns are searched with comby: archives in one batch (after
/// the regex pre-filter unless it is disabled) and streams as they arrive.
/// Literal and regex patterns are searched in-process and need an archive.
pub fn search<S>(
    ctx: &SearchContext<'_>,
    request: SearchRequest,
    sender: &mut S,
) -> SearchResult<SearchSummary>
where
    S: MatchSender + Send,
{
    let SearchRequest { pattern, input } = request;
    if pattern.pattern.is_empty() {
        return Err(SearchError::invalid_pattern("pattern must not be empty"));
    }

    info!(
        "Starting {} search for {:?}",
        if pattern.is_structural {
            "structural"
        } else if pattern.is_regexp {
            "regex"
        } else {
            "literal"
        },
        pattern.pattern
    );

    let mut counting = CountingSender {
        inner: sender,
        summary: SearchSummary::default(),
    };

    match (pattern.is_structural, input) {
        (true, SearchInput::Archive(path)) if ctx.config.use_prefilter => {
            let zip = ZipFile::open(&path)?;
            filtered_structural_search(ctx, &path, &zip, &pattern, &mut counting)?;
        }
        (true, SearchInput::Archive(path)) => {
            debug!("Pre-filter disabled, searching every file of {}", path.display());
            structural_search(
                ctx,
                &pattern,
                Input::ZipPath(path),
                FilePatterns::All,
                "",
                &mut counting,
            )?;
        }
        (true, SearchInput::Stream(events)) => {
            structural_search(
                ctx,
                &pattern,
                Input::Tar(events),
                FilePatterns::All,
                "",
                &mut counting,
            )?;
        }
        (false, SearchInput::Archive(path)) => {
            let matcher = PatternMatcher::compile(&pattern)?;
            let zip = ZipFile::open(&path)?;
            let (file_matches, limit_hit) = regex_search_batch(&matcher, &zip, pattern.limit, ctx.cancel)?;
            for file_match in file_matches {
                counting.send(file_match);
            }
            counting.summary.limit_hit |= limit_hit;
        }
        (false, SearchInput::Stream(_)) => {
            return Err(SearchError::config_error(
                "regex and literal searches need an archive input",
            ));
        }
    }

    let summary = counting.summary;
    info!(
        "Search complete. Found {} matches in {} files",
        summary.matches, summary.files
    );
    Ok(summary)
}
