/// Search drivers.
///
/// A request is dispatched by [`engine::search`] to one of three paths:
///
/// 1. **Regex search** ([`processor`]): literal and regex patterns are matched
///    in-process over every file of a zip archive with rayon.
/// 2. **Structural batch search** ([`structural::run_comby_with_collection`]):
///    comby searches a zip archive on disk, usually narrowed first by the
///    regex pre-filter ([`prefilter`]) to the files that could possibly match.
/// 3. **Structural streaming search** ([`structural::run_comby_with_streaming`]):
///    files arrive over a channel and are written to comby as a tar stream while
///    results are read back concurrently.
///
/// Every path reports results through a [`crate::results::MatchSender`], one
/// complete file at a time.
pub mod engine;
pub mod language;
pub mod matcher;
pub mod prefilter;
pub mod processor;
pub mod structural;

use crate::cancel::Cancellation;
use crate::config::SearchConfig;
use crate::metrics::MatcherMetrics;

pub use engine::{search, SearchInput, SearchRequest, SearchSummary};
pub use matcher::{PatternInfo, PatternMatcher};
pub use processor::{regex_match_paths, regex_search_batch};
pub use structural::{structural_search, FilePatterns};

/// Everything a search needs besides the request itself
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    pub config: &'a SearchConfig,
    pub metrics: &'a MatcherMetrics,
    pub cancel: &'a Cancellation,
}

impl<'a> SearchContext<'a> {
    pub fn new(config: &'a SearchConfig, metrics: &'a MatcherMetrics, cancel: &'a Cancellation) -> Self {
        Self {
            config,
            metrics,
            cancel,
        }
    }
}
