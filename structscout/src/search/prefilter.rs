use std::path::Path;
use tracing::{debug, info};

use super::matcher::{PatternInfo, PatternMatcher};
use super::processor::regex_match_paths;
use super::structural::{structural_search, FilePatterns};
use super::SearchContext;
use crate::archive::ZipFile;
use crate::comby::pattern::structural_pat_to_regexp_query;
use crate::comby::Input;
use crate::errors::{SearchError, SearchResult};
use crate::results::MatchSender;

/// Files of `zip` the structural pattern in `info` could match, and the
/// extension of the first one.
///
/// The structural pattern is approximated by a regex (see
/// [`structural_pat_to_regexp_query`]) that never rejects a file comby would
/// match. Word matching is dropped since a template may end in punctuation.
/// The include/exclude filters and the limit of `info` apply unchanged.
pub fn prefilter_candidates(
    ctx: &SearchContext<'_>,
    zip: &ZipFile,
    info: &PatternInfo,
) -> SearchResult<(Vec<String>, String)> {
    if zip.is_empty() {
        debug!("Archive is empty, no pre-filter candidates");
        return Ok((Vec::new(), String::new()));
    }

    let regex_info = PatternInfo {
        pattern: structural_pat_to_regexp_query(&info.pattern, false),
        is_regexp: true,
        is_structural: false,
        is_word_match: false,
        ..info.clone()
    };
    debug!("Structural pre-filter regex: {}", regex_info.pattern);

    let matcher = PatternMatcher::compile(&regex_info)
        .map_err(|e| SearchError::config_error(format!("structural pre-filter: {}", e)))?;
    let (paths, _) = regex_match_paths(&matcher, zip, info.limit, ctx.cancel)?;
    let extension_hint = paths
        .first()
        .map(|path| extension_of(path))
        .unwrap_or_default();
    Ok((paths, extension_hint))
}

/// Runs a structural search over `zip`, narrowed to the files the regex
/// pre-filter lets through.
///
/// When no file passes, comby is not started at all and the search succeeds
/// with no results.
pub fn filtered_structural_search<S>(
    ctx: &SearchContext<'_>,
    zip_path: &Path,
    zip: &ZipFile,
    info: &PatternInfo,
    sender: &mut S,
) -> SearchResult<()>
where
    S: MatchSender + Send,
{
    let (paths, extension_hint) = prefilter_candidates(ctx, zip, info)?;
    if paths.is_empty() {
        info!("Structural pre-filter matched no files, skipping matcher");
        ctx.metrics.record_prefilter_skip();
        return Ok(());
    }

    debug!(
        "Structural pre-filter narrowed {} files to {}",
        zip.len(),
        paths.len()
    );
    structural_search(
        ctx,
        info,
        Input::ZipPath(zip_path.to_path_buf()),
        FilePatterns::Subset(paths),
        &extension_hint,
        sender,
    )
}

/// `.go` for `cmd/main.go`; empty when the file name has no extension
fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
