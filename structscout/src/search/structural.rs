use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::process::ChildStdin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use super::language::to_matcher;
use super::matcher::PatternInfo;
use super::SearchContext;
use crate::archive::{append_tar_entry, read_entry, TarEntry};
use crate::cancel::Cancellation;
use crate::chunk::{chunk_ranges, chunks_to_matches};
use crate::comby::{self, protocol, Args, Input, ResultKind};
use crate::errors::{SearchError, SearchResult};
use crate::results::{ChunkMatch, FileMatch, MatchSender};

/// Which files of the input comby should search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePatterns {
    /// Every file
    All,
    /// Only these paths
    Subset(Vec<String>),
}

impl FilePatterns {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::All => Vec::new(),
            Self::Subset(paths) => paths,
        }
    }
}

/// Runs a structural search with comby and sends every file with matches.
///
/// Zip input is searched in one batch and the matches are read back from the
/// archive; tar input is streamed to comby as entries arrive and results are
/// sent while comby is still running. Other inputs are rejected.
///
/// `extension_hint` picks the matcher when `info` names no language.
pub fn structural_search<S>(
    ctx: &SearchContext<'_>,
    info: &PatternInfo,
    input: Input,
    file_patterns: FilePatterns,
    extension_hint: &str,
    sender: &mut S,
) -> SearchResult<()>
where
    S: MatchSender + Send,
{
    let args = build_args(ctx, info, input, file_patterns, extension_hint);
    info!(
        "Structural search with matcher {} over {} input",
        args.matcher,
        args.input.kind()
    );

    match &args.input {
        Input::Tar(_) => run_comby_with_streaming(ctx, &args, sender),
        Input::ZipPath(_) => run_comby_with_collection(ctx, &args, sender),
        Input::DirPath(_) | Input::FileContent(_) => Err(SearchError::config_error(
            "comby input must be either -tar or -zip for structural search",
        )),
    }
}

/// Builds the comby arguments for a structural search of `input`
pub fn build_args(
    ctx: &SearchContext<'_>,
    info: &PatternInfo,
    input: Input,
    file_patterns: FilePatterns,
    extension_hint: &str,
) -> Args {
    let result_kind = match input {
        Input::Tar(_) => ResultKind::ChunkMatches,
        _ => ResultKind::MatchOnly,
    };

    Args {
        input,
        matcher: to_matcher(&info.languages, extension_hint, ctx.metrics),
        match_template: info.pattern.clone(),
        rewrite_template: String::new(),
        rule: info.comby_rule.clone(),
        file_patterns: file_patterns.into_vec(),
        num_workers: ctx.config.num_workers,
        result_kind,
    }
}

/// Streams tar input to comby and sends chunk results as comby prints them.
///
/// Entries are written from a separate thread while the calling thread's
/// reader forwards results, so neither pipe can fill up and stall the other.
pub fn run_comby_with_streaming<S>(
    ctx: &SearchContext<'_>,
    args: &Args,
    sender: &mut S,
) -> SearchResult<()>
where
    S: MatchSender + Send,
{
    let Input::Tar(events) = &args.input else {
        return Err(SearchError::config_error(format!(
            "streaming search needs tar input, got {}",
            args.input.kind()
        )));
    };

    let cancel = ctx.cancel;
    let poll_interval = ctx.config.poll_interval();
    let write_tar =
        |stdin: ChildStdin, exited: &AtomicBool| write_tar_stream(stdin, events, cancel, exited, poll_interval);

    let mut sent = 0usize;
    let forward = |line: &[u8]| match protocol::parse_file_match_with_chunks(line) {
        Ok(record) => {
            sent += 1;
            sender.send(comby_chunk_matches_to_file_match(record));
        }
        Err(e) => warn!(
            "Skipping unparsable matcher output line ({}): {}",
            e,
            String::from_utf8_lossy(line)
        ),
    };

    comby::process::run_with_pipes(
        &ctx.config.comby_path,
        args,
        cancel,
        poll_interval,
        Some(write_tar),
        forward,
    )?;

    debug!("Streaming structural search sent {} files", sent);
    Ok(())
}

/// Writes every entry received on `events` to comby as a tar stream, flushing
/// after each one so comby sees it without waiting for the next.
///
/// Stops early when the search is cancelled, comby exits or the pipe breaks.
/// Otherwise the archive is finished and stdin closed once `events` disconnects.
fn write_tar_stream(
    stdin: ChildStdin,
    events: &Receiver<TarEntry>,
    cancel: &Cancellation,
    exited: &AtomicBool,
    poll_interval: Duration,
) {
    let mut builder = tar::Builder::new(BufWriter::new(stdin));
    let mut written = 0usize;

    loop {
        if cancel.is_cancelled() || exited.load(Ordering::Relaxed) {
            debug!("Matcher input stopped after {} files", written);
            return;
        }
        match events.recv_timeout(poll_interval) {
            Ok(entry) => match append_tar_entry(&mut builder, &entry)
                .and_then(|()| builder.get_mut().flush())
            {
                Ok(()) => written += 1,
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    debug!("Matcher closed its input after {} files", written);
                    return;
                }
                Err(e) => warn!("Failed to write {} to matcher, skipping: {}", entry.path, e),
            },
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    match builder.into_inner() {
        Ok(mut writer) => {
            if let Err(e) = writer.flush() {
                debug!("Failed to flush matcher input: {}", e);
            }
        }
        Err(e) => debug!("Failed to finish tar stream: {}", e),
    }
    debug!("Wrote {} files to matcher", written);
}

/// Runs comby over a zip archive on disk, then reads each matched file back
/// from the archive to build its chunks.
///
/// A record that cannot be converted is logged and its file skipped; the
/// remaining files are still sent, in comby's order.
pub fn run_comby_with_collection<S>(
    ctx: &SearchContext<'_>,
    args: &Args,
    sender: &mut S,
) -> SearchResult<()>
where
    S: MatchSender,
{
    let Input::ZipPath(zip_path) = &args.input else {
        return Err(SearchError::config_error(format!(
            "batch search needs zip input, got {}",
            args.input.kind()
        )));
    };

    let records = comby::process::matches(
        &ctx.config.comby_path,
        args,
        ctx.cancel,
        ctx.config.poll_interval(),
    )?;
    debug!("Matcher reported matches in {} files", records.len());
    if records.is_empty() {
        return Ok(());
    }

    let mut archive = ZipArchive::new(BufReader::new(File::open(zip_path)?))?;
    for record in &records {
        if ctx.cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        match to_file_match(&mut archive, record) {
            Ok(file_match) => sender.send(file_match),
            Err(e) => warn!("Skipping matches in {}: {}", record.uri, e),
        }
    }
    Ok(())
}

/// Converts a `-match-only` record into a [`FileMatch`], reading the file from
/// `archive` to fill in whole-line chunk content.
///
/// Fails with [`SearchError::MatchOutOfBounds`] when a range does not fit in
/// the file.
pub fn to_file_match<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    record: &protocol::FileMatch,
) -> SearchResult<FileMatch> {
    let content = read_entry(archive, &record.uri)?;
    let len = content.len();

    let mut ranges = Vec::with_capacity(record.matches.len());
    for m in &record.matches {
        let (start, end) = (m.range.start.offset, m.range.end.offset);
        if start > len || end > len {
            return Err(SearchError::out_of_bounds(&record.uri, start.max(end), len));
        }
        ranges.push(m.range.to_range());
    }

    Ok(FileMatch {
        path: record.uri.clone(),
        chunk_matches: chunks_to_matches(&content, chunk_ranges(ranges, 0)),
        limit_hit: false,
    })
}

/// Converts a `-chunk-matches` record; comby already built the chunks
pub fn comby_chunk_matches_to_file_match(record: protocol::FileMatchWithChunks) -> FileMatch {
    FileMatch {
        path: record.uri,
        chunk_matches: record
            .chunk_matches
            .into_iter()
            .map(|chunk| ChunkMatch {
                content_start: chunk.start.to_location(),
                ranges: chunk.ranges.iter().map(protocol::Range::to_range).collect(),
                content: chunk.content,
            })
            .collect(),
        limit_hit: false,
    }
}
