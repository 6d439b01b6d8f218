/// Error types for structscout.
///
/// Every failure a search can hit is one variant of [`SearchError`], so callers
/// can tell a configuration problem (nothing was run) apart from a matcher that
/// died halfway through a streaming search (some results were already sent):
/// ```rust,ignore
/// match search(&ctx, request, &mut sender) {
///     Ok(summary) => // every match has been delivered,
///     Err(SearchError::InvalidPattern(msg)) => // nothing ran,
///     Err(SearchError::MatcherFailed { stderr, .. }) => // comby exited non-zero,
///     Err(e) => // other errors
/// }
/// ```
use std::process::ExitStatus;
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("Failed to set up {0} pipe for matcher process")]
    Pipe(&'static str),
    #[error("Matcher exited with {status}: {stderr}")]
    MatcherFailed { status: ExitStatus, stderr: String },
    #[error("Match range ending at offset {offset} does not fit in {path} ({len} bytes)")]
    MatchOutOfBounds {
        path: String,
        offset: usize,
        len: usize,
    },
    #[error("Archive error: {0}")]
    Archive(String),
    #[error("Search cancelled")]
    Cancelled,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for SearchError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e),
            other => Self::Archive(other.to_string()),
        }
    }
}

impl SearchError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    pub fn matcher_failed(status: ExitStatus, stderr: impl Into<String>) -> Self {
        Self::MatcherFailed {
            status,
            stderr: stderr.into(),
        }
    }

    pub fn out_of_bounds(path: impl Into<String>, offset: usize, len: usize) -> Self {
        Self::MatchOutOfBounds {
            path: path.into(),
            offset,
            len,
        }
    }

    pub fn archive_error(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Whether the error happened before any matcher process was started.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidPattern(_))
    }
}
