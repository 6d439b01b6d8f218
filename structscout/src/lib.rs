pub mod archive;
pub mod cancel;
pub mod chunk;
pub mod comby;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod results;
pub mod search;

pub use archive::{TarEntry, ZipFile};
pub use cancel::Cancellation;
pub use config::SearchConfig;
pub use errors::{SearchError, SearchResult};
pub use metrics::MatcherMetrics;
pub use results::{ChunkMatch, FileMatch, Location, MatchSender, Range, SearchOutput};
pub use search::{
    search, PatternInfo, SearchContext, SearchInput, SearchRequest, SearchSummary,
};
