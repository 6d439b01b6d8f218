use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use colored::Colorize;
use crossbeam_channel::Sender;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::thread;
use structscout::{
    config::CliOverrides, search, Cancellation, FileMatch, MatchSender, MatcherMetrics,
    PatternInfo, SearchConfig, SearchContext, SearchInput, SearchRequest, SearchSummary, TarEntry,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Directory entries buffered between the walker and the matcher
const WALK_BUFFER: usize = 64;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file, layered over the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Parser)]
#[command(group(ArgGroup::new("input").required(true).args(["zip", "dir"])))]
struct CliSearchArgs {
    /// Pattern to search for
    #[arg(short = 'p', long)]
    pattern: String,

    /// Zip archive to search
    #[arg(short = 'z', long)]
    zip: Option<PathBuf>,

    /// Directory to search; files are streamed to comby (structural only)
    #[arg(short = 'd', long)]
    dir: Option<PathBuf>,

    /// Treat the pattern as a comby match template
    #[arg(short = 's', long, conflicts_with = "regex")]
    structural: bool,

    /// Treat the pattern as a regular expression
    #[arg(short = 'r', long)]
    regex: bool,

    /// Match case exactly
    #[arg(short = 'c', long)]
    case_sensitive: bool,

    /// Match whole words only
    #[arg(short = 'w', long)]
    word: bool,

    /// Language of the files; selects comby's matcher
    #[arg(short = 'l', long = "language")]
    languages: Vec<String>,

    /// comby rule applied to structural matches
    #[arg(long)]
    rule: Option<String>,

    /// Only search paths matching this regex (can be specified multiple times)
    #[arg(short = 'i', long)]
    include: Vec<String>,

    /// Skip paths matching this regex
    #[arg(short = 'e', long)]
    exclude: Option<String>,

    /// Match path filters case-sensitively
    #[arg(long)]
    path_case_sensitive: bool,

    /// Stop after this many files with matches (0 for unlimited)
    #[arg(long, default_value = "0")]
    limit: usize,

    /// Path to the comby executable
    #[arg(long)]
    comby: Option<PathBuf>,

    /// Number of comby worker processes (0 runs comby sequentially)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Run comby over the whole archive instead of pre-filtering with a regex
    #[arg(long)]
    no_prefilter: bool,

    /// Print one JSON object per file instead of text
    #[arg(long)]
    json: bool,

    /// Show only statistics, not matches
    #[arg(long)]
    stats: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search an archive or directory
    Search(Box<CliSearchArgs>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search(args) => {
            let config = SearchConfig::load_from(cli.config.as_deref())
                .context("Failed to load configuration")?
                .merge_with_cli(CliOverrides {
                    comby_path: args.comby.clone(),
                    num_workers: args.workers,
                    no_prefilter: args.no_prefilter,
                    log_level: cli.log_level,
                });
            init_logging(&config.log_level);
            run_search(&config, *args)
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_search(config: &SearchConfig, args: CliSearchArgs) -> Result<()> {
    let pattern = PatternInfo {
        pattern: args.pattern,
        is_regexp: args.regex,
        is_structural: args.structural,
        is_case_sensitive: args.case_sensitive,
        is_word_match: args.word,
        comby_rule: args.rule,
        languages: args.languages,
        include_patterns: args.include,
        exclude_pattern: args.exclude,
        path_patterns_are_case_sensitive: args.path_case_sensitive,
        limit: args.limit,
    };

    let metrics = MatcherMetrics::new();
    let cancel = Cancellation::new();
    let ctx = SearchContext::new(config, &metrics, &cancel);
    let mut printer = Printer {
        json: args.json,
        stats_only: args.stats,
    };

    let summary = match (args.zip, args.dir) {
        (Some(zip), _) => search(
            &ctx,
            SearchRequest {
                pattern,
                input: SearchInput::Archive(zip),
            },
            &mut printer,
        )?,
        (None, root) => {
            let root = root.context("One of --zip or --dir is required")?;
            let (events, rx) = crossbeam_channel::bounded(WALK_BUFFER);
            let walker = thread::spawn(move || walk_directory(&root, &events));
            let result = search(
                &ctx,
                SearchRequest {
                    pattern,
                    input: SearchInput::Stream(rx),
                },
                &mut printer,
            );
            if walker.join().is_err() {
                warn!("Directory walker panicked");
            }
            result?
        }
    };

    metrics.log_stats();
    if !args.json {
        print_summary(&summary);
    }
    Ok(())
}

/// Sends every file under `root` that is not ignored, with its path relative
/// to `root`. Stops early once the search stops receiving.
fn walk_directory(root: &Path, events: &Sender<TarEntry>) {
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build();

    let mut sent = 0usize;
    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        if events.send(TarEntry::new(relative, content)).is_err() {
            debug!("Search stopped receiving files after {}", sent);
            return;
        }
        sent += 1;
    }
    debug!("Walked {} files under {}", sent, root.display());
}

/// Prints results as they arrive
struct Printer {
    json: bool,
    stats_only: bool,
}

impl MatchSender for Printer {
    fn send(&mut self, file_match: FileMatch) {
        if self.stats_only {
            return;
        }
        if self.json {
            match serde_json::to_string(&file_match) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize matches for {}: {}", file_match.path, e),
            }
            return;
        }

        println!("\n{}", file_match.path.blue());
        for chunk in &file_match.chunk_matches {
            for (i, line) in chunk.content.split('\n').enumerate() {
                let line_number = chunk.content_start.line as usize + i + 1;
                println!("{}: {}", line_number.to_string().green(), line);
            }
        }
    }
}

fn print_summary(summary: &SearchSummary) {
    println!(
        "\nFound {} matches in {} files",
        summary.matches, summary.files
    );
    if summary.limit_hit {
        println!("{}", "Result limit reached; more files may match".yellow());
    }
}
