use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration.
///
/// # Configuration Locations
///
/// Sources are layered, later ones overriding earlier ones:
/// 1. Global `$CONFIG_DIR/structscout/config.yaml`
/// 2. Local `.structscout.yaml` in the current directory
/// 3. Custom config file specified via `--config`
/// 4. `STRUCTSCOUT_*` environment variables (e.g. `STRUCTSCOUT_COMBY_PATH`)
///
/// # Configuration Format
///
/// ```yaml
/// # comby executable, looked up on PATH when relative
/// comby_path: "comby"
///
/// # Worker processes comby may fork. Each one maps archive contents into
/// # memory, so this stays small. 0 runs comby sequentially.
/// num_workers: 4
///
/// # Narrow zip archives with a regex search before the structural pass
/// use_prefilter: true
///
/// # How often the driver checks the matcher for exit or cancellation
/// poll_interval_ms: 10
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Path to the comby executable
    #[serde(default = "default_comby_path")]
    pub comby_path: PathBuf,

    /// Number of worker processes comby may fork
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Whether structural searches over archives run the regex pre-filter
    #[serde(default = "default_use_prefilter")]
    pub use_prefilter: bool,

    /// Poll interval, in milliseconds, while waiting on the matcher process
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_comby_path() -> PathBuf {
    PathBuf::from("comby")
}

// Caps the number of forked processes to limit the size of archive contents
// mapped into memory at once.
fn default_num_workers() -> usize {
    4
}

fn default_use_prefilter() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            comby_path: default_comby_path(),
            num_workers: default_num_workers(),
            use_prefilter: default_use_prefilter(),
            poll_interval_ms: default_poll_interval_ms(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Loads configuration from the default locations plus a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let default_files = [
            dirs::config_dir().map(|p| p.join("structscout/config.yaml")),
            Some(PathBuf::from(".structscout.yaml")),
        ];
        for path in default_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicitly requested file must exist.
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix("STRUCTSCOUT"));

        builder.build()?.try_deserialize()
    }

    /// The matcher poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Merges CLI overrides on top of configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(path) = cli.comby_path {
            self.comby_path = path;
        }
        if let Some(workers) = cli.num_workers {
            self.num_workers = workers;
        }
        if cli.no_prefilter {
            self.use_prefilter = false;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub comby_path: Option<PathBuf>,
    pub num_workers: Option<usize>,
    pub no_prefilter: bool,
    pub log_level: Option<String>,
}
