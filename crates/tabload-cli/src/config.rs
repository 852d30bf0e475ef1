use std::path::PathBuf;

use clap::Parser;

/// CLI configuration for the loader.
#[derive(Parser, Debug, Clone)]
#[command(name = "tabload", about = "Schema-inferring bulk loader for delimited extracts")]
pub struct Config {
    /// Base URL of the tabular store.
    #[arg(long, default_value = "http://localhost:8000", env = "TABLOAD_STORE_URL")]
    pub store_url: String,

    /// Service-role key for the store. Omit for unauthenticated local stores.
    #[arg(long, env = "TABLOAD_SERVICE_KEY", hide_env_values = true)]
    pub service_key: Option<String>,

    /// Input: a .zip archive of extracts, or a directory of loose .txt files.
    #[arg(long, default_value = "input", env = "TABLOAD_INPUT")]
    pub input: PathBuf,

    /// Archive-specific description-file directory. Checked first;
    /// falls back to --desc-dir when missing or empty.
    #[arg(long)]
    pub archive_desc_dir: Option<PathBuf>,

    /// Shared description-file directory.
    #[arg(long, default_value = "descriptions", env = "TABLOAD_DESC_DIR")]
    pub desc_dir: PathBuf,

    /// Period suffix for table names (e.g. 2024_03).
    /// Derived from the input name when omitted.
    #[arg(long)]
    pub period: Option<String>,

    /// Loader tunables file (TOML). Defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info", env = "TABLOAD_LOG")]
    pub log_level: String,

    /// Log file path.
    #[arg(long, default_value = "logs/tabload.log")]
    pub log_file: PathBuf,

    /// Suppress console logging (file logging stays on).
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}
