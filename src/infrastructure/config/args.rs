use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "slotfetch",
    version,
    about = "Load a photo manifest into recycled slots and report fetch results",
    long_about = None
)]
pub struct CliArgs {
    /// Photo manifest (JSON with a `photos` array of `id` / `img_src`).
    #[arg(short, long, value_name = "PATH")]
    pub manifest: PathBuf,

    /// Number of visible slots.
    #[arg(long, default_value_t = 6)]
    pub slots: usize,

    /// Number of pages to scroll through. Defaults to the whole manifest.
    #[arg(long)]
    pub pages: Option<usize>,

    /// Delay between pages in milliseconds.
    #[arg(long, default_value_t = 250)]
    pub scroll_delay_ms: u64,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Request timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Maximum concurrent transfers.
    #[arg(long)]
    pub max_concurrent_transfers: Option<usize>,

    /// Upgrade http URLs to https.
    #[arg(long)]
    pub force_https: Option<bool>,

    /// Downscale images wider than this (0 disables).
    #[arg(long)]
    pub thumbnail_max_width: Option<u32>,
}
