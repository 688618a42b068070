use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use slotfetch::application::{FetchCoordinator, FetchPipeline};
use slotfetch::infrastructure::{
    AppConfig, CliArgs, ImageDecoder, ReqwestTransport, StorageManager, load_manifest,
};
use slotfetch::presentation::{ScrollSimulation, SlotBinder, SlotTable};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(config.log_level.to_tracing_level()).into())
        .from_env_lossy();

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), level = %config.log_level, "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

/// Pages forward through the manifest, then back to the top.
fn scroll_pages(item_count: usize, slots: usize, limit: Option<usize>) -> Vec<usize> {
    let total = item_count.div_ceil(slots.max(1)).max(1);
    let forward = limit.map_or(total, |limit| limit.clamp(1, total));
    (0..forward).chain((0..forward.saturating_sub(1)).rev()).collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = slotfetch::VERSION, "Starting {}", slotfetch::NAME);

    let photos = load_manifest(&args.manifest)
        .await
        .wrap_err_with(|| format!("Failed to load manifest {}", args.manifest.display()))?;
    info!(count = photos.len(), "Loaded manifest");

    let slots = Arc::new(SlotTable::new());
    let transport = Arc::new(ReqwestTransport::new(&config.fetch)?);
    let decoder = Arc::new(ImageDecoder::from_config(&config.decode));
    let pipeline = FetchPipeline::from_config(transport, decoder, &config.fetch);
    let coordinator = Arc::new(FetchCoordinator::new(pipeline, slots.clone()));

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let binder = SlotBinder::new(coordinator.clone(), slots, event_tx);

    let pages = scroll_pages(photos.len(), args.slots, args.pages);
    let simulation = ScrollSimulation::new(
        binder,
        event_rx,
        args.slots,
        Duration::from_millis(args.scroll_delay_ms),
    );
    let settle_timeout = Duration::from_secs(config.fetch.timeout_secs.saturating_add(1));

    let report = simulation.run(&photos, &pages, settle_timeout).await;

    println!("{report}");
    println!("{}", coordinator.cache_stats());

    Ok(())
}
