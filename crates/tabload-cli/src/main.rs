//! tabload: batch loader for archives of delimited extracts.
//!
//! One extract is read, schema-resolved, and loaded to completion
//! before the next begins; the run always finishes, and anything
//! skipped or partial is in the log.

mod archive;
mod config;
mod logging;

use anyhow::Context;
use clap::Parser;

use tabload_core::{Catalogue, CoreError, Engine, LoaderConfig, ReportStatus};
use tabload_link::{RestClient, StoreAuth};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = config::Config::parse();
    logging::init_logging(&cli.log_level, &cli.log_file, !cli.quiet)?;

    let loader_config = match &cli.config {
        Some(path) => LoaderConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => LoaderConfig::default(),
    };

    let input_name = cli
        .input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let period = cli.period.clone().or_else(|| archive::period_from_name(&input_name));
    match &period {
        Some(period) => log::info!("loading period {}", period),
        None => log::warn!(
            "no period found in input name {:?}; table names get no period suffix",
            input_name
        ),
    }

    let catalogue = Catalogue::load_with_fallback(
        cli.archive_desc_dir.as_deref(),
        &cli.desc_dir,
        &loader_config.description_files,
    );

    let auth = match &cli.service_key {
        Some(key) => StoreAuth::service_key(key),
        None => StoreAuth::none(),
    };
    let client = RestClient::builder()
        .base_url(&cli.store_url)
        .auth(auth)
        .timeout(loader_config.request_timeout())
        .build()
        .context("building store client")?;

    let extracts = if cli.input.is_dir() {
        archive::read_directory(&cli.input)?
    } else {
        archive::read_zip(&cli.input)?
    };
    if extracts.is_empty() {
        log::warn!("no extracts found in {}", cli.input.display());
        return Ok(());
    }

    let engine = Engine::new(&client, &catalogue, loader_config);

    let total = extracts.len();
    let mut loaded = 0usize;
    let mut skipped = 0usize;
    let mut partial = 0usize;
    let mut failed = 0usize;

    for (idx, raw) in extracts.iter().enumerate() {
        log::info!("[{}/{}] processing {}", idx + 1, total, raw.file_name);
        match engine
            .process_extract(&raw.bytes, &raw.file_name, period.as_deref())
            .await
        {
            Ok(report) => match report.status() {
                ReportStatus::Loaded => {
                    loaded += 1;
                    log::info!(
                        "{}: loaded {} rows into {}",
                        raw.file_name,
                        report.result.inserted,
                        report.table
                    );
                }
                ReportStatus::Skipped => {
                    skipped += 1;
                    log::info!(
                        "{}: table {} already populated, skipped",
                        raw.file_name,
                        report.table
                    );
                }
                ReportStatus::Partial => {
                    partial += 1;
                    log::error!(
                        "{}: {} chunks failed loading {} ({} rows inserted)",
                        raw.file_name,
                        report.result.failed_batches.len(),
                        report.table,
                        report.result.inserted
                    );
                }
            },
            Err(CoreError::ParseFailure { file, reason, sample }) => {
                failed += 1;
                log::error!("skipping {}: {}", file, reason);
                log::error!("content sample: {:?}", sample);
            }
            Err(err) => {
                failed += 1;
                log::error!("{} failed: {}", raw.file_name, err);
            }
        }
    }

    log::info!(
        "run complete: {} loaded, {} skipped, {} partial, {} failed of {} extracts",
        loaded,
        skipped,
        partial,
        failed,
        total
    );
    println!(
        "{} loaded, {} skipped, {} partial, {} failed of {} extracts; see {} for detail",
        loaded,
        skipped,
        partial,
        failed,
        total,
        cli.log_file.display()
    );

    Ok(())
}
