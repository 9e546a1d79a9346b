//! `album-sync`: add local photo folders to Google Photos albums in Drive
//!
//! Each directory argument becomes an album named after the directory.
//! Files already stored in Drive are linked into the album by content hash;
//! files Drive does not have are listed as not found.

use anyhow::Context;
use bridge_traits::storage::RemoteStore;
use clap::{ArgAction, Parser};
use core_auth::{AuthManager, ClientSecret, StdioPrompt};
use core_runtime::config::{CoreConfig, RefreshOrdering, MAX_PAGE_SIZE};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use core_sync::{FileOutcome, SyncConfig, SyncCoordinator, SyncReport};
use provider_google_drive::GoogleDriveConnector;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "album-sync",
    version,
    about = "Link local photo folders into Google Photos albums without re-uploading"
)]
struct Cli {
    /// Directories to sync; each one maps to the album with its base name
    directories: Vec<PathBuf>,

    /// Content cache location
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Stored OAuth credentials
    #[arg(long)]
    credentials_file: Option<PathBuf>,

    /// OAuth client secret downloaded from the Google console
    #[arg(long)]
    client_secret: Option<PathBuf>,

    /// Read the whole remote listing instead of stopping at cached files
    #[arg(long)]
    full_rescan: bool,

    /// Report what would be created or linked without changing Drive
    #[arg(long)]
    dry_run: bool,

    /// Files requested per listing call
    #[arg(
        long,
        default_value_t = MAX_PAGE_SIZE,
        value_parser = clap::value_parser!(u32).range(1..=MAX_PAGE_SIZE as i64)
    )]
    page_size: u32,

    /// Log output format: pretty, json or compact
    #[arg(long, default_value = "compact")]
    log_format: LogFormat,

    /// More log output; repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(cli.log_format)
            .with_level(LogLevel::Info.raised_by(cli.verbose)),
    )
    .context("failed to initialise logging")?;

    let ordering = if cli.full_rescan {
        RefreshOrdering::Exhaustive
    } else {
        RefreshOrdering::DescendingCreation
    };

    let mut builder = CoreConfig::builder()
        .page_size(cli.page_size)
        .refresh_ordering(ordering)
        .dry_run(cli.dry_run);
    if let Some(path) = cli.cache_file {
        builder = builder.cache_file(path);
    }
    if let Some(path) = cli.credentials_file {
        builder = builder.credentials_file(path);
    }
    if let Some(path) = cli.client_secret {
        builder = builder.client_secret_file(path);
    }
    let config = builder.build().context("invalid configuration")?;

    let secret = config
        .file_system
        .read_file(&config.client_secret_file)
        .await
        .with_context(|| {
            format!(
                "unable to read client secret file {}",
                config.client_secret_file.display()
            )
        })?;
    let oauth = ClientSecret::from_json(&secret)
        .context("unable to parse client secret file")?
        .into_oauth_config();

    let auth = AuthManager::new(
        oauth,
        config.http_client.clone(),
        config.secure_store.clone(),
    );
    let access_token = auth
        .access_token(&StdioPrompt)
        .await
        .context("authorization failed")?;

    let store: Arc<dyn RemoteStore> = Arc::new(GoogleDriveConnector::new(
        config.http_client.clone(),
        access_token,
    ));
    let coordinator = SyncCoordinator::new(
        store,
        config.file_system.clone(),
        SyncConfig::from_core(&config),
    );

    let report = coordinator.run(&cli.directories).await?;
    print_not_found(&report);

    if report.dry_run {
        info!(
            would_link = report.total_linked(),
            would_create = report.albums_created.len(),
            "Dry run, Drive was not modified"
        );
    }
    Ok(())
}

fn print_not_found(report: &SyncReport) {
    let missing = report
        .directories
        .iter()
        .flat_map(|d| &d.files)
        .filter(|f| f.outcome == FileOutcome::NotFound);

    for file in missing {
        if let Some(hash) = &file.content_hash {
            println!("\"{}\": {} not found", file.path.display(), hash);
        }
    }
}
