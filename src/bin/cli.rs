//! Ad Rotator CLI
//!
//! Local entry point: rotates ads on the terminal and administers the
//! persisted records.

use std::path::PathBuf;
use std::sync::Arc;

use ad_rotator::{
    AdRotator,
    display::{
        ConsoleSurface, DisplayEvent, DisplayEventSender, HeadlessSurface, HtmlFileSurface,
        MirroredSurface,
    },
    error::{AppError, Result},
    models::{Config, NewAd},
    rotator::RotatorHandle,
    services::parse_document,
    storage::{KeyValueStore, LocalStore},
};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep_until};

/// Ad Rotator - rotating promotional cards
#[derive(Parser, Debug)]
#[command(name = "ad-rotator", version, about = "Rotating VIP ad display")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "ad-rotator.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and rotate ads; reads enter/leave/click/refresh/stats/next/quit from stdin
    Run {
        /// Stop after this many rotations
        #[arg(long)]
        ticks: Option<u32>,

        /// Also write the current card to <dir>/<region>.html
        #[arg(long)]
        html_dir: Option<PathBuf>,
    },

    /// Print the active list
    List,

    /// Print record statistics as JSON
    Stats,

    /// Add a record and print its id
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        image: String,
        #[arg(long, default_value = "")]
        desc: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long = "type", default_value = "")]
        ad_type: String,
        /// Expiry date, e.g. 2026-12-31
        #[arg(long)]
        expiry: Option<String>,
    },

    /// Remove a record by id
    Remove { id: String },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging; `--verbose` wins over the configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, load_error) = match Config::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_logging(cli.verbose, &config.logging.level);
    if let Some(e) = load_error {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(LocalStore::new(&config.store.dir));
    log::debug!("Store directory: {}", config.store.dir.display());

    match cli.command {
        Command::Run { ticks, html_dir } => {
            config.validate()?;
            let mut surface = MirroredSurface::new(Box::new(ConsoleSurface::new(
                config.display.region.clone(),
            )));
            if let Some(dir) = html_dir {
                let file = HtmlFileSurface::new(dir, config.display.region.clone());
                log::info!("Writing cards to {}", file.path().display());
                surface = surface.with(Box::new(file));
            }

            let stop_at = ticks.map(|n| {
                // Small margin so the last rotation lands before shutdown
                Instant::now() + config.rotation.interval() * n + Duration::from_millis(250)
            });

            let rotator = AdRotator::from_config(config, store, Box::new(surface))?;
            let (events, events_rx) = mpsc::channel(16);
            let (handle, task) = rotator.spawn(events_rx);

            run_interactive(&handle, &events, stop_at).await?;

            handle.shutdown().await?;
            task.await
                .map_err(|e| AppError::config(format!("rotator task failed: {e}")))?;
        }

        Command::List => {
            let mut rotator = headless(config, store)?;
            rotator.load().await;
            for ad in rotator.ads() {
                println!(
                    "{:<20} {:<32} clicks={:<5} expiry={}",
                    ad.id,
                    ad.title,
                    ad.clicks,
                    ad.expiry.as_deref().unwrap_or("-")
                );
            }
            log::info!("{} active ads", rotator.ads().len());
        }

        Command::Stats => {
            let mut rotator = headless(config, store)?;
            rotator.load().await;
            let stats = rotator.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Command::Add {
            title,
            image,
            desc,
            phone,
            ad_type,
            expiry,
        } => {
            let mut rotator = headless(config, store)?;
            let id = rotator
                .add(NewAd {
                    title,
                    desc,
                    image,
                    phone,
                    ad_type,
                    expiry,
                })
                .await?;
            println!("{id}");
        }

        Command::Remove { id } => {
            let mut rotator = headless(config, store)?;
            rotator.load().await;
            if rotator.remove(&id).await? {
                log::info!("Removed {}", id);
            } else {
                log::warn!("No ad with id {}", id);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            let bundled = &config.sources.bundled_path;
            if bundled.exists() {
                let records = parse_document(&tokio::fs::read(bundled).await?, "bundled")?;
                let valid = records.iter().filter(|ad| ad.is_valid()).count();
                log::info!(
                    "✓ {}: {} records ({} valid)",
                    bundled.display(),
                    records.len(),
                    valid
                );
            } else {
                log::warn!("Bundled file {} not found", bundled.display());
            }

            log::info!("All validations passed!");
        }
    }

    Ok(())
}

fn headless(config: Config, store: Arc<dyn KeyValueStore>) -> Result<AdRotator> {
    config.validate()?;
    AdRotator::from_config(config, store, Box::new(HeadlessSurface))
}

/// Forward stdin lines to the rotator until `quit`, end of input or `stop_at`.
async fn run_interactive(
    handle: &RotatorHandle,
    events: &DisplayEventSender,
    stop_at: Option<Instant>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = sleep_until(stop_at.unwrap_or_else(Instant::now)), if stop_at.is_some() => {
                log::info!("Tick limit reached");
                return Ok(());
            }

            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    if stop_at.is_none() {
                        return Ok(());
                    }
                    stdin_open = false;
                    continue;
                };

                let mut words = line.split_whitespace();
                let send_event = |event: DisplayEvent| async move {
                    events.send(event).await.map_err(|_| AppError::ControllerClosed)
                };

                match words.next() {
                    None => {}
                    Some("enter") => send_event(DisplayEvent::PointerEnter).await?,
                    Some("leave") => send_event(DisplayEvent::PointerLeave).await?,
                    Some("click") => {
                        let ad_id = match words.next() {
                            Some(id) => Some(id.to_string()),
                            None => handle.snapshot().await?.current_id().map(str::to_string),
                        };
                        match ad_id {
                            Some(ad_id) => send_event(DisplayEvent::Activate { ad_id }).await?,
                            None => log::warn!("Nothing on display to click"),
                        }
                    }
                    Some("refresh") => {
                        let outcome = handle.refresh().await?;
                        log::info!("Refresh: {:?}", outcome);
                    }
                    Some("stats") => {
                        let stats = handle.stats().await?;
                        println!("{}", serde_json::to_string_pretty(&stats)?);
                    }
                    Some("next") => handle.next().await?,
                    Some("quit") | Some("exit") => return Ok(()),
                    Some(other) => log::warn!("Unknown command: {}", other),
                }
            }
        }
    }
}
