//! weatherpoll - Current weather for one city in the terminal
//!
//! Polls the weather API on a fixed interval, reusing the cached response
//! while it is fresh and falling back to it when the network fails.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use weatherpoll::cache::{ArtifactStore, CacheController, CycleOutcome};
use weatherpoll::cli::{Cli, Mode, StartupConfig};
use weatherpoll::data::HttpFetcher;
use weatherpoll::refresh::Poller;
use weatherpoll::ui::StatusView;

/// Installs the stderr log subscriber; `RUST_LOG` wins over `-v`
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_controller(
    startup: &StartupConfig,
    store: ArtifactStore,
) -> Result<CacheController<HttpFetcher>, Box<dyn std::error::Error>> {
    let weather = &startup.weather;
    let fetcher = HttpFetcher::new(weather.connect_timeout, weather.read_timeout)?;
    Ok(CacheController::new(
        store,
        fetcher,
        weather.resource_key(),
        weather.freshness_window,
    ))
}

/// Prints the cache location and age
fn print_cache_info(startup: &StartupConfig, store: &ArtifactStore) -> ExitCode {
    let path = store.path();
    let age = match store.age() {
        Ok(age) => age,
        Err(e) => {
            eprintln!("Cached weather data at {} is unreadable: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };
    match age {
        Some(age) => {
            let freshness = if age <= startup.weather.freshness_window {
                "fresh"
            } else {
                "stale"
            };
            println!(
                "Cached weather data at {}\nAge: {:.1}s ({})",
                path.display(),
                age.as_secs_f64(),
                freshness
            );
        }
        None => println!("No cached weather data at {}", path.display()),
    }
    ExitCode::SUCCESS
}

/// Removes the cached artifact, if any
fn clear_cache(store: &ArtifactStore) -> ExitCode {
    let path = store.path();
    match store.clear() {
        Ok(true) => println!("Removed {}", path.display()),
        Ok(false) => println!("Nothing cached at {}", path.display()),
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

/// Polls until Ctrl-C, printing every event
async fn watch(
    startup: &StartupConfig,
    controller: CacheController<HttpFetcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    let view = StatusView::from_config(&startup.weather);
    let mut poller = Poller::new(Arc::new(controller), startup.weather.poll_interval);
    let (tx, mut rx) = mpsc::channel(16);

    poller.start(tx).await;

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => println!("{}\n", view.render_event(&event)),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("interrupted, stopping");
                break;
            }
        }
    }

    poller.cancel().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let startup = match StartupConfig::from_cli(&cli) {
        Ok(startup) => startup,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    init_tracing(startup.default_log_level());

    let store = match startup.open_store() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    match startup.mode {
        Mode::CacheInfo => return Ok(print_cache_info(&startup, &store)),
        Mode::ClearCache => return Ok(clear_cache(&store)),
        Mode::Once => {
            let controller = build_controller(&startup, store)?;
            let outcome = controller.run_cycle().await;
            println!("{}", StatusView::from_config(&startup.weather).render_outcome(&outcome));
            if let CycleOutcome::Unavailable(_) = outcome {
                return Ok(ExitCode::FAILURE);
            }
        }
        Mode::Watch => {
            let controller = build_controller(&startup, store)?;
            watch(&startup, controller).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
