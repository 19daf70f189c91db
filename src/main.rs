//! Headless driver for the reading view.
//!
//! Compiles a text file into a session backed by the on-disk slot cache,
//! restores the slot's saved position, optionally scrolls and saves, and
//! prints where the reader ended up.

use anyhow::{Context, Result, anyhow};
use lanternleaf_scroll::{
    FileStore, HeadlessSurface, LayoutMetrics, ProgressSource, ReaderSession, SlotId, load_config,
};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str =
    "Usage: lanternleaf-scroll <text-file> [--slot N] [--scroll PX] [--config PATH]";

struct CliArgs {
    text_path: PathBuf,
    slot: SlotId,
    scroll: Option<f64>,
    config_path: PathBuf,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let config = load_config(&args.config_path);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        path = %args.text_path.display(),
        slot = %args.slot,
        cache = %config.cache_dir,
        "Starting headless reader"
    );

    let text = fs::read_to_string(&args.text_path)
        .with_context(|| format!("Failed to read {}", args.text_path.display()))?;
    let settle = config.retry_interval() * (config.max_attempts + 1)
        + config.frame_interval() * 4
        + config.save_debounce();
    let surface = HeadlessSurface::new(LayoutMetrics::from_config(&config));
    let store = FileStore::new(&config.cache_dir);
    let mut session = ReaderSession::new(config, surface, store);

    session.open_slot(args.slot, None, &text);
    session.advance(settle);

    if let Some(px) = args.scroll {
        session.user_scrolled_to(px);
        session.advance(settle);
        if session.save_position() {
            info!(px, "Saved position after scrolling");
        }
    }

    let window = session.render_window();
    let restored = session
        .take_progress_updates()
        .into_iter()
        .filter(|update| update.source != ProgressSource::Provisional)
        .last();
    println!(
        "segments: {} (rendered {}..{})",
        session.document().len(),
        window.start,
        window.end
    );
    match restored {
        Some(update) => println!("progress: {}", update.label()),
        None => println!("progress: {:.0}%", session.scroll_ratio() * 100.0),
    }
    match session.capture_anchor() {
        Some(anchor) => println!(
            "anchor: segment {} + {:.1}px",
            anchor.segment_index, anchor.pixel_offset
        ),
        None => println!("anchor: none"),
    }
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut text_path = None;
    let mut slot = SlotId(1);
    let mut scroll = None;
    let mut config_path = PathBuf::from("conf/config.toml");

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--slot" => {
                let value = args.next().ok_or_else(|| anyhow!("--slot needs a value"))?;
                slot = SlotId(
                    value
                        .parse()
                        .with_context(|| format!("Invalid slot number: {value}"))?,
                );
            }
            "--scroll" => {
                let value = args.next().ok_or_else(|| anyhow!("--scroll needs a value"))?;
                scroll = Some(
                    value
                        .parse::<f64>()
                        .with_context(|| format!("Invalid scroll offset: {value}"))?,
                );
            }
            "--config" => {
                let value = args.next().ok_or_else(|| anyhow!("--config needs a value"))?;
                config_path = PathBuf::from(value);
            }
            other if other.starts_with("--") => {
                return Err(anyhow!("Unknown flag {other}\n{USAGE}"));
            }
            other => text_path = Some(PathBuf::from(other)),
        }
    }

    let text_path = text_path.ok_or_else(|| anyhow!(USAGE))?;
    if !text_path.exists() {
        return Err(anyhow!("File not found: {}", text_path.display()));
    }
    Ok(CliArgs {
        text_path,
        slot,
        scroll,
        config_path,
    })
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
