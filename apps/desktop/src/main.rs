use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context as _, Result};
use clap::Parser;
use eframe::{egui, NativeOptions};
use logfeed::{LogFeedLayer, LogReceiver};
use overlay::{LogPanel, TrackBrowserState};
use preview::TextureCache;
use settings::OverlayConfig;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use tracks::CatalogProvider;

mod browser;
mod log;
mod texture;

use crate::texture::EguiTextureUploader;

#[derive(Parser, Debug)]
#[command(name = "track-overlay", about = "Track selection and log overlay")]
struct Args {
    /// Config file (defaults to the per-user data directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Track catalog, overriding the config file
    #[arg(long)]
    catalog: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(settings::default_config_path);
    let file_config = OverlayConfig::load_or_default(&config_path);
    let mut config = file_config.clone();
    if let Some(catalog) = args.catalog {
        config.catalog_path = catalog;
    }

    let (log_tx, log_rx) = logfeed::channel();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,track_overlay=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(LogFeedLayer::new(log_tx).with_min_level(config.log_min_level.as_tracing_level()))
        .try_init()
        .context("install tracing subscriber")?;
    if config_path.exists() {
        info!("config {}", config_path.display());
    } else if let Err(e) = file_config.save(&config_path) {
        warn!("could not write default config: {e:#}");
    } else {
        info!("wrote default config to {}", config_path.display());
    }

    let size = config.track_window;
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([size.width + 40.0, size.height + 40.0]),
        ..NativeOptions::default()
    };
    eframe::run_native(
        "Track Overlay",
        options,
        Box::new(move |cc| {
            let render_state = cc.wgpu_render_state.clone().ok_or_else(|| anyhow!("wgpu renderer unavailable"))?;
            Ok(Box::new(App::new(config, log_rx, EguiTextureUploader::new(render_state))))
        }),
    )
    .map_err(|e| anyhow!("run overlay: {e}"))
}

struct App {
    config: OverlayConfig,
    catalog: CatalogProvider,
    log_rx: LogReceiver,
    browser: TrackBrowserState,
    preview: TextureCache<EguiTextureUploader>,
    log: LogPanel,
}

impl App {
    fn new(config: OverlayConfig, log_rx: LogReceiver, uploader: EguiTextureUploader) -> Self {
        let catalog = match CatalogProvider::open(&config.catalog_path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("{e}; starting with an empty catalog");
                CatalogProvider::from_tracks(Vec::new())
            }
        };
        let mut preview = TextureCache::new(uploader);
        if let Some(path) = &config.default_preview_image {
            preview = preview.with_fallback(path.clone());
        }
        Self {
            catalog,
            log_rx,
            browser: TrackBrowserState::new(config.refresh_interval()),
            preview,
            log: LogPanel::new(),
            config,
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.log.poll(&mut self.log_rx);

        self.browser.refresh(&mut self.catalog, Instant::now());
        self.browser.update_preview(&mut self.preview);

        self.track_window(ctx);
        self.log_window(ctx);

        self.browser.finish_pass();
        // keep the refresh schedule ticking while idle
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}
