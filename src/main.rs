mod app;
mod config;
mod geometry;
mod interpolate;
mod layout;
mod sim;
mod sync;

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, load_config};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Push channel address (state updates)
    #[arg(long)]
    push_addr: Option<String>,

    /// Command endpoint address (request/response)
    #[arg(long)]
    command_addr: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log: String,

    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long)]
    node_radius: Option<f32>,

    #[arg(long)]
    max_attempts: Option<u32>,

    #[arg(long)]
    base_delay_ms: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = &self.push_addr {
            config.server.push_addr = addr.clone();
        }
        if let Some(addr) = &self.command_addr {
            config.server.command_addr = addr.clone();
        }
        if let Some(iterations) = self.iterations {
            config.layout.iterations = iterations;
        }
        if let Some(radius) = self.node_radius {
            config.layout.node_radius = radius;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.sync.max_attempts = max_attempts;
        }
        if let Some(delay) = self.base_delay_ms {
            config.sync.base_delay_ms = delay;
        }
    }
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            error!(error = %format!("{error:#}"), "falling back to default config");
            Config::default()
        }
    };
    args.apply(&mut config);
    info!(
        push = %config.server.push_addr,
        command = %config.server.command_addr,
        "starting viewer"
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "courier-view",
        options,
        Box::new(move |cc| Ok(Box::new(app::CourierViewApp::new(cc, config)))),
    )
}
