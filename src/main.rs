#![forbid(unsafe_code)]

mod app;
mod commands;
mod config;
mod controller;
mod editor;
mod error;
mod keymap;
mod logging;
mod memory;
mod model;
mod pane;
mod projection;
mod s3;
mod storage;
mod tree;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::app::App;
use crate::config::{AppConfig, AppContext, Backend};
use crate::controller::Controller;
use crate::editor::{EditorLauncher, ProcessEditor};
use crate::memory::MemoryGateway;
use crate::s3::S3Gateway;
use crate::storage::StorageGateway;

fn connect(cfg: &AppConfig) -> Result<Arc<dyn StorageGateway>> {
    Ok(match cfg.backend {
        Backend::Memory => Arc::new(MemoryGateway::seeded()),
        Backend::S3 => Arc::new(
            S3Gateway::connect(&cfg.region, cfg.endpoint_url.as_deref())
                .context("connecting to object storage")?,
        ),
    })
}

fn main() -> Result<()> {
    let cfg = AppConfig::from_env_and_args()?;
    logging::init(&cfg.log_file)?;
    tracing::info!(
        backend = ?cfg.backend,
        region = %cfg.region,
        listing = ?cfg.listing,
        editor = %cfg.editor,
        "starting"
    );

    let gateway = connect(&cfg)?;
    // The first listing happens before the terminal is taken over so a bad
    // credential or endpoint surfaces as a plain error and a non-zero exit.
    let buckets = gateway.list_buckets().context("listing buckets")?;
    tracing::info!(count = buckets.len(), "initial bucket listing");

    let controller = Controller::new(buckets);
    let editor: Arc<dyn EditorLauncher> = Arc::new(ProcessEditor::new(cfg.editor.clone()));
    let ctx = AppContext::new(cfg, gateway);
    App::new(ctx, controller, editor).run().context("running terminal ui")?;
    tracing::info!("exited cleanly");
    Ok(())
}
