#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod gesture;
mod model_download;
mod pipeline;
mod render;
mod scene;
mod types;
mod ui;

use anyhow::Result;
use clap::Parser;
use gpui::Application;

use config::Args;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    log::debug!("starting with {args:?}");

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, args.clone()) {
                log::error!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
