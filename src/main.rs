mod app;
mod data;
mod state;
mod ui;

use std::path::PathBuf;

use app::SheetSiftApp;
use clap::Parser;
use data::loader::Source;
use eframe::egui;

/// Spreadsheet viewer with null-aware row filters.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Spreadsheet to open on start-up (file path or http(s) URL).
    #[arg(env = "SHEET_SIFT_SOURCE")]
    source: Option<String>,

    /// Directory downloads are written to.
    #[arg(long, env = "SHEET_SIFT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("sheet_sift=info"))
        .init();

    let cli = Cli::parse();
    log::debug!("{cli:?}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Sheet Sift",
        options,
        Box::new(move |cc| {
            let mut app = SheetSiftApp::new(cli.output_dir);
            if let Some(source) = cli.source.as_deref().filter(|s| !s.trim().is_empty()) {
                app.open(&cc.egui_ctx, Source::parse(source));
            }
            Ok(Box::new(app))
        }),
    )
}
