use std::path::PathBuf;

use eframe::egui;
use image::RgbaImage;

use crate::data::export::ExportRequest;
use crate::data::loader::Source;
use crate::state::AppState;
use crate::ui::panels::{self, Inputs};
use crate::ui::table;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SheetSiftApp {
    pub state: AppState,
    pub inputs: Inputs,
    /// Export waiting for the viewport screenshot it is built from.
    pending_snapshot: Option<ExportRequest>,
    snapshot_requested: bool,
}

impl SheetSiftApp {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            state: AppState::new(output_dir),
            inputs: Inputs::default(),
            pending_snapshot: None,
            snapshot_requested: false,
        }
    }

    /// Kick off the start-up load.
    pub fn open(&mut self, ctx: &egui::Context, source: Source) {
        if let Source::Url(url) = &source {
            self.inputs.url = url.clone();
        }
        let ctx = ctx.clone();
        self.state.on_load(source, move || ctx.request_repaint());
    }

    fn run_export(&mut self, ctx: &egui::Context, request: ExportRequest) {
        if request.format.needs_snapshot() {
            // Captured once the dialog is gone; see `request_snapshot`.
            self.pending_snapshot = Some(request);
            self.snapshot_requested = false;
            ctx.request_repaint();
        } else {
            let _ = self.state.on_export(&request, None);
        }
    }

    /// Ask for a screenshot of a frame drawn without the download dialog.
    /// The image arrives as an input event on a later frame.
    fn request_snapshot(&mut self, ctx: &egui::Context) {
        if self.pending_snapshot.is_some() && !self.snapshot_requested {
            self.snapshot_requested = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::Screenshot(egui::UserData::default()));
        }
    }

    fn collect_snapshot(&mut self, ctx: &egui::Context) {
        if self.pending_snapshot.is_none() {
            return;
        }
        let screenshot = ctx.input(|i| {
            i.raw.events.iter().find_map(|event| match event {
                egui::Event::Screenshot { image, .. } => Some(image.clone()),
                _ => None,
            })
        });
        let Some(image) = screenshot else {
            return;
        };
        let Some(request) = self.pending_snapshot.take() else {
            return;
        };
        self.snapshot_requested = false;

        let [width, height] = image.size;
        let pixels: Vec<u8> = image.pixels.iter().flat_map(|c| c.to_array()).collect();
        match RgbaImage::from_raw(width as u32, height as u32, pixels) {
            Some(snapshot) => {
                let _ = self.state.on_export(&request, Some(&snapshot));
            }
            None => {
                log::error!("Screenshot of {width}x{height} had an unexpected pixel count");
                self.state.status_message = Some("Error: could not capture the table".into());
            }
        }
    }
}

impl eframe::App for SheetSiftApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.poll_load();
        self.collect_snapshot(ctx);

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state, &mut self.inputs);
        });

        // ---- Left side panel: filter form ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state, &mut self.inputs);
            });

        // ---- Central panel: table ----
        egui::CentralPanel::default().show(ctx, |ui| {
            table::sheet_table(ui, &self.state);
        });

        // ---- Download dialog ----
        if let Some(request) = panels::export_window(ctx, &mut self.inputs) {
            self.run_export(ctx, request);
        } else {
            self.request_snapshot(ctx);
        }
    }
}
