use eframe::egui::{self, Button, Color32, RichText, ScrollArea, TextEdit, Ui};

use crate::data::export::{ExportFormat, ExportRequest, DEFAULT_FILENAME};
use crate::data::filter::{Combinator, Condition, FilterForm};
use crate::data::loader::Source;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Input surface state
// ---------------------------------------------------------------------------

/// Text and selections the user is editing. Kept apart from [`AppState`] so
/// the session only ever sees submitted commands.
#[derive(Default)]
pub struct Inputs {
    pub filter: FilterForm,
    pub url: String,
    pub export: ExportDialog,
}

#[derive(Default)]
pub struct ExportDialog {
    pub open: bool,
    pub filename: String,
    pub format: ExportFormat,
}

/// Start loading `source`, waking the UI when the worker is done.
fn start_load(ui: &Ui, state: &mut AppState, source: Source) {
    let ctx = ui.ctx().clone();
    state.on_load(source, move || ctx.request_repaint());
}

// ---------------------------------------------------------------------------
// Left side panel – filter form
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState, inputs: &mut Inputs) {
    ui.heading("Filter");
    ui.separator();

    let form = &mut inputs.filter;

    ui.label("Primary column");
    ui.add(TextEdit::singleline(&mut form.primary_column).hint_text("e.g. Email"));

    ui.label("Comparison columns");
    ui.add(
        TextEdit::singleline(&mut form.comparison_columns)
            .hint_text("comma separated, e.g. Phone, Fax"),
    );

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Combine with");
        egui::ComboBox::from_id_salt("combinator")
            .selected_text(form.combinator.token())
            .show_ui(ui, |ui: &mut Ui| {
                for choice in Combinator::ALL_CHOICES {
                    ui.selectable_value(&mut form.combinator, choice, choice.token());
                }
            });
    });

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Primary is");
        egui::ComboBox::from_id_salt("condition")
            .selected_text(form.condition.token())
            .show_ui(ui, |ui: &mut Ui| {
                for choice in Condition::ALL_CHOICES {
                    ui.selectable_value(&mut form.condition, choice, choice.token());
                }
            });
    });

    ui.add_space(4.0);
    if ui.add_enabled(state.ready(), Button::new("Apply")).clicked() {
        // Rejections are already reported through the status line.
        let _ = state.on_apply(form);
    }

    ui.separator();

    if state.dataset.columns.is_empty() {
        ui.label("No dataset loaded.");
        return;
    }

    ui.strong("Columns");
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for name in &state.dataset.columns {
                // Click to use as primary, shift-click to append as comparison.
                let response = ui.selectable_label(false, name);
                if response.clicked() {
                    if ui.input(|i| i.modifiers.shift) {
                        let cols = &mut form.comparison_columns;
                        if !cols.trim().is_empty() {
                            cols.push_str(", ");
                        }
                        cols.push_str(name);
                    } else {
                        form.primary_column = name.clone();
                    }
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState, inputs: &mut Inputs) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.add_enabled(state.ready(), Button::new("Open…")).clicked() {
                open_file_dialog(ui, state);
                ui.close_menu();
            }
        });

        ui.separator();

        let url = ui.add(
            TextEdit::singleline(&mut inputs.url)
                .hint_text("https://… or path")
                .desired_width(260.0),
        );
        let submitted = url.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        let can_load = state.ready() && !inputs.url.trim().is_empty();
        if (ui.add_enabled(can_load, Button::new("Load")).clicked() || submitted) && can_load {
            start_load(ui, state, Source::parse(&inputs.url));
        }

        ui.separator();

        if ui.add_enabled(state.ready(), Button::new("Download")).clicked() {
            inputs.export.open = true;
        }

        ui.separator();

        if !state.dataset.columns.is_empty() {
            ui.label(format!(
                "{} rows loaded, {} visible",
                state.dataset.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Export modal
// ---------------------------------------------------------------------------

/// Render the download dialog. Returns the request when the user confirms.
pub fn export_window(ctx: &egui::Context, inputs: &mut Inputs) -> Option<ExportRequest> {
    let dialog = &mut inputs.export;
    if !dialog.open {
        return None;
    }

    let mut request = None;
    egui::Window::new("Download")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                ui.label("File name");
                ui.add(TextEdit::singleline(&mut dialog.filename).hint_text(DEFAULT_FILENAME));
            });

            ui.horizontal(|ui: &mut Ui| {
                ui.label("Format");
                egui::ComboBox::from_id_salt("export_format")
                    .selected_text(dialog.format.extension())
                    .show_ui(ui, |ui: &mut Ui| {
                        for format in ExportFormat::ALL {
                            ui.selectable_value(&mut dialog.format, format, format.extension());
                        }
                    });
            });

            ui.add_space(4.0);
            ui.horizontal(|ui: &mut Ui| {
                if ui.button("Download").clicked() {
                    request = Some(ExportRequest::new(&dialog.filename, dialog.format));
                    dialog.open = false;
                }
                if ui.button("Close").clicked() {
                    dialog.open = false;
                }
            });
        });

    request
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(ui: &Ui, state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open spreadsheet")
        .add_filter(
            "Supported files",
            &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv", "tsv"],
        )
        .add_filter("Excel", &["xlsx", "xlsm", "xlsb", "xls"])
        .add_filter("OpenDocument", &["ods"])
        .add_filter("Delimited text", &["csv", "tsv"])
        .pick_file();

    if let Some(path) = file {
        start_load(ui, state, Source::Path(path));
    }
}
