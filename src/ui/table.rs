use eframe::egui::{self, Align, Layout, ScrollArea, TextStyle, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

/// Placeholder shown instead of an empty table.
pub const NO_DATA: &str = "No data available";

// ---------------------------------------------------------------------------
// Sheet table (central panel)
// ---------------------------------------------------------------------------

/// Render the filtered view as a table. Null cells show as `NULL`.
pub fn sheet_table(ui: &mut Ui, state: &AppState) {
    if state.loading {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.spinner();
        });
        return;
    }

    let dataset = &state.dataset;
    let visible = &state.visible_indices;
    if dataset.is_empty() || visible.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(NO_DATA);
        });
        return;
    }

    let row_height = ui.text_style_height(&TextStyle::Body) + 6.0;

    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(Layout::left_to_right(Align::Center))
            .columns(Column::auto().at_least(60.0).clip(true), dataset.columns.len())
            .header(row_height, |mut header| {
                for name in &dataset.columns {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(row_height, visible.len(), |mut row| {
                    let Some(record) = visible.get(row.index()).and_then(|&i| dataset.rows.get(i))
                    else {
                        return;
                    };
                    for cell in &record.cells {
                        row.col(|ui: &mut Ui| {
                            let text = cell.to_string();
                            if cell.is_null() {
                                ui.label(egui::RichText::new(text).weak().italics());
                            } else {
                                ui.label(text);
                            }
                        });
                    }
                });
            });
    });
}
