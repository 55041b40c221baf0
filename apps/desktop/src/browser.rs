use egui_extras::{Column, TableBuilder};
use eframe::egui;
use tracing::{info, warn};
use tracks::{SlotFilter, SortBy, Track, TrackType, TrackTypeFilter};

use crate::App;

const COLUMNS: [&str; 8] = ["Name", "Slot", "Type", "Author", "Date Created", "Installs", "My Installs", "Favorite"];

impl App {
    pub(crate) fn track_window(&mut self, ctx: &egui::Context) {
        let size = self.config.track_window;
        egui::Window::new("Track Selection")
            .default_size([size.width, size.height])
            .resizable(true)
            .show(ctx, |ui| {
                self.preview_pane(ui);
                ui.separator();
                self.filter_row(ui);
                ui.separator();
                if let Some(name) = self.track_table(ui) {
                    self.browser.select(&name);
                }
                ui.separator();
                self.install_row(ui);
            });
    }

    fn preview_pane(&mut self, ui: &mut egui::Ui) {
        let pane = self.config.preview_pane;
        let size = egui::vec2(pane.width, pane.height);
        // native size, clipped to the pane
        let (pane_rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
        let painter = ui.painter_at(pane_rect);
        match self.preview.current() {
            Some(tex) => {
                let rect = egui::Rect::from_min_size(pane_rect.min, tex.size().into());
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                painter.image(tex.texture.id, rect, uv, egui::Color32::WHITE);
            }
            None => {
                painter.text(
                    pane_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "No Preview",
                    egui::FontId::proportional(16.0),
                    egui::Color32::GRAY,
                );
            }
        }
        if ui.small_button("Reload Preview").clicked() {
            self.browser.restore_preview(&mut self.preview);
        }
    }

    fn filter_row(&mut self, ui: &mut egui::Ui) {
        let filter = self.browser.filter_mut();
        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("track_type")
                .selected_text(filter.track_type.label())
                .show_ui(ui, |ui| {
                    for option in TrackTypeFilter::ALL {
                        ui.selectable_value(&mut filter.track_type, option, option.label());
                    }
                });
            egui::ComboBox::from_id_salt("slot")
                .selected_text(filter.slot.label())
                .show_ui(ui, |ui| {
                    for option in SlotFilter::ALL {
                        ui.selectable_value(&mut filter.slot, option, option.label());
                    }
                });
            egui::ComboBox::from_id_salt("sort_by")
                .selected_text(format!("Sort: {}", filter.sort_by.label()))
                .show_ui(ui, |ui| {
                    for option in SortBy::ALL {
                        ui.selectable_value(&mut filter.sort_by, option, option.label());
                    }
                });
        });
    }

    /// Returns the name of a row clicked this pass.
    fn track_table(&self, ui: &mut egui::Ui) -> Option<String> {
        let mut clicked = None;
        let mut table = TableBuilder::new(ui).striped(true).max_scroll_height(360.0);
        for _ in 0..COLUMNS.len() - 1 {
            table = table.column(Column::auto().resizable(true));
        }
        table
            .column(Column::remainder())
            .header(20.0, |mut h| {
                for title in COLUMNS {
                    h.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for track in self.browser.tracks() {
                    body.row(20.0, |mut row| {
                        row.col(|ui| {
                            if ui.selectable_label(self.browser.is_selected(track), &track.name).clicked() {
                                clicked = Some(track.name.clone());
                            }
                        });
                        for cell in cells(track) {
                            row.col(|ui| {
                                ui.label(cell);
                            });
                        }
                    });
                }
            });
        clicked
    }

    fn install_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for category in TrackType::ALL {
                if ui.button(format!("Install Random {category} Tracks")).clicked() {
                    self.browser.install_random(&mut self.catalog, category);
                }
            }
            let has_selection = self.browser.selected().is_some();
            if ui.add_enabled(has_selection, egui::Button::new("Install Selected Track")).clicked() {
                self.browser.install_selected(&mut self.catalog);
            }
            if ui.button("Reload Catalog").clicked() {
                match self.catalog.reload() {
                    Ok(()) => info!("catalog reloaded ({} tracks)", self.catalog.tracks().len()),
                    Err(e) => warn!("{e}"),
                }
            }
        });
    }
}

fn cells(track: &Track) -> [String; 7] {
    [
        track.slot.to_string(),
        track.track_type.to_string(),
        track.author.clone(),
        track.date.clone(),
        track.installs.to_string(),
        track.my_installs.to_string(),
        if track.favorite { "Yes".into() } else { "No".into() },
    ]
}
