use eframe::egui;
use overlay::LogView;

use crate::App;

impl App {
    pub(crate) fn log_window(&mut self, ctx: &egui::Context) {
        let size = self.config.log_window;
        egui::Window::new("Log")
            .default_size([size.width, size.height])
            .resizable(true)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("Clear").clicked() {
                        self.log.clear();
                    }
                    if ui.button("Copy").clicked() {
                        ui.ctx().copy_text(self.log.copy_text());
                    }
                    ui.label("Filter");
                    if ui.text_edit_singleline(self.log.filter_mut().input_mut()).changed() {
                        self.log.filter_mut().build();
                    }
                });
                ui.separator();

                let scroll_to_bottom = self.log.take_scroll_to_bottom();
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        match self.log.view() {
                            LogView::Full(text) => {
                                ui.monospace(text);
                            }
                            LogView::Filtered(lines) => {
                                for line in lines {
                                    ui.monospace(line);
                                }
                            }
                        }
                        if scroll_to_bottom {
                            ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                        }
                    });
            });
    }
}
