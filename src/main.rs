mod domain;
mod infrastructure;
mod presentation;

use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 620.0])
            .with_title("Felicita Scale"),
        ..Default::default()
    };

    eframe::run_native(
        "Felicita Scale",
        options,
        Box::new(|cc| Ok(Box::new(presentation::app::FelicitaApp::new(cc)))),
    )
}
