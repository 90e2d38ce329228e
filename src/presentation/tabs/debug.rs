use crate::domain::models::ConnectionStatus;
use crate::presentation::app::FelicitaApp;
use crate::presentation::components::Components;
use eframe::egui;
use std::time::Instant;

pub fn render(app: &mut FelicitaApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Debug & Internal State");
    ui.add_space(20.0);

    Components::card(ui, "Bluetooth Engine Status", |ui| {
        ui.horizontal(|ui| {
            ui.label("State:");
            let (text, color) = match app.connection_status {
                ConnectionStatus::Connected => ("STREAMING", egui::Color32::from_rgb(0, 255, 100)),
                ConnectionStatus::Disconnected => ("IDLE", egui::Color32::from_gray(150)),
                _ => ("TRANSITIONING", egui::Color32::from_rgb(255, 200, 0)),
            };
            ui.label(egui::RichText::new(text).color(color).strong());
        });

        if let Some(address) = &app.last_connected_address {
            ui.label(format!("Endpoint: {}", address));
        }
        ui.label(format!("Frames received: {}", app.frames_received));
    });

    ui.add_space(10.0);

    if let Some(reading) = &app.latest_reading {
        Components::card(ui, "Decoded Telemetry", |ui| {
            egui::Grid::new("debug_grid")
                .spacing([20.0, 5.0])
                .show(ui, |ui| {
                    ui.label("Weight:");
                    ui.label(format!("{:.2} {}", reading.weight, reading.unit.label()));
                    ui.end_row();
                    ui.label("Battery:");
                    ui.label(format!("{}%", reading.battery_percent));
                    ui.end_row();
                    ui.label("Flow rate:");
                    ui.label(format!("{:.3} {}", app.flow_rate.rate(), reading.unit.flow_label()));
                    ui.end_row();
                    ui.label("Stable:");
                    ui.label(format!("{}", app.stability.is_stable()));
                    ui.end_row();
                    ui.label("Timer running:");
                    ui.label(format!("{}", app.shot_timer.is_running()));
                    ui.end_row();
                    ui.label("Timer elapsed:");
                    ui.label(format!(
                        "{:.1} s",
                        app.shot_timer.elapsed(Instant::now()).as_secs_f64()
                    ));
                    ui.end_row();
                });
        });
    }

    ui.add_space(10.0);

    Components::card(ui, "Raw Frames", |ui| {
        let capture_enabled = app
            .settings
            .lock()
            .map(|s| s.get().debug_raw_frame_logging)
            .unwrap_or(false);

        match (&app.last_raw_frame, capture_enabled) {
            (Some(frame), _) => {
                let hex = frame
                    .iter()
                    .map(|byte| format!("{:02X}", byte))
                    .collect::<Vec<_>>()
                    .join(" ");
                ui.label(egui::RichText::new(hex).monospace());
            }
            (None, true) => {
                ui.label("Waiting for frames...");
            }
            (None, false) => {
                ui.label(
                    egui::RichText::new(
                        "Enable raw frame capture in Settings to inspect telemetry bytes.",
                    )
                    .italics()
                    .size(12.0),
                );
            }
        }
    });
}
