use crate::domain::models::{BluetoothCommand, ConnectionStatus, MessageSeverity, ScaleCommand};
use crate::presentation::app::FelicitaApp;
use crate::presentation::components::Components;
use eframe::egui;
use std::time::Instant;

pub fn render(app: &mut FelicitaApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Felicita Scale");
    ui.add_space(20.0);

    ui_connection_panel(app, ui);
    ui.add_space(15.0);

    ui_status_panel(app, ui);
    ui.add_space(15.0);

    ui_reading_panel(app, ui);
    ui.add_space(15.0);

    ui_controls_panel(app, ui);
}

fn ui_connection_panel(app: &mut FelicitaApp, ui: &mut egui::Ui) {
    Components::card(ui, "Connection", |ui| {
        let (status_text, bg_color, text_color) = match app.connection_status {
            ConnectionStatus::Connected => (
                "CONNECTED",
                egui::Color32::from_rgb(0, 200, 0),
                egui::Color32::BLACK,
            ),
            ConnectionStatus::Connecting => (
                "CONNECTING...",
                egui::Color32::from_rgb(255, 200, 0),
                egui::Color32::BLACK,
            ),
            ConnectionStatus::Disconnected => (
                "DISCONNECTED",
                egui::Color32::from_gray(100),
                egui::Color32::WHITE,
            ),
            ConnectionStatus::Error => (
                "ERROR",
                egui::Color32::from_rgb(255, 50, 50),
                egui::Color32::WHITE,
            ),
        };

        Components::status_banner(ui, status_text, bg_color, text_color);

        ui.add_space(10.0);

        ui.horizontal(|ui| {
            ui.label("Address:");
            ui.text_edit_singleline(&mut app.address_input);
        });

        ui.horizontal(|ui| {
            if app.connection_status == ConnectionStatus::Connected {
                if ui.button("Disconnect").clicked() {
                    app.auto_reconnect = false;
                    let _ = app.bluetooth_tx.send(BluetoothCommand::Disconnect);
                }
            } else if ui.button("Connect").clicked() && !app.address_input.trim().is_empty() {
                let address = app.address_input.trim().to_string();
                app.last_connected_name = app.device_name_for(&address);
                app.connection_status = ConnectionStatus::Connecting;
                app.auto_reconnect = true;
                app.last_connected_address = Some(address.clone());
                let _ = app.bluetooth_tx.send(BluetoothCommand::Connect(address));
            }

            if app.is_scanning {
                if ui.button("Stop Scan").clicked() {
                    app.is_scanning = false;
                    let _ = app.bluetooth_tx.send(BluetoothCommand::StopScan);
                }
                ui.spinner();
            } else if ui.button("Scan for Scales").clicked() {
                app.is_scanning = true;
                app.scanned_devices.clear();
                let _ = app.bluetooth_tx.send(BluetoothCommand::StartScan);
            }
        });

        if !app.scanned_devices.is_empty() {
            ui.separator();
            ui.label("Nearby Scales:");
            egui::ScrollArea::vertical()
                .id_salt("scan_results")
                .max_height(120.0)
                .show(ui, |ui| {
                    let mut picked: Option<String> = None;
                    for device in &app.scanned_devices {
                        ui.horizontal(|ui| {
                            ui.label(format!(
                                "{} [{}] ({} dBm)",
                                device.name, device.address, device.signal_strength
                            ));
                            if ui.button("Pick").clicked() {
                                picked = Some(device.address.clone());
                            }
                        });
                    }
                    if let Some(address) = picked {
                        app.address_input = address;
                    }
                });
        }
    });
}

fn ui_status_panel(app: &mut FelicitaApp, ui: &mut egui::Ui) {
    let current_msg = app.status_message.clone();
    if let Some(msg) = current_msg {
        Components::card(ui, "Status", |ui| {
            let color = match msg.severity {
                MessageSeverity::Info => egui::Color32::BLUE,
                MessageSeverity::Success => egui::Color32::from_rgb(0, 150, 0),
                MessageSeverity::Warning => egui::Color32::from_rgb(200, 150, 0),
                MessageSeverity::Error => egui::Color32::RED,
            };

            ui.label(egui::RichText::new(&msg.message).color(color).strong());
        });
    }
}

fn ui_reading_panel(app: &mut FelicitaApp, ui: &mut egui::Ui) {
    let Some(reading) = app.latest_reading.clone() else {
        return;
    };

    let stable = app.stability.is_stable();
    let flow = app.flow_rate.rate();

    Components::card(ui, "Live Reading", |ui| {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(format!("{:.2}", reading.weight))
                    .size(48.0)
                    .strong(),
            );
            ui.label(egui::RichText::new(reading.unit.label()).size(24.0));
            if stable {
                ui.label(
                    egui::RichText::new(" STABLE ")
                        .background_color(egui::Color32::from_rgb(0, 255, 100))
                        .color(egui::Color32::BLACK),
                );
            }
        });

        egui::Grid::new("reading_grid")
            .spacing([40.0, 8.0])
            .show(ui, |ui| {
                ui.label("Flow rate:");
                ui.label(format!("{:.2} {}", flow, reading.unit.flow_label()));
                ui.end_row();

                ui.label("Battery:");
                ui.label(format!("{}%", reading.battery_percent));
                ui.end_row();
            });
    });
}

fn ui_controls_panel(app: &mut FelicitaApp, ui: &mut egui::Ui) {
    let connected = app.connection_status == ConnectionStatus::Connected;
    let new_style = app
        .settings
        .lock()
        .map(|s| s.get().is_new_style_scale)
        .unwrap_or(false);

    Components::card(ui, "Scale Controls", |ui| {
        ui.add_enabled_ui(connected, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Tare").clicked() {
                    app.send_scale_command(ScaleCommand::Tare);
                }
                if ui.button("Toggle Unit").clicked() {
                    app.send_scale_command(ScaleCommand::ToggleUnit);
                }
                if new_style && ui.button("Toggle Precision").clicked() {
                    app.send_scale_command(ScaleCommand::TogglePrecision);
                }
            });

            ui.separator();
            Components::sub_heading(ui, "Timer");

            let elapsed = app.shot_timer.elapsed(Instant::now());
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(format!(
                        "{:02}:{:04.1}",
                        elapsed.as_secs() / 60,
                        elapsed.as_secs_f64() % 60.0
                    ))
                    .size(24.0)
                    .strong(),
                );

                if app.shot_timer.is_running() {
                    if ui.button("Stop").clicked() {
                        app.send_scale_command(ScaleCommand::StopTimer);
                    }
                } else if ui.button("Start").clicked() {
                    app.send_scale_command(ScaleCommand::StartTimer);
                }
                if ui.button("Reset").clicked() {
                    app.send_scale_command(ScaleCommand::ResetTimer);
                }
            });
        });

        if !connected {
            ui.label(
                egui::RichText::new("Connect to a scale to use controls.")
                    .italics()
                    .size(12.0),
            );
        }
    });
}
