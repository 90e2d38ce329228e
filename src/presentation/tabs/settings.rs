use crate::presentation::app::FelicitaApp;
use crate::presentation::components::Components;
use eframe::egui;

pub fn render(app: &mut FelicitaApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Settings");
    ui.add_space(20.0);

    let mut save_requested = false;

    if let Ok(mut settings) = app.settings.lock() {
        let settings_mut = settings.get_mut();

        Components::card(ui, "Scale", |ui| {
            ui.checkbox(
                &mut settings_mut.is_new_style_scale,
                "New-style scale (2021+ firmware)",
            );
            ui.label(
                egui::RichText::new(
                    "Newer units report battery as a plain percentage and \
                     support the precision toggle. Leave unchecked for \
                     original Arc hardware.",
                )
                .size(12.0),
            );

            ui.separator();
            ui.horizontal(|ui| {
                ui.label("Flow rate window (s):");
                ui.add(egui::Slider::new(
                    &mut settings_mut.flow_rate_window_secs,
                    1.0..=10.0,
                ));
            });
        });

        ui.add_space(10.0);

        Components::card(ui, "Connection", |ui| {
            ui.horizontal(|ui| {
                ui.label("Connect timeout (s):");
                ui.add(egui::Slider::new(
                    &mut settings_mut.connect_timeout_secs,
                    1..=30,
                ));
            });
            ui.horizontal(|ui| {
                ui.label("Max attempts:");
                ui.add(egui::Slider::new(
                    &mut settings_mut.connect_max_retries,
                    1..=10,
                ));
            });
            ui.horizontal(|ui| {
                ui.label("Retry delay (ms):");
                ui.add(egui::Slider::new(
                    &mut settings_mut.connect_retry_delay_ms,
                    100..=5000,
                ));
            });

            if let Some(address) = &settings_mut.last_connected_address {
                ui.separator();
                ui.label(format!(
                    "Last scale: {} ({})",
                    settings_mut
                        .last_connected_name
                        .as_deref()
                        .unwrap_or("unnamed"),
                    address
                ));
            }
        });

        ui.add_space(10.0);

        Components::card(ui, "Bluetooth Protocol", |ui| {
            ui.checkbox(
                &mut settings_mut.debug_show_all_devices,
                "Report all BLE devices while scanning (Debug mode)",
            );

            ui.collapsing("Override GATT UUIDs", |ui| {
                ui.label(
                    egui::RichText::new("⚠ Warning: Altering these may break device discovery.")
                        .color(egui::Color32::from_rgb(255, 200, 0)),
                );

                egui::Grid::new("ble_uuids")
                    .spacing([10.0, 10.0])
                    .show(ui, |ui| {
                        ui.label("Service:");
                        ui.text_edit_singleline(&mut settings_mut.ble_service_uuid);
                        ui.end_row();
                        ui.label("Characteristic:");
                        ui.text_edit_singleline(&mut settings_mut.ble_char_uuid);
                        ui.end_row();
                    });
            });
        });

        ui.add_space(10.0);

        Components::card(ui, "Logging & Debug", |ui| {
            ui.horizontal(|ui| {
                ui.label("Verbosity Level:");
                egui::ComboBox::from_id_salt("log_level")
                    .selected_text(&settings_mut.log_settings.level)
                    .show_ui(ui, |ui| {
                        for level in &["trace", "debug", "info", "warn", "error"] {
                            ui.selectable_value(
                                &mut settings_mut.log_settings.level,
                                level.to_string(),
                                *level,
                            );
                        }
                    });
            });

            ui.checkbox(
                &mut settings_mut.log_settings.console_logging_enabled,
                "Standard Console Logs",
            );
            ui.checkbox(
                &mut settings_mut.log_settings.file_logging_enabled,
                "Persistent File Logs",
            );

            if settings_mut.log_settings.file_logging_enabled {
                ui.indent("file_logs", |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Save Path:");
                        ui.text_edit_singleline(&mut settings_mut.log_settings.log_dir);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Rotation:");
                        egui::ComboBox::from_id_salt("log_rot")
                            .selected_text(&settings_mut.log_settings.rotation)
                            .show_ui(ui, |ui| {
                                for rot in &["daily", "hourly", "never"] {
                                    ui.selectable_value(
                                        &mut settings_mut.log_settings.rotation,
                                        rot.to_string(),
                                        *rot,
                                    );
                                }
                            });
                    });
                });
                ui.label(
                    egui::RichText::new("Restart required for log changes.")
                        .italics()
                        .size(12.0),
                );
            }

            ui.collapsing("Advanced Logging Formatting", |ui| {
                ui.checkbox(
                    &mut settings_mut.log_settings.show_file_line,
                    "Show File & Line",
                );
                ui.checkbox(
                    &mut settings_mut.log_settings.show_thread_ids,
                    "Show Thread IDs",
                );
                ui.checkbox(
                    &mut settings_mut.log_settings.show_target,
                    "Show Target (Module)",
                );
                ui.checkbox(
                    &mut settings_mut.log_settings.ansi_colors,
                    "ANSI Colors (Console)",
                );
            });

            ui.checkbox(
                &mut settings_mut.debug_raw_frame_logging,
                "Capture raw telemetry frames (reconnect to apply)",
            );
        });

        ui.add_space(10.0);
        if ui.button("Save Settings").clicked() {
            save_requested = true;
        }

        if save_requested {
            if let Err(e) = settings.save() {
                tracing::error!("Failed to save settings: {:#}", e);
            }
        }
    }

    if save_requested {
        app.status_message = Some(crate::domain::models::StatusMessage {
            message: "Settings saved.".to_string(),
            severity: crate::domain::models::MessageSeverity::Success,
        });
    }
}
