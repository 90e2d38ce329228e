use crate::domain::models::{
    AppEvent, BluetoothCommand, ConnectionStatus, MessageSeverity, ScaleCommand, ScaleReading,
    ScannedDevice, StatusMessage, Tab,
};
use crate::domain::scale::{FlowRateEstimator, ShotTimer, StabilityTracker};
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::BluetoothService;
use eframe::egui;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, warn};

pub struct FelicitaApp {
    // Services
    pub(crate) settings: Arc<Mutex<SettingsService>>,

    // Bluetooth
    pub(crate) bluetooth_tx: mpsc::UnboundedSender<BluetoothCommand>,
    pub(crate) event_rx: mpsc::UnboundedReceiver<AppEvent>,

    // State
    pub(crate) connection_status: ConnectionStatus,
    pub(crate) status_message: Option<StatusMessage>,
    pub(crate) latest_reading: Option<ScaleReading>,

    // Derived state
    pub(crate) flow_rate: FlowRateEstimator,
    pub(crate) stability: StabilityTracker,
    pub(crate) shot_timer: ShotTimer,

    // UI State
    pub(crate) selected_tab: Tab,
    pub(crate) address_input: String,

    // Scanning
    pub(crate) is_scanning: bool,
    pub(crate) scanned_devices: Vec<ScannedDevice>,

    // Reconnection
    pub(crate) auto_reconnect: bool,
    pub(crate) last_connected_address: Option<String>,
    pub(crate) last_connected_name: Option<String>,
    pub(crate) reconnect_timer: Option<Instant>,

    // Debug state
    pub(crate) frames_received: u64,
    pub(crate) last_raw_frame: Option<Vec<u8>>,

    // UI Options
    pub(crate) is_dark_mode: bool,

    // Logging guard
    pub(crate) _logging_guard: Option<crate::infrastructure::logging::LoggingGuard>,
}

impl FelicitaApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        crate::presentation::theme::apply(&cc.egui_ctx, false);

        let settings_service = SettingsService::new().expect("Failed to load settings");

        let logging_guard =
            crate::infrastructure::logging::init_logger(&settings_service.get().log_settings)
                .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
                .ok();

        tracing::info!("Starting Felicita Scale Application");

        let flow_window = Duration::from_secs_f64(
            settings_service.get().flow_rate_window_secs.max(0.5),
        );
        let last_connected_address = settings_service.get().last_connected_address.clone();
        let last_connected_name = settings_service.get().last_connected_name.clone();
        let address_input = last_connected_address.clone().unwrap_or_default();

        let settings = Arc::new(Mutex::new(settings_service));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (bt_cmd_tx, mut bt_cmd_rx) = mpsc::unbounded_channel();
        let bt_settings = settings.clone();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime for Bluetooth");

            rt.block_on(async move {
                let tx_clone = event_tx.clone();
                let mut bt_service = match BluetoothService::new(event_tx, bt_settings).await {
                    Ok(service) => service,
                    Err(e) => {
                        error!("Bluetooth unavailable: {:#}", e);
                        let _ = tx_clone.send(AppEvent::LogMessage(StatusMessage {
                            message: format!("Bluetooth unavailable: {}", e),
                            severity: MessageSeverity::Error,
                        }));
                        return;
                    }
                };

                while let Some(cmd) = bt_cmd_rx.recv().await {
                    match cmd {
                        BluetoothCommand::Connect(address) => {
                            if let Err(e) = bt_service.connect(&address).await {
                                error!("Connection failed: {:#}", e);
                                let _ = tx_clone.send(AppEvent::LogMessage(StatusMessage {
                                    message: format!("Connection failed: {}", e),
                                    severity: MessageSeverity::Error,
                                }));
                                let _ = tx_clone
                                    .send(AppEvent::ConnectionStatus(ConnectionStatus::Error));
                            }
                        }
                        BluetoothCommand::Disconnect => {
                            bt_service.disconnect().await;
                        }
                        BluetoothCommand::StartScan => {
                            if let Err(e) = bt_service.start_scan().await {
                                error!("Failed to start scan: {:#}", e);
                                let _ = tx_clone.send(AppEvent::LogMessage(StatusMessage {
                                    message: format!("Scan failed: {}", e),
                                    severity: MessageSeverity::Error,
                                }));
                            }
                        }
                        BluetoothCommand::StopScan => {
                            if let Err(e) = bt_service.stop_scan().await {
                                error!("Failed to stop scan: {:#}", e);
                            }
                        }
                        BluetoothCommand::Send(command) => {
                            if let Err(e) = bt_service.send_command(command).await {
                                warn!("Command {:?} failed: {:#}", command, e);
                                let _ = tx_clone.send(AppEvent::LogMessage(StatusMessage {
                                    message: format!("Scale command failed: {}", e),
                                    severity: MessageSeverity::Warning,
                                }));
                            }
                        }
                    }
                }
            });
        });

        Self {
            settings,
            bluetooth_tx: bt_cmd_tx,
            event_rx,
            connection_status: ConnectionStatus::Disconnected,
            status_message: None,
            latest_reading: None,
            flow_rate: FlowRateEstimator::new(flow_window),
            stability: StabilityTracker::default(),
            shot_timer: ShotTimer::default(),
            selected_tab: Tab::Home,
            address_input,
            is_scanning: false,
            scanned_devices: Vec::new(),
            auto_reconnect: false,
            last_connected_address,
            last_connected_name,
            reconnect_timer: None,
            frames_received: 0,
            last_raw_frame: None,
            is_dark_mode: false,
            _logging_guard: logging_guard,
        }
    }

    /// Name to persist for the scale at `address`: the scan result when one
    /// exists, else the remembered name if it belongs to this same address.
    /// A hand-typed address never inherits another scale's name.
    pub(crate) fn device_name_for(&self, address: &str) -> Option<String> {
        self.scanned_devices
            .iter()
            .find(|d| d.address.eq_ignore_ascii_case(address))
            .map(|d| d.name.clone())
            .or_else(|| {
                self.last_connected_address
                    .as_deref()
                    .is_some_and(|a| a.eq_ignore_ascii_case(address))
                    .then(|| self.last_connected_name.clone())
                    .flatten()
            })
    }

    /// Send a control command to the scale, mirroring its effect on the
    /// locally derived state.
    pub(crate) fn send_scale_command(&mut self, command: ScaleCommand) {
        let now = Instant::now();
        match command {
            ScaleCommand::Tare => {
                // A tare is a weight jump, not a pour.
                self.flow_rate.reset();
                self.stability.reset();
            }
            ScaleCommand::StartTimer => self.shot_timer.start(now),
            ScaleCommand::StopTimer => self.shot_timer.stop(now),
            ScaleCommand::ResetTimer => self.shot_timer.reset(),
            ScaleCommand::ToggleUnit | ScaleCommand::TogglePrecision => {}
        }
        let _ = self.bluetooth_tx.send(BluetoothCommand::Send(command));
    }

    fn process_reading(&mut self, reading: ScaleReading) {
        let now = Instant::now();

        // Pick up window edits from the settings tab.
        if let Ok(settings) = self.settings.lock() {
            let window = settings.get().flow_rate_window_secs.max(0.5);
            self.flow_rate.set_window(Duration::from_secs_f64(window));
        }

        self.flow_rate.push(now, reading.weight);
        self.stability.push(now, reading.weight);
        self.frames_received += 1;
        self.latest_reading = Some(reading);
    }

    fn handle_status_change(&mut self, status: ConnectionStatus) {
        self.connection_status = status;
        match status {
            ConnectionStatus::Connected => {
                self.status_message = Some(StatusMessage {
                    message: "Connected to Felicita scale".to_string(),
                    severity: MessageSeverity::Success,
                });
                self.reconnect_timer = None;
                if let Some(address) = self.last_connected_address.clone() {
                    if let Ok(mut settings) = self.settings.lock() {
                        let _ = settings
                            .remember_device(&address, self.last_connected_name.as_deref());
                    }
                }
            }
            ConnectionStatus::Disconnected => {
                self.flow_rate.reset();
                self.stability.reset();
                if self.auto_reconnect {
                    self.reconnect_timer = Some(Instant::now() + Duration::from_millis(2000));

                    // Keep an existing error message visible; it usually
                    // explains why we keep losing the device.
                    let should_update_msg = self
                        .status_message
                        .as_ref()
                        .map_or(true, |m| m.severity != MessageSeverity::Error);

                    if should_update_msg {
                        self.status_message = Some(StatusMessage {
                            message: "Disconnected. Reconnecting in 2s...".to_string(),
                            severity: MessageSeverity::Warning,
                        });
                    }
                }
            }
            ConnectionStatus::Error => {
                // The error LogMessage has already stopped auto-reconnect;
                // just drop the stale derived state and any pending retry.
                self.flow_rate.reset();
                self.stability.reset();
                self.reconnect_timer = None;
            }
            ConnectionStatus::Connecting => {}
        }
    }
}

impl eframe::App for FelicitaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(time) = self.reconnect_timer {
            if Instant::now() >= time {
                self.reconnect_timer = None;
                if let Some(address) = self.last_connected_address.clone() {
                    self.connection_status = ConnectionStatus::Connecting;
                    let _ = self.bluetooth_tx.send(BluetoothCommand::Connect(address));
                }
            } else {
                ctx.request_repaint_after(Duration::from_millis(100));
            }
        }

        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                AppEvent::Reading(reading) => self.process_reading(reading),
                AppEvent::RawFrame(bytes) => self.last_raw_frame = Some(bytes),
                AppEvent::ConnectionStatus(status) => self.handle_status_change(status),
                AppEvent::LogMessage(msg) => {
                    // A hard error stops auto-reconnect so the user can read
                    // the diagnosis instead of watching retry churn.
                    if msg.severity == MessageSeverity::Error {
                        self.auto_reconnect = false;
                        self.reconnect_timer = None;
                    }
                    self.status_message = Some(msg);
                }
                AppEvent::DeviceFound(device) => {
                    if let Some(existing) = self
                        .scanned_devices
                        .iter_mut()
                        .find(|d| d.address == device.address)
                    {
                        existing.signal_strength = device.signal_strength;
                        existing.name = device.name;
                    } else {
                        self.scanned_devices.push(device);
                    }
                }
            }
        }

        ctx.request_repaint();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.selectable_value(&mut self.selected_tab, Tab::Home, "Home");
                ui.selectable_value(&mut self.selected_tab, Tab::Settings, "Settings");
                ui.selectable_value(&mut self.selected_tab, Tab::Debug, "Debug");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let switch_icon = if self.is_dark_mode {
                        "☀ Light"
                    } else {
                        "🌙 Dark"
                    };
                    if ui.button(switch_icon).clicked() {
                        self.is_dark_mode = !self.is_dark_mode;
                        crate::presentation::theme::apply(ctx, self.is_dark_mode);
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_max_width(800.0);
                    ui.add_space(20.0);

                    use crate::presentation::tabs;
                    match self.selected_tab {
                        Tab::Home => tabs::home::render(self, ui),
                        Tab::Settings => tabs::settings::render(self, ui),
                        Tab::Debug => tabs::debug::render(self, ui),
                    }

                    ui.add_space(50.0);
                });
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> FelicitaApp {
        let settings = Arc::new(Mutex::new(SettingsService::for_tests()));
        let (bluetooth_tx, _cmd_rx) = mpsc::unbounded_channel();
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        FelicitaApp {
            settings,
            bluetooth_tx,
            event_rx,
            connection_status: ConnectionStatus::Disconnected,
            status_message: None,
            latest_reading: None,
            flow_rate: FlowRateEstimator::new(Duration::from_secs(3)),
            stability: StabilityTracker::default(),
            shot_timer: ShotTimer::default(),
            selected_tab: Tab::Home,
            address_input: String::new(),
            is_scanning: false,
            scanned_devices: Vec::new(),
            auto_reconnect: false,
            last_connected_address: None,
            last_connected_name: None,
            reconnect_timer: None,
            frames_received: 0,
            last_raw_frame: None,
            is_dark_mode: false,
            _logging_guard: None,
        }
    }

    #[test]
    fn error_status_clears_pending_reconnect() {
        let mut app = app();
        app.auto_reconnect = true;
        app.reconnect_timer = Some(Instant::now());

        app.handle_status_change(ConnectionStatus::Error);

        assert_eq!(app.connection_status, ConnectionStatus::Error);
        assert!(app.reconnect_timer.is_none());
    }

    #[test]
    fn hand_typed_address_does_not_inherit_previous_name() {
        let mut app = app();
        app.last_connected_address = Some("AA:BB:CC:DD:EE:FF".to_string());
        app.last_connected_name = Some("Felicita Arc".to_string());

        assert_eq!(app.device_name_for("11:22:33:44:55:66"), None);
    }

    #[test]
    fn reconnecting_same_address_keeps_remembered_name() {
        let mut app = app();
        app.last_connected_address = Some("AA:BB:CC:DD:EE:FF".to_string());
        app.last_connected_name = Some("Felicita Arc".to_string());

        assert_eq!(
            app.device_name_for("aa:bb:cc:dd:ee:ff").as_deref(),
            Some("Felicita Arc")
        );
    }

    #[test]
    fn scan_result_name_wins_for_matching_address() {
        let mut app = app();
        app.scanned_devices.push(ScannedDevice {
            name: "FELICITA".to_string(),
            address: "11:22:33:44:55:66".to_string(),
            signal_strength: -60,
        });

        assert_eq!(
            app.device_name_for("11:22:33:44:55:66").as_deref(),
            Some("FELICITA")
        );
    }
}
