//! Bluetooth Service Module
//!
//! Main service that coordinates scanning, connection, telemetry decoding
//! and command writes for the Felicita scale.

use crate::domain::models::{
    AppEvent, ConnectionStatus, MessageSeverity, ScaleCommand, StatusMessage, WeightUnit,
};
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::{
    connection::{BleConnection, ConnectionConfig, ConnectionResult},
    protocol,
    scanner::BleScanner,
};
use anyhow::Result;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Main Bluetooth service coordinating all BLE operations
pub struct BluetoothService {
    adapter: Adapter,
    peripheral: Option<Peripheral>,
    characteristic: Option<btleplug::api::Characteristic>,
    notify_task: Option<JoinHandle<()>>,
    status_task: Option<JoinHandle<()>>,
    scanner: BleScanner,
    event_sender: mpsc::UnboundedSender<AppEvent>,
    settings: Arc<Mutex<SettingsService>>,
}

impl BluetoothService {
    /// Create a new Bluetooth service on the first available adapter
    pub async fn new(
        event_sender: mpsc::UnboundedSender<AppEvent>,
        settings: Arc<Mutex<SettingsService>>,
    ) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no Bluetooth adapter found"))?;

        Ok(Self {
            adapter,
            peripheral: None,
            characteristic: None,
            notify_task: None,
            status_task: None,
            scanner: BleScanner::new(event_sender.clone()),
            event_sender,
            settings,
        })
    }

    /// Start scanning for scales
    pub async fn start_scan(&mut self) -> Result<()> {
        let (service_uuid, show_all) = {
            let settings = self
                .settings
                .lock()
                .map_err(|_| anyhow::anyhow!("Lock error"))?;
            let s = settings.get();
            (s.ble_service_uuid.clone(), s.debug_show_all_devices)
        };

        self.scanner.start(&self.adapter, &service_uuid, show_all).await
    }

    /// Stop scanning
    pub async fn stop_scan(&mut self) -> Result<()> {
        self.scanner.stop(&self.adapter).await
    }

    /// Connect to a scale by address
    pub async fn connect(&mut self, address: &str) -> Result<()> {
        // Get configuration from settings
        let (config, new_style, raw_logging) = {
            let settings = self
                .settings
                .lock()
                .map_err(|_| anyhow::anyhow!("Lock error"))?;
            let s = settings.get();
            (
                ConnectionConfig {
                    connect_timeout: Duration::from_secs(s.connect_timeout_secs),
                    max_retries: s.connect_max_retries,
                    retry_delay: Duration::from_millis(s.connect_retry_delay_ms),
                    service_uuid: s.ble_service_uuid.clone(),
                    char_uuid: s.ble_char_uuid.clone(),
                },
                s.is_new_style_scale,
                s.debug_raw_frame_logging,
            )
        };

        // Create connection handler and connect
        let connection = BleConnection::new(self.event_sender.clone(), config);
        let result = connection.connect(&self.adapter, address).await?;

        // Forward telemetry and watch for disconnects
        self.spawn_notification_task(&result, new_style, raw_logging)
            .await?;
        self.spawn_status_task(&result).await?;

        // Store references
        self.peripheral = Some(result.peripheral);
        self.characteristic = Some(result.characteristic);

        // Notify connection success
        let _ = self
            .event_sender
            .send(AppEvent::ConnectionStatus(ConnectionStatus::Connected));

        Ok(())
    }

    /// Forward decoded telemetry frames as events
    async fn spawn_notification_task(
        &mut self,
        result: &ConnectionResult,
        new_style: bool,
        raw_logging: bool,
    ) -> Result<()> {
        let mut notifications = result.peripheral.notifications().await?;
        let char_uuid = result.characteristic.uuid;
        let sender = self.event_sender.clone();

        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
        self.notify_task = Some(tokio::spawn(async move {
            let mut last_unit = WeightUnit::default();
            while let Some(notification) = notifications.next().await {
                if notification.uuid != char_uuid {
                    continue;
                }

                if raw_logging {
                    trace!("Raw frame: {:02X?}", notification.value);
                    let _ = sender.send(AppEvent::RawFrame(notification.value.clone()));
                }

                match protocol::decode_frame(&notification.value, new_style, last_unit) {
                    Ok(reading) => {
                        last_unit = reading.unit;
                        let _ = sender.send(AppEvent::Reading(reading));
                    }
                    Err(error) => warn!("Dropping scale frame: {}", error),
                }
            }
        }));

        Ok(())
    }

    /// Surface unsolicited disconnects as a status change
    async fn spawn_status_task(&mut self, result: &ConnectionResult) -> Result<()> {
        let mut events = self.adapter.events().await?;
        let device_id = result.peripheral.id();
        let sender = self.event_sender.clone();

        if let Some(task) = self.status_task.take() {
            task.abort();
        }
        self.status_task = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(id) = event {
                    if id == device_id {
                        warn!("Scale disconnected");
                        let _ = sender.send(AppEvent::ConnectionStatus(
                            ConnectionStatus::Disconnected,
                        ));
                        break;
                    }
                }
            }
        }));

        Ok(())
    }

    /// Write a control command to the scale
    pub async fn send_command(&mut self, command: ScaleCommand) -> Result<()> {
        if !self.is_connected().await {
            anyhow::bail!("not connected to a scale");
        }
        let (Some(peripheral), Some(characteristic)) =
            (self.peripheral.as_ref(), self.characteristic.as_ref())
        else {
            anyhow::bail!("not connected to a scale");
        };

        let payload = [protocol::command_byte(command)];
        peripheral
            .write(characteristic, &payload, WriteType::WithoutResponse)
            .await?;
        debug!("Sent {:?} ({:#04x})", command, payload[0]);
        Ok(())
    }

    /// Disconnect from the current scale
    pub async fn disconnect(&mut self) {
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
        if let Some(task) = self.status_task.take() {
            task.abort();
        }
        self.characteristic = None;

        if let Some(peripheral) = self.peripheral.take() {
            let _ = peripheral.disconnect().await;
        } else {
            return;
        }

        info!("Disconnected from scale");
        let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
            message: "Disconnected from scale".to_string(),
            severity: MessageSeverity::Info,
        }));
        let _ = self
            .event_sender
            .send(AppEvent::ConnectionStatus(ConnectionStatus::Disconnected));
    }

    /// Check if connected
    pub async fn is_connected(&self) -> bool {
        match self.peripheral.as_ref() {
            Some(peripheral) => peripheral.is_connected().await.unwrap_or(false),
            None => false,
        }
    }
}
