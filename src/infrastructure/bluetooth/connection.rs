//! BLE Connection Module
//!
//! Handles locating the scale, connecting with retries, and subscribing to
//! its telemetry characteristic.

use crate::domain::models::{AppEvent, MessageSeverity, StatusMessage};
use crate::infrastructure::bluetooth::protocol;
use anyhow::{Context, Result};
use btleplug::api::{Central, Characteristic, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Configuration for connection behavior
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for a single connection attempt
    pub connect_timeout: Duration,
    /// Maximum connection attempts before giving up
    pub max_retries: u32,
    /// Delay between attempts
    pub retry_delay: Duration,
    /// Service UUID to look for
    pub service_uuid: String,
    /// Telemetry/command characteristic UUID
    pub char_uuid: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            service_uuid: protocol::SERVICE_UUID.to_string(),
            char_uuid: protocol::CHAR_UUID.to_string(),
        }
    }
}

/// Result of a successful connection
pub struct ConnectionResult {
    pub peripheral: Peripheral,
    pub characteristic: Characteristic,
}

/// BLE Connection handler
pub struct BleConnection {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    config: ConnectionConfig,
}

impl BleConnection {
    /// Create a new connection handler
    pub fn new(event_sender: mpsc::UnboundedSender<AppEvent>, config: ConnectionConfig) -> Self {
        Self {
            event_sender,
            config,
        }
    }

    /// Connect to a scale by Bluetooth address, retrying on failure.
    pub async fn connect(&self, adapter: &Adapter, address: &str) -> Result<ConnectionResult> {
        info!("Connecting to Bluetooth device: {}", address);
        self.send_log("Connecting to scale...", MessageSeverity::Info);

        let mut last_error = None;
        for attempt in 1..=self.config.max_retries {
            match self.try_connect(adapter, address).await {
                Ok(result) => {
                    info!("Connected on attempt {}", attempt);
                    self.send_log("Connection established!", MessageSeverity::Success);
                    return Ok(result);
                }
                Err(error) => {
                    warn!("Connection attempt {} failed: {:#}", attempt, error);
                    last_error = Some(error);
                    if attempt < self.config.max_retries {
                        self.send_log(
                            &format!("Connection attempt {} failed, retrying...", attempt),
                            MessageSeverity::Warning,
                        );
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        let error = last_error.unwrap_or_else(|| anyhow::anyhow!("no connection attempts made"));
        Err(error.context(format!(
            "failed to connect after {} attempts",
            self.config.max_retries
        )))
    }

    async fn try_connect(&self, adapter: &Adapter, address: &str) -> Result<ConnectionResult> {
        let peripheral = self.find_peripheral(adapter, address).await?;

        tokio::time::timeout(self.config.connect_timeout, peripheral.connect())
            .await
            .context("connection attempt timed out")?
            .context("connection failed")?;
        info!("Device connected, discovering services...");

        peripheral
            .discover_services()
            .await
            .context("service discovery failed")?;

        let characteristic = self.find_characteristic(&peripheral)?;

        peripheral
            .subscribe(&characteristic)
            .await
            .context("failed to enable telemetry notifications")?;
        info!("Telemetry notifications enabled");

        Ok(ConnectionResult {
            peripheral,
            characteristic,
        })
    }

    /// Locate a previously discovered peripheral by address.
    async fn find_peripheral(&self, adapter: &Adapter, address: &str) -> Result<Peripheral> {
        for peripheral in adapter.peripherals().await? {
            if let Ok(Some(props)) = peripheral.properties().await {
                if props.address.to_string().eq_ignore_ascii_case(address) {
                    return Ok(peripheral);
                }
            }
        }
        anyhow::bail!("could not find device with address {address}; scan first")
    }

    fn find_characteristic(&self, peripheral: &Peripheral) -> Result<Characteristic> {
        let service_uuid = protocol::parse_uuid(&self.config.service_uuid)?;
        let char_uuid = protocol::parse_uuid(&self.config.char_uuid)?;

        if !peripheral
            .services()
            .iter()
            .any(|service| service.uuid == service_uuid)
        {
            anyhow::bail!("scale service not found on device");
        }
        info!("Found scale service");

        peripheral
            .characteristics()
            .into_iter()
            .find(|characteristic| characteristic.uuid == char_uuid)
            .ok_or_else(|| anyhow::anyhow!("scale characteristic not found"))
    }

    /// Send a log message
    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
            message: message.to_string(),
            severity,
        }));
    }
}
