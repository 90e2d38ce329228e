//! BLE Scanner Module
//!
//! Handles Bluetooth LE device discovery for Felicita scales.

use crate::domain::models::{AppEvent, MessageSeverity, ScannedDevice, StatusMessage};
use crate::infrastructure::bluetooth::protocol;
use anyhow::Result;
use btleplug::api::{Central, CentralEvent, Peripheral as _, ScanFilter};
use btleplug::platform::Adapter;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

/// Decide whether a discovered advertiser should be reported. Older scale
/// firmware does not advertise the service UUID, so a FELICITA name prefix
/// counts as a match too.
fn device_matches(show_all: bool, services: &[Uuid], name: &str, target_uuid: &Uuid) -> bool {
    show_all
        || services.contains(target_uuid)
        || name.to_uppercase().starts_with(protocol::DEVICE_NAME)
}

/// BLE Scanner for discovering Felicita scales
pub struct BleScanner {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    scan_task: Option<JoinHandle<()>>,
}

impl BleScanner {
    /// Create a new scanner
    pub fn new(event_sender: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            event_sender,
            scan_task: None,
        }
    }

    /// Start scanning for BLE devices
    ///
    /// # Arguments
    /// * `service_uuid` - The scale service UUID to filter for
    /// * `show_all_devices` - If true, report every advertiser regardless of
    ///   service UUID
    pub async fn start(
        &mut self,
        adapter: &Adapter,
        service_uuid: &str,
        show_all_devices: bool,
    ) -> Result<()> {
        // Stop any existing scan
        if self.is_scanning() {
            self.stop(adapter).await?;
        }

        let target_uuid = protocol::parse_uuid(service_uuid)?;
        info!("Starting BLE scan for service UUID: {}", service_uuid);

        let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
            message: "Scanning for Felicita scale...".to_string(),
            severity: MessageSeverity::Info,
        }));

        // Scan unfiltered: older scale firmware omits the service UUID from
        // advertisements, and a platform-level UUID filter would hide those
        // devices entirely on backends that enforce it. Matching happens in
        // the event loop instead.
        let mut events = adapter.events().await?;
        adapter.start_scan(ScanFilter::default()).await?;

        let sender = self.event_sender.clone();
        let central = adapter.clone();
        self.scan_task = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => continue,
                };

                let Ok(peripheral) = central.peripheral(&id).await else {
                    continue;
                };
                let Ok(Some(props)) = peripheral.properties().await else {
                    continue;
                };

                let name = props.local_name.unwrap_or_default();
                if !device_matches(show_all_devices, &props.services, &name, &target_uuid) {
                    continue;
                }

                let device = ScannedDevice {
                    name: if name.is_empty() {
                        "Unknown".to_string()
                    } else {
                        name
                    },
                    address: props.address.to_string(),
                    signal_strength: props.rssi.unwrap_or(0),
                };

                let _ = sender.send(AppEvent::DeviceFound(device));
            }
        }));

        Ok(())
    }

    /// Stop scanning
    pub async fn stop(&mut self, adapter: &Adapter) -> Result<()> {
        if let Some(task) = self.scan_task.take() {
            info!("Stopping BLE scan...");
            task.abort();
            adapter.stop_scan().await?;
            let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
                message: "Scan stopped.".to_string(),
                severity: MessageSeverity::Info,
            }));
        }
        Ok(())
    }

    /// Check if currently scanning
    pub fn is_scanning(&self) -> bool {
        self.scan_task.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Uuid {
        protocol::parse_uuid(protocol::SERVICE_UUID).unwrap()
    }

    #[test]
    fn matches_advertised_service_uuid() {
        assert!(device_matches(false, &[target()], "", &target()));
    }

    #[test]
    fn matches_felicita_name_without_service_uuid() {
        // Old firmware: no service UUIDs in the advertisement at all.
        assert!(device_matches(false, &[], "FELICITA", &target()));
        assert!(device_matches(false, &[], "Felicita Arc", &target()));
    }

    #[test]
    fn ignores_unrelated_devices() {
        let other = Uuid::from_u128(0xdead_beef);
        assert!(!device_matches(false, &[other], "Kitchen TV", &target()));
    }

    #[test]
    fn show_all_reports_everything() {
        assert!(device_matches(true, &[], "", &target()));
    }
}
