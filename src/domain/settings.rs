use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_logging_enabled: default_true(),
            file_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            rotation: default_rotation(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "felicita_scale".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Newer Arc firmware reports battery as a plain percentage and supports
    /// the precision toggle; older units use a raw 129..158 battery band.
    #[serde(default = "default_false")]
    pub is_new_style_scale: bool,

    #[serde(default)]
    pub known_device_addresses: Vec<String>,
    #[serde(default)]
    pub last_connected_address: Option<String>,
    #[serde(default)]
    pub last_connected_name: Option<String>,

    // Connection tuning
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_connect_max_retries")]
    pub connect_max_retries: u32,
    #[serde(default = "default_connect_retry_delay_ms")]
    pub connect_retry_delay_ms: u64,

    // Measurement
    #[serde(default = "default_flow_rate_window_secs")]
    pub flow_rate_window_secs: f64,

    // Advanced BLE Settings
    #[serde(default = "default_service_uuid")]
    pub ble_service_uuid: String,
    #[serde(default = "default_char_uuid")]
    pub ble_char_uuid: String,
    #[serde(default = "default_false")]
    pub debug_show_all_devices: bool,
    #[serde(default = "default_false")]
    pub debug_raw_frame_logging: bool,

    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            is_new_style_scale: false,
            known_device_addresses: Vec::new(),
            last_connected_address: None,
            last_connected_name: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            connect_max_retries: default_connect_max_retries(),
            connect_retry_delay_ms: default_connect_retry_delay_ms(),
            flow_rate_window_secs: default_flow_rate_window_secs(),
            ble_service_uuid: default_service_uuid(),
            ble_char_uuid: default_char_uuid(),
            debug_show_all_devices: false,
            debug_raw_frame_logging: false,
            log_settings: LogSettings::default(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_connect_max_retries() -> u32 {
    3
}
fn default_connect_retry_delay_ms() -> u64 {
    1000
}
fn default_flow_rate_window_secs() -> f64 {
    3.0
}
fn default_service_uuid() -> String {
    "0000ffe0-0000-1000-8000-00805f9b34fb".to_string()
}
fn default_char_uuid() -> String {
    "0000ffe1-0000-1000-8000-00805f9b34fb".to_string()
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();

        Ok(Self {
            settings,
            settings_path,
        })
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("FelicitaScale");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &PathBuf) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn remember_device(&mut self, address: &str, name: Option<&str>) -> anyhow::Result<()> {
        if !self
            .settings
            .known_device_addresses
            .iter()
            .any(|a| a.eq_ignore_ascii_case(address))
        {
            self.settings.known_device_addresses.push(address.to_string());
        }
        self.settings.last_connected_address = Some(address.to_string());
        if let Some(name) = name {
            self.settings.last_connected_name = Some(name.to_string());
        }
        self.save()
    }
}

#[cfg(test)]
impl SettingsService {
    /// Service over defaults whose saves land in a throwaway path.
    pub fn for_tests() -> Self {
        Self {
            settings: Settings::default(),
            settings_path: std::env::temp_dir().join("felicita_scale_test_settings.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_file_yields_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(!settings.is_new_style_scale);
        assert_eq!(settings.connect_timeout_secs, 10);
        assert_eq!(settings.connect_max_retries, 3);
        assert_eq!(
            settings.ble_service_uuid,
            "0000ffe0-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(settings.log_settings.level, "info");
        assert!(!settings.log_settings.show_thread_ids);
        assert!(settings.log_settings.show_target);
    }

    #[test]
    fn test_settings_round_trip() {
        let mut settings = Settings::default();
        settings.is_new_style_scale = true;
        settings.last_connected_address = Some("AA:BB:CC:DD:EE:FF".to_string());
        settings.flow_rate_window_secs = 5.0;

        let json = serde_json::to_string(&settings).unwrap();
        let restored: Settings = serde_json::from_str(&json).unwrap();
        assert!(restored.is_new_style_scale);
        assert_eq!(
            restored.last_connected_address.as_deref(),
            Some("AA:BB:CC:DD:EE:FF")
        );
        assert_eq!(restored.flow_rate_window_secs, 5.0);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        // Files written by an older or newer build keep loading.
        let settings: Settings =
            serde_json::from_str(r#"{"mouse_sensitivity": 2.0, "is_new_style_scale": true}"#)
                .unwrap();
        assert!(settings.is_new_style_scale);
    }
}
