/// Weight unit reported by the scale.
///
/// The Felicita Arc only switches between grams and ounces; the displayed
/// value keeps two decimals in either unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WeightUnit {
    #[default]
    Grams,
    Ounces,
}

impl WeightUnit {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Grams => "g",
            Self::Ounces => "oz",
        }
    }

    pub fn flow_label(&self) -> &'static str {
        match self {
            Self::Grams => "g/s",
            Self::Ounces => "oz/s",
        }
    }

    /// Parse the unit tag as it appears in a telemetry frame.
    pub fn from_frame(tag: &str) -> Option<Self> {
        match tag {
            "g" => Some(Self::Grams),
            "oz" => Some(Self::Ounces),
            _ => None,
        }
    }
}

/// One decoded telemetry reading from the scale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleReading {
    /// Weight in the active unit, two-decimal resolution.
    pub weight: f64,
    pub unit: WeightUnit,
    pub battery_percent: u8,
}

/// Control commands the scale accepts. Wire encoding lives in the
/// protocol module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleCommand {
    Tare,
    StartTimer,
    StopTimer,
    ResetTimer,
    ToggleUnit,
    /// Switches display resolution. Only new-style firmware responds.
    TogglePrecision,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Reading(ScaleReading),
    RawFrame(Vec<u8>),
    ConnectionStatus(ConnectionStatus),
    LogMessage(StatusMessage),
    DeviceFound(ScannedDevice),
}

#[derive(Debug, Clone)]
pub enum BluetoothCommand {
    Connect(String),
    Disconnect,
    StartScan,
    StopScan,
    Send(ScaleCommand),
}

#[derive(Debug, Clone)]
pub struct ScannedDevice {
    pub name: String,
    pub address: String,
    pub signal_strength: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    Settings,
    Debug,
}
