//! Bluetooth Module
//!
//! Provides BLE communication with the Felicita scale.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BluetoothService                      │
//! │  (Main coordinator - public API for the application)     │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────┐
//! │  Scanner  │  │ Connection │  │ Protocol │
//! │           │  │            │  │          │
//! │ - BLE     │  │ - Retries  │  │ - UUIDs  │
//! │   discovery│ │ - GATT     │  │ - Commands│
//! │           │  │   access   │  │ - Framing │
//! └───────────┘  └────────────┘  └──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Scale protocol definitions, commands, and frame decoding
//! - [`scanner`] - BLE device discovery
//! - [`connection`] - Device connection and characteristic subscription
//! - [`service`] - Main service coordinator

pub mod connection;
pub mod protocol;
pub mod scanner;
pub mod service;

// Re-export main service for convenience
pub use service::BluetoothService;
