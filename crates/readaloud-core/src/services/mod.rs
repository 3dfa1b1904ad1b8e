//! Application services orchestrating domain types and ports.

mod settings_service;

pub use settings_service::{SettingsChange, SettingsService, SettingsServiceError};
