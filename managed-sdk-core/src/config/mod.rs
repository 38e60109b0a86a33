//! Configuration for managed SDK installs.

mod settings;

pub use settings::{default_managed_root, Settings, SettingsError};
