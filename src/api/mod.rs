//! Remote platform integration.
//!
//! The watch loop talks to the outside world through the [`Gateway`] trait:
//! it reads the presence sensor, pushes timer telemetry and sends commands to
//! the companion device. [`thingsboard::ThingsBoard`] is the production
//! implementation; tests substitute in-memory gateways.
//!
//! Authenticated calls share the [`Session`] token cache. A token obtained by
//! `truefocus login` is written to a file in the data directory and reused
//! until the platform answers `401`, at which point the file is removed and
//! the user has to log in again. Calls are never retried.

use crate::libs::data_storage::DataStorage;
use crate::libs::effects::{DeviceCommand, TelemetryRecord};
use crate::libs::presence::PresenceSample;
use anyhow::Result;
use std::fs;
use std::future::Future;
use std::io::Write;
use thiserror::Error;

pub mod thingsboard;

pub use thingsboard::{ThingsBoard, ThingsBoardConfig};

/// Failures specific to the remote platform.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no cached session token, run 'truefocus login'")]
    NotAuthenticated,

    #[error("session token rejected by the platform")]
    Unauthorized,

    #[error("request failed with HTTP status {0}")]
    Status(u16),

    #[error("device response has no presence series")]
    MissingPresence,

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Abstract remote collaborator used by the watch loop.
///
/// Futures are `Send` so the outbound dispatcher can run them on its own
/// task.
pub trait Gateway: Send + Sync + 'static {
    /// Authenticates and returns a session token.
    fn login(&self, email: &str, password: &str) -> impl Future<Output = Result<String>> + Send;

    /// Reads the latest presence and distance values.
    fn fetch_presence(&self) -> impl Future<Output = Result<PresenceSample>> + Send;

    /// Pushes one telemetry record.
    fn push_telemetry(&self, record: &TelemetryRecord) -> impl Future<Output = Result<()>> + Send;

    /// Sends a one-way command to the companion device.
    fn send_device_command(&self, command: &DeviceCommand) -> impl Future<Output = Result<()>> + Send;
}

/// File-backed session token cache.
pub trait Session {
    /// Name of the token file inside the data directory.
    fn session_file(&self) -> &str;

    /// Storage the token file lives in.
    fn storage(&self) -> &DataStorage;

    /// Reads the cached token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotAuthenticated`] when there is no token.
    fn read_token(&self) -> Result<String> {
        let path = self.storage().get_path(self.session_file())?;
        let token = fs::read_to_string(path).unwrap_or_default();
        let token = token.trim();
        if token.is_empty() {
            return Err(GatewayError::NotAuthenticated.into());
        }
        Ok(token.to_string())
    }

    fn write_token(&self, token: &str) -> Result<()> {
        let path = self.storage().get_path(self.session_file())?;
        let mut file = fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        file.write_all(token.as_bytes())?;
        Ok(())
    }

    /// Removes the cached token. A missing file is not an error.
    fn delete_token(&self) -> Result<()> {
        let path = self.storage().get_path(self.session_file())?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
