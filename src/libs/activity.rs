//! Foreground application lookup.
//!
//! [`ActivitySource`] is what the activity sampler needs from the operating
//! system: the application owning the focused window and, on request, its
//! icon as an image data URL. [`SystemActivitySource`] implements it on X11
//! desktops with `xdotool` for the window and `sysinfo` for the owning
//! process. On other platforms it reports no window, which the sampler
//! treats as nothing to record.

use crate::libs::messages::Message;
use crate::msg_debug;
use anyhow::{Context, Result};
use base64::prelude::*;
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::process::Command;

/// Focused window and the application that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct ForegroundWindow {
    /// Stable application identity, usually the executable path.
    pub app_id: String,
    /// Display name the ledger is keyed by.
    pub app_name: String,
    pub window_title: String,
}

#[allow(async_fn_in_trait)]
pub trait ActivitySource {
    /// Currently focused window, `None` when nothing can be determined.
    async fn foreground_window(&mut self) -> Option<ForegroundWindow>;

    /// Icon for `app_id` as a data URL, `None` when unavailable.
    async fn resolve_icon(&mut self, app_id: &str) -> Option<String>;
}

pub struct SystemActivitySource {
    system: System,
    icon_dirs: Vec<PathBuf>,
}

impl Default for SystemActivitySource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemActivitySource {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            icon_dirs: vec![
                PathBuf::from("/usr/share/pixmaps"),
                PathBuf::from("/usr/share/icons/hicolor/48x48/apps"),
                PathBuf::from("/usr/share/icons/hicolor/128x128/apps"),
            ],
        }
    }

    /// Source that searches `icon_dirs` for `<app>.png` icons.
    pub fn with_icon_dirs(icon_dirs: Vec<PathBuf>) -> Self {
        Self {
            system: System::new(),
            icon_dirs,
        }
    }

    async fn xdotool(args: &[&str]) -> Result<String> {
        let output = Command::new("xdotool")
            .args(args)
            .output()
            .await
            .context("failed to run xdotool")?;

        if !output.status.success() {
            anyhow::bail!("xdotool exited with {}", output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn query_window(&mut self) -> Result<Option<ForegroundWindow>> {
        if !cfg!(target_os = "linux") {
            return Ok(None);
        }

        let pid: u32 = Self::xdotool(&["getactivewindow", "getwindowpid"])
            .await?
            .parse()
            .context("xdotool returned an invalid pid")?;
        let window_title = Self::xdotool(&["getactivewindow", "getwindowname"]).await.unwrap_or_default();

        let pid = Pid::from_u32(pid);
        self.system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let Some(process) = self.system.process(pid) else {
            return Ok(None);
        };

        let app_name = process.name().to_string_lossy().to_string();
        let app_id = process
            .exe()
            .map(|path| path.to_string_lossy().to_string())
            .unwrap_or_else(|| app_name.clone());

        Ok(Some(ForegroundWindow {
            app_id,
            app_name,
            window_title,
        }))
    }
}

/// Encodes PNG bytes as a data URL.
pub fn png_data_url(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64_STANDARD.encode(bytes))
}

fn icon_stem(app_id: &str) -> Option<String> {
    Path::new(app_id)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
        .filter(|stem| !stem.is_empty())
}

impl ActivitySource for SystemActivitySource {
    async fn foreground_window(&mut self) -> Option<ForegroundWindow> {
        match self.query_window().await {
            Ok(window) => window,
            Err(e) => {
                msg_debug!(Message::ForegroundWindowFailed(e.to_string()));
                None
            }
        }
    }

    async fn resolve_icon(&mut self, app_id: &str) -> Option<String> {
        let stem = icon_stem(app_id)?;

        for dir in &self.icon_dirs {
            let candidate = dir.join(format!("{}.png", stem));
            if !candidate.exists() {
                continue;
            }
            match tokio::fs::read(&candidate).await {
                Ok(bytes) if !bytes.is_empty() => return Some(png_data_url(&bytes)),
                Ok(_) => continue,
                Err(e) => msg_debug!(Message::IconResolveFailed {
                    app: app_id.to_string(),
                    error: e.to_string(),
                }),
            }
        }

        None
    }
}
