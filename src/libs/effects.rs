//! Side-effect intents and their dispatcher.
//!
//! State transitions in the session controller never perform I/O. They
//! return a list of [`Effect`]s which the watch loop forwards to a single
//! [`Dispatcher`] task over an unbounded channel. The dispatcher executes
//! them in order against a [`Gateway`] and logs failures without retrying,
//! so a slow or unreachable platform can never stall the timer.

use crate::api::Gateway;
use crate::libs::messages::Message;
use crate::{msg_debug, msg_info, msg_warning};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// RPC method used for every session state command.
pub const SET_SESSION_STATE: &str = "setSessionState";

/// Timer status reported in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "IDLE",
            SessionStatus::Running => "RUNNING",
            SessionStatus::Paused => "PAUSED",
            SessionStatus::Completed => "COMPLETED",
        }
    }

    /// Status shown by the companion device. It has no completed state.
    pub fn device_status(&self) -> &'static str {
        match self {
            SessionStatus::Running => "RUNNING",
            SessionStatus::Paused => "PAUSED",
            SessionStatus::Idle | SessionStatus::Completed => "IDLE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub status: SessionStatus,
    pub time_left: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommandParams {
    pub status: String,
    pub duration_sec: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub method: String,
    pub params: DeviceCommandParams,
}

impl DeviceCommand {
    pub fn session_state(status: &str, duration_sec: u64) -> Self {
        Self {
            method: SET_SESSION_STATE.to_string(),
            params: DeviceCommandParams {
                status: status.to_string(),
                duration_sec,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub enum Effect {
    Telemetry(TelemetryRecord),
    DeviceCommand(DeviceCommand),
    Notify(Message),
}

pub type EffectSender = UnboundedSender<Effect>;

/// Executes effects one at a time against a gateway.
pub struct Dispatcher<G: Gateway> {
    gateway: Arc<G>,
    receiver: UnboundedReceiver<Effect>,
}

impl<G: Gateway> Dispatcher<G> {
    pub fn new(gateway: Arc<G>) -> (EffectSender, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self { gateway, receiver })
    }

    /// Spawns the dispatcher on the runtime. The task ends once every
    /// sender has been dropped and the queue is drained.
    pub fn spawn(gateway: Arc<G>) -> (EffectSender, JoinHandle<()>) {
        let (sender, dispatcher) = Self::new(gateway);
        (sender, tokio::spawn(dispatcher.run()))
    }

    pub async fn run(mut self) {
        while let Some(effect) = self.receiver.recv().await {
            dispatch(self.gateway.as_ref(), effect).await;
        }
        msg_debug!(Message::DispatcherStopped);
    }
}

/// Executes a single effect, logging and dropping any failure.
pub async fn dispatch<G: Gateway>(gateway: &G, effect: Effect) {
    match effect {
        Effect::Telemetry(record) => match gateway.push_telemetry(&record).await {
            Ok(()) => msg_debug!(Message::TelemetryPushed {
                status: record.status.as_str().to_string(),
                time_left: record.time_left,
            }),
            Err(e) => msg_warning!(Message::TelemetryPushFailed(e.to_string())),
        },
        Effect::DeviceCommand(command) => match gateway.send_device_command(&command).await {
            Ok(()) => msg_debug!(Message::DeviceCommandSent {
                status: command.params.status.clone(),
                duration_sec: command.params.duration_sec,
            }),
            Err(e) => msg_warning!(Message::DeviceCommandFailed {
                method: command.method.clone(),
                error: e.to_string(),
            }),
        },
        Effect::Notify(message) => msg_info!(message),
    }
}
