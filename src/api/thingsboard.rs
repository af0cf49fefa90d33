use super::{Gateway, GatewayError, Session};
use crate::libs::config::ConfigModule;
use crate::libs::data_storage::DataStorage;
use crate::libs::effects::{DeviceCommand, TelemetryRecord};
use crate::libs::messages::Message;
use crate::libs::presence::{parse_distance, parse_presence, PresenceSample};
use crate::{msg_print, msg_warning};
use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

const SESSION_FILE: &str = ".tb_token";
const AUTH_URL: &str = "api/auth/login";
const PRESENCE_KEYS: &str = "distance,presence";
const RPC_TIMEOUT_MS: u64 = 5000;
const AUTH_HEADER: &str = "X-Authorization";

#[derive(Serialize, Clone, Debug)]
struct LoginCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize, Debug)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize, Debug)]
struct TimeseriesPoint {
    #[allow(dead_code)]
    ts: Option<i64>,
    value: Value,
}

#[derive(Serialize, Debug)]
struct RpcRequest<'a> {
    method: &'a str,
    params: &'a crate::libs::effects::DeviceCommandParams,
    timeout: u64,
}

#[derive(Debug)]
pub struct ThingsBoard {
    client: Client,
    config: ThingsBoardConfig,
    storage: DataStorage,
}

impl Session for ThingsBoard {
    fn session_file(&self) -> &str {
        SESSION_FILE
    }

    fn storage(&self) -> &DataStorage {
        &self.storage
    }
}

impl ThingsBoard {
    pub fn new(config: &ThingsBoardConfig, timeout: Duration) -> Result<Self> {
        Self::with_storage(config, timeout, DataStorage::new())
    }

    pub fn with_storage(config: &ThingsBoardConfig, timeout: Duration, storage: DataStorage) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            config: config.clone(),
            storage,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.host.trim_end_matches('/'), path)
    }

    /// Logs in and caches the token for later runs.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String> {
        let token = self.login(email, password).await?;
        self.write_token(&token)?;
        Ok(token)
    }

    /// Sends a request carrying the cached user token.
    ///
    /// A `401` discards the token; the call is not retried.
    async fn send_authorized(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.read_token()?;
        let response = request.header(AUTH_HEADER, format!("Bearer {}", token)).send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                self.delete_token()?;
                msg_warning!(Message::SessionTokenRejected);
                Err(GatewayError::Unauthorized.into())
            }
            status if !status.is_success() => Err(GatewayError::Status(status.as_u16()).into()),
            _ => Ok(response),
        }
    }
}

impl Gateway for ThingsBoard {
    async fn login(&self, email: &str, password: &str) -> Result<String> {
        let credentials = LoginCredentials {
            username: email,
            password,
        };
        let response = self.client.post(self.url(AUTH_URL)).json(&credentials).send().await?;

        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status().as_u16()).into());
        }

        let body = response.json::<LoginResponse>().await?;
        Ok(body.token)
    }

    async fn fetch_presence(&self) -> Result<PresenceSample> {
        let url = self.url(&format!(
            "api/plugins/telemetry/DEVICE/{}/values/timeseries?keys={}",
            self.config.device_id, PRESENCE_KEYS
        ));
        let response = self.send_authorized(self.client.get(url)).await?;
        let series = response.json::<HashMap<String, Vec<TimeseriesPoint>>>().await?;

        let presence = series
            .get("presence")
            .and_then(|points| points.first())
            .ok_or(GatewayError::MissingPresence)?;
        let distance_cm = series
            .get("distance")
            .and_then(|points| points.first())
            .and_then(|point| parse_distance(&point.value));

        Ok(PresenceSample {
            is_present: parse_presence(&presence.value),
            distance_cm,
        })
    }

    async fn push_telemetry(&self, record: &TelemetryRecord) -> Result<()> {
        let url = self.url(&format!("api/v1/{}/telemetry", self.config.device_token));
        let response = self.client.post(url).json(record).send().await?;

        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status().as_u16()).into());
        }
        Ok(())
    }

    async fn send_device_command(&self, command: &DeviceCommand) -> Result<()> {
        let url = self.url(&format!("api/plugins/rpc/oneway/{}", self.config.device_id));
        let body = RpcRequest {
            method: &command.method,
            params: &command.params,
            timeout: RPC_TIMEOUT_MS,
        };
        self.send_authorized(self.client.post(url).json(&body)).await?;
        Ok(())
    }
}

/// Remote platform settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ThingsBoardConfig {
    pub host: String,
    pub email: String,
    pub device_id: String,
    pub device_token: String,
}

impl Default for ThingsBoardConfig {
    fn default() -> Self {
        Self {
            host: "https://thingsboard.cloud".to_string(),
            email: String::new(),
            device_id: String::new(),
            device_token: String::new(),
        }
    }
}

impl ThingsBoardConfig {
    pub fn module() -> ConfigModule {
        ConfigModule {
            key: "thingsboard".to_string(),
            name: Message::ConfigModuleThingsBoard.to_string(),
        }
    }

    pub fn init(config: &Option<Self>) -> Result<Self> {
        let config = config.clone().unwrap_or_default();
        msg_print!(Message::ConfigModuleThingsBoard);
        Ok(Self {
            host: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptThingsBoardHost.to_string())
                .default(config.host)
                .interact_text()?,
            email: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptThingsBoardEmail.to_string())
                .default(config.email)
                .allow_empty(true)
                .interact_text()?,
            device_id: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptThingsBoardDeviceId.to_string())
                .default(config.device_id)
                .allow_empty(true)
                .interact_text()?,
            device_token: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptThingsBoardDeviceToken.to_string())
                .default(config.device_token)
                .allow_empty(true)
                .interact_text()?,
        })
    }
}
