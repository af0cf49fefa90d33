#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;
    use test_context::{test_context, AsyncTestContext};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use truefocus::api::{Gateway, GatewayError, Session, ThingsBoard, ThingsBoardConfig};
    use truefocus::libs::data_storage::DataStorage;
    use truefocus::libs::effects::{DeviceCommand, SessionStatus, TelemetryRecord};

    struct ApiTestContext {
        temp_dir: TempDir,
        client: ThingsBoard,
    }

    fn config_for(host: &str) -> ThingsBoardConfig {
        ThingsBoardConfig {
            host: host.to_string(),
            email: "user@example.com".to_string(),
            device_id: "device-1".to_string(),
            device_token: "device-token".to_string(),
        }
    }

    impl AsyncTestContext for ApiTestContext {
        async fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let client = ThingsBoard::with_storage(
                &config_for("http://127.0.0.1:9"),
                Duration::from_millis(200),
                DataStorage::at(temp_dir.path()),
            )
            .unwrap();

            ApiTestContext { temp_dir, client }
        }

        async fn teardown(self) {
            // TempDir cleans up on drop
        }
    }

    impl ApiTestContext {
        /// Points the client at `host`, sharing the same token storage.
        fn connect(&mut self, host: &str) {
            self.client = ThingsBoard::with_storage(
                &config_for(host),
                Duration::from_secs(5),
                DataStorage::at(self.temp_dir.path()),
            )
            .unwrap();
        }
    }

    /// One request as seen by the stub server.
    #[derive(Debug)]
    struct RecordedRequest {
        method: String,
        target: String,
        /// Header names are lowercased.
        headers: HashMap<String, String>,
        body: String,
    }

    impl RecordedRequest {
        fn json(&self) -> Value {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    /// Local HTTP server answering each connection with the next canned
    /// `(status, body)` pair. The handle yields the requests it received.
    async fn stub_server(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<RecordedRequest>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut recorded = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                recorded.push(read_request(&mut stream).await);

                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
            recorded
        });

        (host, handle)
    }

    async fn read_request(stream: &mut TcpStream) -> RecordedRequest {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];

        let head_len = loop {
            let read = stream.read(&mut chunk).await.unwrap();
            assert!(read > 0, "connection closed before the request head");
            buffer.extend_from_slice(&chunk[..read]);
            if let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
                break end + 4;
            }
        };

        let head = String::from_utf8_lossy(&buffer[..head_len]).to_string();
        let mut lines = head.split("\r\n");
        let mut request_line = lines.next().unwrap().split(' ');
        let method = request_line.next().unwrap().to_string();
        let target = request_line.next().unwrap().to_string();
        let headers: HashMap<String, String> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_lowercase(), value.trim().to_string()))
            .collect();

        let content_length = headers
            .get("content-length")
            .map(|length| length.parse::<usize>().unwrap())
            .unwrap_or(0);
        while buffer.len() < head_len + content_length {
            let read = stream.read(&mut chunk).await.unwrap();
            assert!(read > 0, "connection closed before the request body");
            buffer.extend_from_slice(&chunk[..read]);
        }
        let body = String::from_utf8_lossy(&buffer[head_len..head_len + content_length]).to_string();

        RecordedRequest {
            method,
            target,
            headers,
            body,
        }
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_missing_token_is_not_authenticated(ctx: &mut ApiTestContext) {
        let err = ctx.client.read_token().unwrap_err();
        assert!(matches!(err.downcast_ref::<GatewayError>(), Some(GatewayError::NotAuthenticated)));
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_token_round_trip(ctx: &mut ApiTestContext) {
        ctx.client.write_token("jwt-token").unwrap();
        assert_eq!(ctx.client.read_token().unwrap(), "jwt-token");
        assert!(ctx.temp_dir.path().join(ctx.client.session_file()).exists());

        ctx.client.write_token("short").unwrap();
        assert_eq!(ctx.client.read_token().unwrap(), "short");
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_delete_token_is_idempotent(ctx: &mut ApiTestContext) {
        ctx.client.write_token("jwt-token").unwrap();
        ctx.client.delete_token().unwrap();
        ctx.client.delete_token().unwrap();
        assert!(ctx.client.read_token().is_err());
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_blank_token_file_is_not_authenticated(ctx: &mut ApiTestContext) {
        ctx.client.write_token("  \n").unwrap();
        assert!(ctx.client.read_token().is_err());
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_presence_requires_login(ctx: &mut ApiTestContext) {
        let err = ctx.client.fetch_presence().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<GatewayError>(), Some(GatewayError::NotAuthenticated)));
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_authenticate_stores_token(ctx: &mut ApiTestContext) {
        let (host, server) = stub_server(vec![(200, r#"{"token":"jwt-abc","refreshToken":"r"}"#)]).await;
        ctx.connect(&host);

        let token = ctx.client.authenticate("user@example.com", "secret").await.unwrap();
        assert_eq!(token, "jwt-abc");
        assert_eq!(ctx.client.read_token().unwrap(), "jwt-abc");

        let requests = server.await.unwrap();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/api/auth/login");
        assert_eq!(
            requests[0].json(),
            json!({"username": "user@example.com", "password": "secret"})
        );
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_rejected_login_keeps_no_token(ctx: &mut ApiTestContext) {
        let (host, server) = stub_server(vec![(401, r#"{"message":"Invalid username or password"}"#)]).await;
        ctx.connect(&host);

        let err = ctx.client.authenticate("user@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<GatewayError>(), Some(GatewayError::Status(401))));
        assert!(ctx.client.read_token().is_err());
        server.await.unwrap();
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_presence_read_from_timeseries(ctx: &mut ApiTestContext) {
        let (host, server) = stub_server(vec![(
            200,
            r#"{"presence":[{"ts":1717000000000,"value":"true"}],"distance":[{"ts":1717000000000,"value":"48.5"}]}"#,
        )])
        .await;
        ctx.connect(&host);
        ctx.client.write_token("jwt-abc").unwrap();

        let sample = ctx.client.fetch_presence().await.unwrap();
        assert!(sample.is_present);
        assert_eq!(sample.distance_cm, Some(48.5));

        let requests = server.await.unwrap();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(
            requests[0].target,
            "/api/plugins/telemetry/DEVICE/device-1/values/timeseries?keys=distance,presence"
        );
        assert_eq!(requests[0].headers["x-authorization"], "Bearer jwt-abc");
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_missing_presence_series(ctx: &mut ApiTestContext) {
        let (host, server) = stub_server(vec![(200, r#"{"distance":[{"ts":1,"value":"180"}]}"#)]).await;
        ctx.connect(&host);
        ctx.client.write_token("jwt-abc").unwrap();

        let err = ctx.client.fetch_presence().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<GatewayError>(), Some(GatewayError::MissingPresence)));
        // Only a rejected token is discarded.
        assert_eq!(ctx.client.read_token().unwrap(), "jwt-abc");
        server.await.unwrap();
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_unauthorized_deletes_token(ctx: &mut ApiTestContext) {
        let (host, server) = stub_server(vec![(401, r#"{"status":401,"message":"Token has expired"}"#)]).await;
        ctx.connect(&host);
        ctx.client.write_token("expired").unwrap();

        let err = ctx.client.fetch_presence().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<GatewayError>(), Some(GatewayError::Unauthorized)));
        assert!(!ctx.temp_dir.path().join(ctx.client.session_file()).exists());

        let err = ctx.client.read_token().unwrap_err();
        assert!(matches!(err.downcast_ref::<GatewayError>(), Some(GatewayError::NotAuthenticated)));
        server.await.unwrap();
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_server_error_keeps_token(ctx: &mut ApiTestContext) {
        let (host, server) = stub_server(vec![(503, "{}")]).await;
        ctx.connect(&host);
        ctx.client.write_token("jwt-abc").unwrap();

        let err = ctx.client.fetch_presence().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<GatewayError>(), Some(GatewayError::Status(503))));
        assert_eq!(ctx.client.read_token().unwrap(), "jwt-abc");
        server.await.unwrap();
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_device_command_rpc_body(ctx: &mut ApiTestContext) {
        let (host, server) = stub_server(vec![(200, "")]).await;
        ctx.connect(&host);
        ctx.client.write_token("jwt-abc").unwrap();

        ctx.client
            .send_device_command(&DeviceCommand::session_state("PAUSED", 900))
            .await
            .unwrap();

        let requests = server.await.unwrap();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/api/plugins/rpc/oneway/device-1");
        assert_eq!(requests[0].headers["x-authorization"], "Bearer jwt-abc");
        assert_eq!(
            requests[0].json(),
            json!({
                "method": "setSessionState",
                "params": {"status": "PAUSED", "duration_sec": 900},
                "timeout": 5000
            })
        );
    }

    #[test_context(ApiTestContext)]
    #[tokio::test]
    async fn test_telemetry_uses_device_token(ctx: &mut ApiTestContext) {
        let (host, server) = stub_server(vec![(200, "")]).await;
        ctx.connect(&host);

        // Telemetry needs no user session.
        ctx.client
            .push_telemetry(&TelemetryRecord {
                status: SessionStatus::Completed,
                time_left: 0,
                timestamp: 1717000000000,
            })
            .await
            .unwrap();

        let requests = server.await.unwrap();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/api/v1/device-token/telemetry");
        assert!(!requests[0].headers.contains_key("x-authorization"));
        assert_eq!(
            requests[0].json(),
            json!({"status": "COMPLETED", "timeLeft": 0, "timestamp": 1717000000000i64})
        );
    }

    #[test]
    fn test_default_config_points_at_cloud() {
        let config = ThingsBoardConfig::default();
        assert_eq!(config.host, "https://thingsboard.cloud");
        assert!(config.device_id.is_empty());
    }
}
