#[cfg(test)]
mod tests {
    use anyhow::Result;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;
    use test_context::{test_context, AsyncTestContext};
    use tokio::io::BufReader;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::sync::oneshot;
    use truefocus::api::Gateway;
    use truefocus::libs::activity::{ActivitySource, ForegroundWindow};
    use truefocus::libs::config::{Config, MonitorConfig, PomodoroConfig};
    use truefocus::libs::daemon::{run_until_shutdown, Control, Watcher};
    use truefocus::libs::effects::{DeviceCommand, Dispatcher, Effect, SessionStatus, TelemetryRecord};
    use truefocus::libs::ledger::UsageLedger;
    use truefocus::libs::messages::Message;
    use truefocus::libs::migrations::MigrationContext;
    use truefocus::libs::presence::PresenceSample;
    use truefocus::libs::session::{PauseReason, TimerState};

    /// In-memory gateway recording everything pushed to it.
    #[derive(Default)]
    struct MockGateway {
        /// `None` makes presence reads fail.
        presence: Mutex<Option<bool>>,
        presence_delay: Option<Duration>,
        fail_pushes: bool,
        presence_requests: Mutex<usize>,
        telemetry: Mutex<Vec<TelemetryRecord>>,
        commands: Mutex<Vec<DeviceCommand>>,
    }

    impl MockGateway {
        fn present(is_present: bool) -> Self {
            Self {
                presence: Mutex::new(Some(is_present)),
                ..Self::default()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                presence: Mutex::new(Some(true)),
                presence_delay: Some(delay),
                ..Self::default()
            }
        }

        fn set_presence(&self, presence: Option<bool>) {
            *self.presence.lock().unwrap() = presence;
        }
    }

    impl Gateway for MockGateway {
        async fn login(&self, _email: &str, _password: &str) -> Result<String> {
            Ok("token".to_string())
        }

        async fn fetch_presence(&self) -> Result<PresenceSample> {
            *self.presence_requests.lock().unwrap() += 1;
            if let Some(delay) = self.presence_delay {
                tokio::time::sleep(delay).await;
            }
            let presence = *self.presence.lock().unwrap();
            match presence {
                Some(is_present) => Ok(PresenceSample {
                    is_present,
                    distance_cm: Some(if is_present { 55.0 } else { 180.0 }),
                }),
                None => anyhow::bail!("sensor offline"),
            }
        }

        async fn push_telemetry(&self, record: &TelemetryRecord) -> Result<()> {
            if self.fail_pushes {
                anyhow::bail!("telemetry rejected");
            }
            self.telemetry.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn send_device_command(&self, command: &DeviceCommand) -> Result<()> {
            if self.fail_pushes {
                anyhow::bail!("device offline");
            }
            self.commands.lock().unwrap().push(command.clone());
            Ok(())
        }
    }

    struct MockSource;

    impl ActivitySource for MockSource {
        async fn foreground_window(&mut self) -> Option<ForegroundWindow> {
            Some(ForegroundWindow {
                app_id: "/usr/bin/code".to_string(),
                app_name: "Code".to_string(),
                window_title: "daemon.rs".to_string(),
            })
        }

        async fn resolve_icon(&mut self, _app_id: &str) -> Option<String> {
            None
        }
    }

    struct WatcherTestContext {
        temp_dir: TempDir,
        config: Config,
    }

    impl AsyncTestContext for WatcherTestContext {
        async fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            std::env::set_var("HOME", temp_dir.path());
            std::env::set_var("LOCALAPPDATA", temp_dir.path());

            let config = Config {
                monitor: Some(MonitorConfig {
                    request_timeout: 50,
                    ..MonitorConfig::default()
                }),
                ..Config::default()
            };
            WatcherTestContext { temp_dir, config }
        }

        async fn teardown(self) {}
    }

    impl WatcherTestContext {
        fn ledger_path(&self) -> std::path::PathBuf {
            self.temp_dir.path().join("stats.json")
        }

        fn watcher(&self, gateway: Arc<MockGateway>) -> (Watcher<MockGateway, MockSource>, UnboundedReceiver<Effect>) {
            let (sender, receiver) = mpsc::unbounded_channel();
            (Watcher::new(gateway, MockSource, &self.config, self.ledger_path(), sender), receiver)
        }

        /// Sets a request timeout long enough for slow gateways to answer.
        fn with_request_timeout(&mut self, millis: u64) {
            self.config.monitor = Some(MonitorConfig {
                request_timeout: millis,
                ..MonitorConfig::default()
            });
        }
    }

    /// Fires the returned receiver after `after` has elapsed.
    fn shutdown_after(after: Duration) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(());
        });
        rx
    }

    fn no_input() -> BufReader<tokio::io::Empty> {
        BufReader::new(tokio::io::empty())
    }

    fn recorded_seconds(ledger: &UsageLedger, app: &str) -> u64 {
        ledger
            .dates()
            .iter()
            .filter_map(|date| ledger.day(date))
            .flat_map(|day| day.values())
            .filter_map(|bucket| bucket.get(app))
            .map(|entry| entry.seconds)
            .sum()
    }

    fn drain_statuses(receiver: &mut UnboundedReceiver<Effect>) -> Vec<SessionStatus> {
        let mut statuses = Vec::new();
        while let Ok(effect) = receiver.try_recv() {
            if let Effect::Telemetry(record) = effect {
                statuses.push(record.status);
            }
        }
        statuses
    }

    #[test]
    fn test_control_parse() {
        assert_eq!(Control::parse(""), Some(Control::Toggle));
        assert_eq!(Control::parse(" t "), Some(Control::Toggle));
        assert_eq!(Control::parse("RESET"), Some(Control::Reset));
        assert_eq!(Control::parse("s"), Some(Control::Skip));
        assert_eq!(Control::parse("w"), Some(Control::Work));
        assert_eq!(Control::parse("break"), Some(Control::Break));
        assert_eq!(Control::parse("q"), Some(Control::Quit));
        assert_eq!(Control::parse("dance"), None);
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test]
    async fn test_presence_poll_updates_controller(ctx: &mut WatcherTestContext) {
        let gateway = Arc::new(MockGateway::present(true));
        let (mut watcher, _receiver) = ctx.watcher(gateway);

        watcher.poll_presence().await;
        assert_eq!(watcher.presence().is_present(), Some(true));
        assert_eq!(watcher.presence().distance_cm(), Some(55.0));
        assert!(watcher.controller().is_present());
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test]
    async fn test_leaving_pauses_running_work(ctx: &mut WatcherTestContext) {
        let gateway = Arc::new(MockGateway::present(true));
        let (mut watcher, mut receiver) = ctx.watcher(gateway.clone());

        watcher.poll_presence().await;
        assert!(watcher.apply(Control::Toggle));
        watcher.tick();

        gateway.set_presence(Some(false));
        watcher.poll_presence().await;
        assert_eq!(watcher.controller().state(), TimerState::Paused(PauseReason::Auto));

        gateway.set_presence(Some(true));
        watcher.poll_presence().await;
        assert_eq!(watcher.controller().state(), TimerState::Running);

        assert_eq!(
            drain_statuses(&mut receiver),
            vec![SessionStatus::Running, SessionStatus::Paused, SessionStatus::Running]
        );
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test]
    async fn test_failed_presence_counts_as_absent(ctx: &mut WatcherTestContext) {
        let gateway = Arc::new(MockGateway::default());
        let (mut watcher, mut receiver) = ctx.watcher(gateway);

        watcher.poll_presence().await;
        assert_eq!(watcher.presence().is_present(), Some(false));

        // Starting work while absent is refused.
        assert!(watcher.apply(Control::Toggle));
        assert_eq!(watcher.controller().state(), TimerState::Idle);
        assert!(drain_statuses(&mut receiver).is_empty());
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test]
    async fn test_slow_presence_times_out(ctx: &mut WatcherTestContext) {
        let gateway = Arc::new(MockGateway {
            presence: Mutex::new(Some(true)),
            presence_delay: Some(Duration::from_secs(5)),
            ..MockGateway::default()
        });
        let (mut watcher, _receiver) = ctx.watcher(gateway);

        tokio::time::timeout(Duration::from_secs(2), watcher.poll_presence())
            .await
            .unwrap();
        assert_eq!(watcher.presence().is_present(), Some(false));
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test]
    async fn test_activity_recorded_only_when_present(ctx: &mut WatcherTestContext) {
        let gateway = Arc::new(MockGateway::present(true));
        let (mut watcher, _receiver) = ctx.watcher(gateway);

        // No presence reading yet.
        watcher.sample_activity().await;
        assert!(watcher.ledger().is_empty());

        watcher.poll_presence().await;
        watcher.sample_activity().await;
        watcher.sample_activity().await;

        assert_eq!(recorded_seconds(watcher.ledger(), "Code"), 2);
        assert_eq!(watcher.usage().top().map(|top| top.name.as_str()), Some("Code"));
        assert_eq!(watcher.usage().total_seconds, 2);
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test]
    async fn test_flush_persists_ledger(ctx: &mut WatcherTestContext) {
        let gateway = Arc::new(MockGateway::present(true));
        let (mut watcher, _receiver) = ctx.watcher(gateway.clone());

        watcher.poll_presence().await;
        watcher.sample_activity().await;
        watcher.flush();

        let reloaded = UsageLedger::load(&ctx.ledger_path(), &MigrationContext::now());
        assert_eq!(&reloaded, watcher.ledger());

        // A new watcher picks the saved ledger up.
        drop(watcher);
        let (watcher, _receiver) = ctx.watcher(gateway);
        assert_eq!(watcher.ledger(), &reloaded);
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test]
    async fn test_apply_settings(ctx: &mut WatcherTestContext) {
        let gateway = Arc::new(MockGateway::present(true));
        let (mut watcher, _receiver) = ctx.watcher(gateway);

        let config = Config {
            pomodoro: Some(PomodoroConfig {
                work_duration: 50,
                ..PomodoroConfig::default()
            }),
            ..Config::default()
        };
        watcher.apply_settings(&config);

        assert_eq!(watcher.controller().time_left(), 3000);
        assert_eq!(watcher.controller().settings().work_duration, 50);
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test]
    async fn test_quit_stops_loop(ctx: &mut WatcherTestContext) {
        let gateway = Arc::new(MockGateway::present(true));
        let (mut watcher, _receiver) = ctx.watcher(gateway);

        assert!(watcher.apply(Control::Skip));
        assert!(!watcher.apply(Control::Quit));
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_slow_gateway_does_not_stall_countdown(ctx: &mut WatcherTestContext) {
        // Every presence answer takes most of a poll interval.
        ctx.with_request_timeout(5000);
        let gateway = Arc::new(MockGateway::slow(Duration::from_millis(1500)));
        let (mut watcher, _receiver) = ctx.watcher(gateway);

        watcher.poll_presence().await;
        assert!(watcher.apply(Control::Toggle));
        assert_eq!(watcher.controller().time_left(), 1500);

        watcher
            .run(no_input(), shutdown_after(Duration::from_millis(60_500)))
            .await;

        // Ticks at 0s..=60s, one second each.
        assert_eq!(watcher.controller().state(), TimerState::Running);
        assert_eq!(watcher.controller().time_left(), 1500 - 61);
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_presence_poll_skipped_while_request_in_flight(ctx: &mut WatcherTestContext) {
        ctx.with_request_timeout(10_000);
        let gateway = Arc::new(MockGateway::slow(Duration::from_secs(5)));
        let (mut watcher, _receiver) = ctx.watcher(gateway.clone());

        watcher
            .run(no_input(), shutdown_after(Duration::from_millis(9500)))
            .await;

        // Requests start at 0s and 6s; the polls at 2s and 4s are skipped.
        assert_eq!(*gateway.presence_requests.lock().unwrap(), 2);
        assert_eq!(watcher.presence().is_present(), Some(true));
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_quit_from_input_ends_run(ctx: &mut WatcherTestContext) {
        let gateway = Arc::new(MockGateway::present(true));
        let (mut watcher, _receiver) = ctx.watcher(gateway);
        let (_shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::time::timeout(Duration::from_secs(5), watcher.run(&b"dance\nq\n"[..], shutdown_rx))
            .await
            .unwrap();

        // The final flush always writes the ledger.
        assert!(ctx.ledger_path().exists());
    }

    #[test_context(WatcherTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_run_until_shutdown_persists_and_drains(ctx: &mut WatcherTestContext) {
        let gateway = Arc::new(MockGateway::present(true));
        let (effects, dispatcher) = Dispatcher::spawn(gateway.clone());
        let mut watcher = Watcher::new(gateway.clone(), MockSource, &ctx.config, ctx.ledger_path(), effects);

        watcher.poll_presence().await;
        assert!(watcher.apply(Control::Toggle));

        run_until_shutdown(watcher, dispatcher, no_input(), shutdown_after(Duration::from_millis(5500)))
            .await
            .unwrap();

        // Samples at 0s..=5s, all while present.
        let saved = UsageLedger::load(&ctx.ledger_path(), &MigrationContext::now());
        assert_eq!(recorded_seconds(&saved, "Code"), 6);

        // The start was queued before the run and still reached the gateway.
        let telemetry = gateway.telemetry.lock().unwrap();
        assert_eq!(telemetry.len(), 1);
        assert_eq!(telemetry[0].status, SessionStatus::Running);
        assert_eq!(gateway.commands.lock().unwrap()[0].params.status, "RUNNING");
    }

    #[tokio::test]
    async fn test_dispatcher_forwards_in_order() {
        let gateway = Arc::new(MockGateway::default());
        let (sender, handle) = Dispatcher::spawn(gateway.clone());

        for (status, time_left) in [(SessionStatus::Running, 1500), (SessionStatus::Paused, 900)] {
            sender
                .send(Effect::Telemetry(TelemetryRecord {
                    status,
                    time_left,
                    timestamp: 0,
                }))
                .unwrap();
            sender
                .send(Effect::DeviceCommand(DeviceCommand::session_state(status.device_status(), time_left)))
                .unwrap();
        }
        sender.send(Effect::Notify(Message::NotifyBackToWork)).unwrap();
        drop(sender);
        handle.await.unwrap();

        let telemetry = gateway.telemetry.lock().unwrap();
        assert_eq!(telemetry.len(), 2);
        assert_eq!(telemetry[0].status, SessionStatus::Running);
        assert_eq!(telemetry[1].time_left, 900);

        let commands = gateway.commands.lock().unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].method, "setSessionState");
        assert_eq!(commands[1].params.status, "PAUSED");
    }

    #[tokio::test]
    async fn test_dispatcher_survives_failures() {
        let gateway = Arc::new(MockGateway {
            fail_pushes: true,
            ..MockGateway::default()
        });
        let (sender, handle) = Dispatcher::spawn(gateway.clone());

        sender
            .send(Effect::DeviceCommand(DeviceCommand::session_state("RUNNING", 60)))
            .unwrap();
        sender
            .send(Effect::Telemetry(TelemetryRecord {
                status: SessionStatus::Completed,
                time_left: 0,
                timestamp: 0,
            }))
            .unwrap();
        drop(sender);

        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert!(gateway.telemetry.lock().unwrap().is_empty());
    }
}
