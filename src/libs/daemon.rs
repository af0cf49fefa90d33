//! The watch loop.
//!
//! A single task owns the session controller, presence monitor, activity
//! sampler and usage ledger, and multiplexes everything that can change them
//! with `tokio::select!`:
//!
//! ```text
//!  1s tick ─────────┐
//!  presence poll ───┤                    ┌──────────────┐
//!  activity sample ─┼──▶  Watcher  ──────▶  Dispatcher  ├──▶ Gateway
//!  flush/reload ────┤    (owns state)    └──────────────┘
//!  stdin controls ──┤       effects over an mpsc channel
//!  shutdown signal ─┘
//! ```
//!
//! Each branch runs to completion before the next is polled, so no state is
//! shared and no locks are needed. Presence requests are the exception: they
//! run on their own task and report back over a channel, so a slow gateway
//! never holds up the countdown. At most one request is in flight; polls that
//! come due meanwhile are skipped. The countdown and sampling intervals burst
//! to catch up after a stall, so no second is lost.
//!
//! On shutdown the ledger is flushed one final time and the dispatcher is
//! allowed to drain the effects already queued.

use super::activity::ActivitySource;
use super::config::{Config, MonitorConfig};
use super::effects::{Dispatcher, Effect, EffectSender};
use super::ledger::UsageLedger;
use super::migrations::MigrationContext;
use super::presence::{PresenceMonitor, PresenceSample};
use super::sampler::{ActivitySampler, UsageSnapshot};
use super::session::{ModeKind, SessionController};
use super::view::View;
use crate::api::Gateway;
use crate::libs::messages::Message;
use crate::{msg_debug, msg_error, msg_info, msg_print, msg_warning};
use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Countdown resolution.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one presence request, with the message to report on failure.
pub type PresenceResult = Result<PresenceSample, Message>;

/// Manual controls read from standard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Toggle,
    Reset,
    Skip,
    Work,
    Break,
    Quit,
}

impl Control {
    pub fn parse(input: &str) -> Option<Control> {
        match input.trim().to_lowercase().as_str() {
            "t" | "toggle" | "" => Some(Control::Toggle),
            "r" | "reset" => Some(Control::Reset),
            "s" | "skip" => Some(Control::Skip),
            "w" | "work" => Some(Control::Work),
            "b" | "break" => Some(Control::Break),
            "q" | "quit" | "exit" => Some(Control::Quit),
            _ => None,
        }
    }
}

pub struct Watcher<G: Gateway, S: ActivitySource> {
    gateway: Arc<G>,
    source: S,
    controller: SessionController,
    presence: PresenceMonitor,
    sampler: ActivitySampler,
    ledger: UsageLedger,
    ledger_path: PathBuf,
    monitor: MonitorConfig,
    effects: EffectSender,
    presence_failing: bool,
    presence_in_flight: bool,
    presence_tx: mpsc::Sender<PresenceResult>,
    presence_rx: mpsc::Receiver<PresenceResult>,
    usage: UsageSnapshot,
}

/// Fetches presence once, bounded by `timeout`.
async fn fetch_presence<G: Gateway>(gateway: &G, timeout: Duration) -> PresenceResult {
    match tokio::time::timeout(timeout, gateway.fetch_presence()).await {
        Ok(Ok(sample)) => Ok(sample),
        Ok(Err(e)) => Err(Message::PresenceFetchFailed(e.to_string())),
        Err(_) => Err(Message::PresenceFetchTimedOut(timeout.as_millis() as u64)),
    }
}

impl<G: Gateway, S: ActivitySource> Watcher<G, S> {
    /// Builds a watcher, loading the ledger from `ledger_path`.
    pub fn new(gateway: Arc<G>, source: S, config: &Config, ledger_path: PathBuf, effects: EffectSender) -> Self {
        let ledger = UsageLedger::load(&ledger_path, &MigrationContext::now());
        let (presence_tx, presence_rx) = mpsc::channel(1);

        Self {
            gateway,
            source,
            controller: SessionController::new(config.settings()),
            presence: PresenceMonitor::new(),
            sampler: ActivitySampler::new(Local::now().date_naive()),
            ledger,
            ledger_path,
            monitor: config.monitor(),
            effects,
            presence_failing: false,
            presence_in_flight: false,
            presence_tx,
            presence_rx,
            usage: UsageSnapshot::default(),
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn presence(&self) -> &PresenceMonitor {
        &self.presence
    }

    /// Today's usage as of the last recorded sample.
    pub fn usage(&self) -> &UsageSnapshot {
        &self.usage
    }

    fn emit(&self, effects: Vec<Effect>) {
        for effect in effects {
            if self.effects.send(effect).is_err() {
                msg_debug!(Message::DispatcherStopped);
                return;
            }
        }
    }

    fn render_status(&self) {
        View::print_status(&View::status_line(
            &self.controller.snapshot(),
            self.presence.distance_cm(),
            &self.usage,
        ));
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self) {
        if !self.controller.is_running() {
            return;
        }
        let effects = self.controller.tick();
        self.emit(effects);
        self.render_status();
    }

    /// Fetches presence once and feeds it to the controller.
    pub async fn poll_presence(&mut self) {
        let result = fetch_presence(self.gateway.as_ref(), self.monitor.timeout()).await;
        self.on_presence(result);
    }

    /// Starts a background presence request unless one is still running.
    /// The result arrives on the watcher's presence channel.
    pub fn request_presence(&mut self) {
        if self.presence_in_flight {
            msg_debug!(Message::PresencePollInFlight);
            return;
        }
        self.presence_in_flight = true;

        let gateway = Arc::clone(&self.gateway);
        let results = self.presence_tx.clone();
        let timeout = self.monitor.timeout();
        tokio::spawn(async move {
            let result = fetch_presence(gateway.as_ref(), timeout).await;
            let _ = results.send(result).await;
        });
    }

    /// Feeds one presence result to the monitor and the controller.
    pub fn on_presence(&mut self, result: PresenceResult) {
        self.presence_in_flight = false;
        let result = match result {
            Ok(sample) => {
                self.presence_failing = false;
                Ok(sample)
            }
            Err(message) => {
                self.report_presence_failure(message);
                Err(())
            }
        };

        let update = self.presence.observe(result);
        if update.changed {
            msg_info!(Message::PresenceChanged {
                is_present: update.is_present,
                distance_cm: self.presence.distance_cm(),
            });
        }

        let effects = self.controller.on_presence(update);
        self.emit(effects);
    }

    /// The first failure in a row is a warning, repeats only show in debug
    /// output.
    fn report_presence_failure(&mut self, message: Message) {
        if self.presence_failing {
            msg_debug!(message);
        } else {
            msg_warning!(message);
        }
        self.presence_failing = true;
    }

    /// Records one activity sample and refreshes today's usage.
    pub async fn sample_activity(&mut self) {
        let is_present = self.presence.is_present().unwrap_or(false);
        let date = self.sampler.current_date();
        let usage = self
            .sampler
            .sample(&mut self.source, &mut self.ledger, is_present, Local::now())
            .await;

        match usage {
            Some(usage) => self.usage = usage,
            // A new day started without anything recorded yet.
            None if self.sampler.current_date() != date => self.usage = UsageSnapshot::default(),
            None => {}
        }
    }

    /// Writes the ledger to disk.
    pub fn flush(&self) {
        match self.ledger.save(&self.ledger_path) {
            Ok(()) => msg_debug!(Message::LedgerSaved(self.ledger.len())),
            Err(e) => msg_error!(Message::LedgerSaveFailed(e.to_string())),
        }
    }

    /// Re-reads the configuration and applies changed Pomodoro settings.
    pub fn reload_settings(&mut self) {
        match Config::read() {
            Ok(config) => self.apply_settings(&config),
            Err(e) => msg_warning!(Message::ConfigReloadFailed(e.to_string())),
        }
    }

    pub fn apply_settings(&mut self, config: &Config) {
        let settings = config.settings();
        if settings == self.controller.settings() {
            return;
        }
        self.controller.update_settings(settings);
        msg_info!(Message::SettingsReloaded {
            work: settings.work_duration,
            short_break: settings.short_break_duration,
            long_break: settings.long_break_duration,
        });
    }

    /// Applies a manual control. Returns `false` when the loop should stop.
    pub fn apply(&mut self, control: Control) -> bool {
        let effects = match control {
            Control::Toggle => match self.controller.toggle() {
                Ok(effects) => effects,
                Err(e) => {
                    msg_warning!(e);
                    Vec::new()
                }
            },
            Control::Reset => self.controller.reset(),
            Control::Skip => self.controller.skip(),
            Control::Work => self.controller.select_mode(ModeKind::Work),
            Control::Break => self.controller.select_mode(ModeKind::Break),
            Control::Quit => return false,
        };
        self.emit(effects);
        self.render_status();
        true
    }

    fn handle_line(&mut self, line: &str) -> bool {
        match Control::parse(line) {
            Some(control) => self.apply(control),
            None => {
                msg_warning!(Message::UnknownCommand(line.trim().to_string()));
                msg_print!(Message::WatchCommandsHelp);
                true
            }
        }
    }

    /// Reads controls from `input` until `shutdown` fires or the user quits,
    /// then flushes the ledger. Dropping the watcher closes the effect channel.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R, mut shutdown: oneshot::Receiver<()>) {
        let settings = self.controller.settings();
        msg_info!(Message::WatchStarted {
            work: settings.work_duration,
            short_break: settings.short_break_duration,
            long_break: settings.long_break_duration,
        });
        msg_print!(Message::WatchCommandsHelp);
        self.render_status();

        let mut tick = interval(TICK_INTERVAL);
        let mut presence = interval(self.monitor.presence_poll());
        let mut sample = interval(self.monitor.sample());
        let mut flush = interval(self.monitor.flush());
        tick.set_missed_tick_behavior(MissedTickBehavior::Burst);
        sample.set_missed_tick_behavior(MissedTickBehavior::Burst);
        presence.set_missed_tick_behavior(MissedTickBehavior::Skip);
        flush.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first flush would fire immediately; nothing has changed yet.
        flush.reset();

        let mut lines = input.lines();
        let mut stdin_open = true;
        let mut signals_open = true;

        loop {
            tokio::select! {
                received = &mut shutdown, if signals_open => match received {
                    Ok(()) => break,
                    // The signal handler could not be installed.
                    Err(_) => signals_open = false,
                },
                _ = tick.tick() => self.tick(),
                _ = presence.tick() => self.request_presence(),
                Some(result) = self.presence_rx.recv() => self.on_presence(result),
                _ = sample.tick() => self.sample_activity().await,
                _ = flush.tick() => {
                    self.flush();
                    self.reload_settings();
                }
                line = lines.next_line(), if stdin_open => match line {
                    Ok(Some(line)) => {
                        if !self.handle_line(&line) {
                            break;
                        }
                    }
                    Ok(None) | Err(_) => {
                        stdin_open = false;
                        msg_info!(Message::StdinClosed);
                    }
                },
            }
        }

        println!();
        self.flush();
    }
}

/// Waits for SIGTERM/SIGINT (Ctrl+C on Windows) and fires `shutdown_tx`.
fn spawn_signal_handler(shutdown_tx: oneshot::Sender<()>) {
    #[cfg(unix)]
    {
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(e), _) | (_, Err(e)) => {
                    msg_error!(Message::FailedToCreateSignalHandler(e.to_string()));
                    return;
                }
            };

            tokio::select! {
                _ = sigterm.recv() => {
                    msg_info!(Message::WatcherReceivedSigterm);
                }
                _ = sigint.recv() => {
                    msg_info!(Message::WatcherReceivedSigint);
                }
            }

            let _ = shutdown_tx.send(());
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    msg_info!(Message::WatcherReceivedCtrlC);
                }
                Err(e) => {
                    msg_error!(Message::WatcherCtrlCListenFailed(e.to_string()));
                    return;
                }
            }

            let _ = shutdown_tx.send(());
        });
    }
}

/// Runs the watch loop in the foreground until quit or a signal arrives.
pub async fn run_with_signal_handling<G: Gateway, S: ActivitySource>(gateway: Arc<G>, source: S, config: Config) -> Result<()> {
    let ledger_path = UsageLedger::default_path()?;
    let (effects, dispatcher) = Dispatcher::spawn(gateway.clone());
    let watcher = Watcher::new(gateway, source, &config, ledger_path, effects);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    spawn_signal_handler(shutdown_tx);

    run_until_shutdown(watcher, dispatcher, BufReader::new(tokio::io::stdin()), shutdown_rx).await
}

/// Runs `watcher` to completion, then lets `dispatcher` drain the effects
/// still queued.
pub async fn run_until_shutdown<G, S, R>(
    mut watcher: Watcher<G, S>,
    dispatcher: JoinHandle<()>,
    input: R,
    shutdown: oneshot::Receiver<()>,
) -> Result<()>
where
    G: Gateway,
    S: ActivitySource,
    R: AsyncBufRead + Unpin,
{
    watcher.run(input, shutdown).await;
    drop(watcher);

    if let Err(e) = dispatcher.await {
        msg_error!(Message::DispatcherStopped);
        msg_debug!(e);
    }
    msg_info!(Message::WatchStopped);
    Ok(())
}
