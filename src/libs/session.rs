//! Presence-aware Pomodoro session controller.
//!
//! [`SessionController`] is the single authority over the work/break cycle.
//! It is a plain state machine: every operation mutates the session and
//! returns the [`Effect`]s the outside world should see (telemetry, device
//! commands and user notifications). Nothing here performs I/O.
//!
//! ## State Model
//!
//! ```text
//!             toggle                 presence lost (WORK)
//!   Idle ───────────────▶ Running ─────────────────────▶ Paused(Auto)
//!    ▲                     │  ▲  ◀───────────────────────────┘
//!    │ reset/skip   toggle │  │ toggle        presence regained (WORK)
//!    │                     ▼  │
//!    └────────────── Paused(Manual)
//! ```
//!
//! The timer state is independent from the [`Mode`]. Completing an interval
//! swaps the mode and reloads the countdown but leaves a running timer
//! running, so cycles chain without user input.
//!
//! ## Breaks
//!
//! Presence during a running break counts as a strike. The first strike
//! warns the user and flips the companion device to `WARNING`; the third
//! consecutive one pauses the break until the user leaves again.

use super::effects::{DeviceCommand, Effect, SessionStatus, TelemetryRecord};
use super::messages::Message;
use super::presence::PresenceUpdate;
use chrono::Utc;
use thiserror::Error;

/// Completed work cycles between two long breaks.
pub const CYCLES_PER_LONG_BREAK: u32 = 4;
/// Confirmed presence samples that pause a break.
pub const BREAK_STRIKE_LIMIT: u32 = 3;
/// Device status sent on the first break strike.
pub const WARNING_STATUS: &str = "WARNING";

/// Interval lengths in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakLength {
    Short,
    Long,
}

/// Pomodoro mode. A break remembers its length from the moment it began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Work,
    Break(BreakLength),
}

impl Mode {
    pub fn is_work(&self) -> bool {
        matches!(self, Mode::Work)
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Mode::Break(_))
    }
}

/// Mode requested through manual selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Work,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    Manual,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused(PauseReason),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("{}", Message::StartBlockedWhileAbsent)]
    StartWhileAbsent,
}

/// Read-only view of the session for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub state: TimerState,
    pub time_left: u64,
    pub target: u64,
    pub cycle_count: u32,
    pub is_present: bool,
    pub break_strikes: u32,
}

#[derive(Debug, Clone)]
pub struct SessionController {
    mode: Mode,
    state: TimerState,
    time_left: u64,
    manually_started: bool,
    cycle_count: u32,
    break_strikes: u32,
    break_warning_issued: bool,
    is_present: bool,
    settings: Settings,
}

/// Converts minutes to seconds, never below one second.
fn minutes_to_seconds(minutes: u32) -> u64 {
    (u64::from(minutes) * 60).max(1)
}

fn is_long_break(completed_cycles: u32) -> bool {
    completed_cycles > 0 && completed_cycles % CYCLES_PER_LONG_BREAK == 0
}

impl SessionController {
    /// Starts idle in WORK mode with a full work countdown. The user is
    /// assumed present until the sensor says otherwise.
    pub fn new(settings: Settings) -> Self {
        Self {
            mode: Mode::Work,
            state: TimerState::Idle,
            time_left: minutes_to_seconds(settings.work_duration),
            manually_started: false,
            cycle_count: 0,
            break_strikes: 0,
            break_warning_issued: false,
            is_present: true,
            settings,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    pub fn break_strikes(&self) -> u32 {
        self.break_strikes
    }

    pub fn break_warning_issued(&self) -> bool {
        self.break_warning_issued
    }

    pub fn is_present(&self) -> bool {
        self.is_present
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn manually_started(&self) -> bool {
        self.manually_started
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Full length of the current interval in seconds.
    pub fn target_seconds(&self) -> u64 {
        self.target_for(self.mode)
    }

    fn target_for(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Work => minutes_to_seconds(self.settings.work_duration),
            Mode::Break(BreakLength::Short) => minutes_to_seconds(self.settings.short_break_duration),
            Mode::Break(BreakLength::Long) => minutes_to_seconds(self.settings.long_break_duration),
        }
    }

    /// Break that would follow the next completed work interval.
    fn upcoming_break(&self) -> Mode {
        if is_long_break(self.cycle_count + 1) {
            Mode::Break(BreakLength::Long)
        } else {
            Mode::Break(BreakLength::Short)
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            state: self.state,
            time_left: self.time_left,
            target: self.target_seconds(),
            cycle_count: self.cycle_count,
            is_present: self.is_present,
            break_strikes: self.break_strikes,
        }
    }

    /// Telemetry plus the matching device command for a status change.
    fn announce(status: SessionStatus, time_left: u64) -> Vec<Effect> {
        vec![
            Effect::Telemetry(TelemetryRecord {
                status,
                time_left,
                timestamp: Utc::now().timestamp_millis(),
            }),
            Effect::DeviceCommand(DeviceCommand::session_state(status.device_status(), time_left)),
        ]
    }

    fn clear_break_state(&mut self) {
        self.break_strikes = 0;
        self.break_warning_issued = false;
    }

    /// Starts or pauses the countdown.
    ///
    /// # Errors
    ///
    /// Starting a WORK interval while the user is absent is rejected.
    pub fn toggle(&mut self) -> Result<Vec<Effect>, SessionError> {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused(PauseReason::Manual);
            return Ok(Self::announce(SessionStatus::Paused, self.time_left));
        }

        if self.mode.is_work() && !self.is_present {
            return Err(SessionError::StartWhileAbsent);
        }

        self.state = TimerState::Running;
        self.manually_started = true;
        Ok(Self::announce(SessionStatus::Running, self.time_left))
    }

    /// Stops the timer and reloads the current interval.
    pub fn reset(&mut self) -> Vec<Effect> {
        self.state = TimerState::Idle;
        self.manually_started = false;
        self.time_left = self.target_seconds();
        Self::announce(SessionStatus::Idle, self.time_left)
    }

    /// Jumps to the other mode without counting a cycle.
    pub fn skip(&mut self) -> Vec<Effect> {
        let next = match self.mode {
            Mode::Work => self.upcoming_break(),
            Mode::Break(_) => Mode::Work,
        };
        self.enter_stopped(next);
        Self::announce(SessionStatus::Idle, 0)
    }

    /// Switches to the requested mode, stopped at its full length.
    /// Nothing is reported to the platform.
    pub fn select_mode(&mut self, kind: ModeKind) -> Vec<Effect> {
        let next = match kind {
            ModeKind::Work => Mode::Work,
            ModeKind::Break => self.upcoming_break(),
        };
        self.enter_stopped(next);
        Vec::new()
    }

    fn enter_stopped(&mut self, mode: Mode) {
        self.mode = mode;
        self.time_left = self.target_for(mode);
        self.state = TimerState::Idle;
        self.clear_break_state();
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self) -> Vec<Effect> {
        if self.state != TimerState::Running {
            return Vec::new();
        }

        if self.time_left > 1 {
            self.time_left -= 1;
            return Vec::new();
        }

        self.time_left = 0;
        self.complete()
    }

    /// Finishes the current interval. The timer state is left untouched.
    fn complete(&mut self) -> Vec<Effect> {
        let mut effects = Self::announce(SessionStatus::Completed, 0);

        match self.mode {
            Mode::Work => {
                self.cycle_count += 1;
                let (length, message) = if is_long_break(self.cycle_count) {
                    (BreakLength::Long, Message::NotifyLongBreak)
                } else {
                    (BreakLength::Short, Message::NotifyShortBreak)
                };
                self.mode = Mode::Break(length);
                self.time_left = self.target_for(self.mode);
                self.clear_break_state();
                effects.push(Effect::Notify(message));
            }
            Mode::Break(_) => {
                self.mode = Mode::Work;
                self.time_left = self.target_for(Mode::Work);
                self.clear_break_state();
                effects.push(Effect::Notify(Message::NotifyBackToWork));
            }
        }

        effects
    }

    /// Applies one presence sample.
    pub fn on_presence(&mut self, update: PresenceUpdate) -> Vec<Effect> {
        self.is_present = update.is_present;

        match self.mode {
            Mode::Work => self.work_presence(update),
            Mode::Break(_) => self.break_presence(update.is_present),
        }
    }

    fn work_presence(&mut self, update: PresenceUpdate) -> Vec<Effect> {
        if !update.changed {
            return Vec::new();
        }

        match (update.is_present, self.state) {
            (false, TimerState::Running) => {
                self.state = TimerState::Paused(PauseReason::Auto);
                let mut effects = Self::announce(SessionStatus::Paused, self.time_left);
                effects.push(Effect::Notify(Message::NotifyAbsencePaused));
                effects
            }
            (true, TimerState::Paused(PauseReason::Auto)) => {
                self.state = TimerState::Running;
                let mut effects = Self::announce(SessionStatus::Running, self.time_left);
                effects.push(Effect::Notify(Message::NotifyPresenceResumed));
                effects
            }
            _ => Vec::new(),
        }
    }

    fn break_presence(&mut self, is_present: bool) -> Vec<Effect> {
        let mut effects = Vec::new();

        if is_present {
            if self.state != TimerState::Running {
                return effects;
            }

            self.break_strikes += 1;

            if self.break_strikes == 1 && !self.break_warning_issued {
                self.break_warning_issued = true;
                effects.push(Effect::Notify(Message::NotifyBreakWarning));
                effects.push(Effect::DeviceCommand(DeviceCommand::session_state(
                    WARNING_STATUS,
                    self.time_left,
                )));
            }

            if self.break_strikes >= BREAK_STRIKE_LIMIT {
                self.state = TimerState::Paused(PauseReason::Auto);
                effects.extend(Self::announce(SessionStatus::Paused, self.time_left));
                effects.push(Effect::Notify(Message::NotifyBreakPaused));
                self.clear_break_state();
            }

            return effects;
        }

        match self.state {
            TimerState::Paused(PauseReason::Auto) => {
                self.state = TimerState::Running;
                effects.extend(Self::announce(SessionStatus::Running, self.time_left));
                effects.push(Effect::Notify(Message::NotifyBreakResumed));
            }
            TimerState::Running if self.break_warning_issued => {
                effects.push(Effect::DeviceCommand(DeviceCommand::session_state(
                    SessionStatus::Running.device_status(),
                    self.time_left,
                )));
            }
            _ => {}
        }
        self.clear_break_state();

        effects
    }

    /// Applies new interval lengths.
    ///
    /// A stopped session that was never started by hand is reloaded to the
    /// new target. Otherwise the countdown is kept, capped at the new
    /// target.
    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;
        let target = self.target_seconds();

        let resync = !matches!(self.state, TimerState::Running | TimerState::Paused(PauseReason::Auto))
            && !self.manually_started;

        if resync {
            self.time_left = target;
        } else {
            self.time_left = self.time_left.min(target);
        }
    }
}
