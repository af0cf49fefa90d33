/// Every user-facing and diagnostic message emitted by the application.
///
/// Variants carry the dynamic parts of the text; the wording itself lives in
/// the `Display` implementation in `display.rs`.
#[derive(Debug, Clone)]
pub enum Message {
    // === CONFIGURATION MESSAGES ===
    ConfigSaved,
    ConfigDeleted,
    ConfigReloadFailed(String), // error
    ConfigModuleThingsBoard,
    ConfigModulePomodoro,
    ConfigModuleMonitor,
    ThingsBoardNotConfigured,
    SettingsReloaded {
        work: u32,
        short_break: u32,
        long_break: u32,
    },

    // === PROMPTS ===
    PromptSelectModules,
    PromptThingsBoardHost,
    PromptThingsBoardEmail,
    PromptThingsBoardDeviceId,
    PromptThingsBoardDeviceToken,
    PromptPassword(String), // email
    PromptWorkDuration,
    PromptShortBreakDuration,
    PromptLongBreakDuration,
    PromptPresencePollInterval,
    PromptSampleInterval,
    PromptFlushInterval,
    PromptRequestTimeout,

    // === AUTHENTICATION MESSAGES ===
    LoginSucceeded(String), // email
    LoginFailed(String),    // error
    LoggedOut,
    NotLoggedIn,
    SessionTokenRejected,

    // === GATEWAY MESSAGES ===
    PresenceFetchFailed(String), // error
    PresenceFetchTimedOut(u64),  // timeout in ms
    TelemetryPushed {
        status: String,
        time_left: u64,
    },
    TelemetryPushFailed(String), // error
    DeviceCommandSent {
        status: String,
        duration_sec: u64,
    },
    DeviceCommandFailed {
        method: String,
        error: String,
    },

    // === SESSION NOTIFICATIONS ===
    NotifyAbsencePaused,
    NotifyPresenceResumed,
    NotifyLongBreak,
    NotifyShortBreak,
    NotifyBackToWork,
    NotifyBreakWarning,
    NotifyBreakPaused,
    NotifyBreakResumed,
    StartBlockedWhileAbsent,

    // === PRESENCE MESSAGES ===
    PresenceChanged {
        is_present: bool,
        distance_cm: Option<f64>,
    },

    // === LEDGER MESSAGES ===
    LedgerLoadFailed(String), // error
    LedgerSaveFailed(String), // error
    LedgerSaved(usize),       // number of days
    LedgerMigrated {
        from: u32,
        to: u32,
    },
    LedgerMigrationApplied {
        version: u32,
        name: String,
    },
    NewDayDetected(String), // date
    LedgerEntrySkipped {
        app: String,
        error: String,
    },

    // === ACTIVITY MESSAGES ===
    ForegroundWindowFailed(String), // error
    IconResolveFailed {
        app: String,
        error: String,
    },

    // === WATCH MESSAGES ===
    WatchStarted {
        work: u32,
        short_break: u32,
        long_break: u32,
    },
    WatchStopped,
    WatchCommandsHelp,
    UnknownCommand(String),
    StdinClosed,
    WatcherReceivedSigterm,
    WatcherReceivedSigint,
    WatcherReceivedCtrlC,
    WatcherCtrlCListenFailed(String),   // error
    FailedToCreateSignalHandler(String), // error
    DispatcherStopped,
    PresencePollInFlight,

    // === REPORT MESSAGES ===
    ReportHeader(String),       // date
    HourlyReportHeader(String), // date
    WeeklyReportHeader {
        from: String,
        to: String,
    },
    RangeReportHeader {
        from: String,
        to: String,
    },
    CategoriesHeader,
    TopAppsHeader,
    NoUsageForDate(String), // date
    NoUsageForRange {
        from: String,
        to: String,
    },
    TotalTracked(String), // formatted duration
    LedgerDatesHeader,
    LedgerEmpty,
    InvalidDateFormat(String), // input
    InvalidDateRange {
        from: String,
        to: String,
    },
}
