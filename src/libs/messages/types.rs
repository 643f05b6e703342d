#[derive(Debug, Clone)]
pub enum Message {
    // === SCHEDULER MESSAGES ===
    SchedulerStarted {
        active_min: u64,
        active_max: u64,
        total_runtime: u64,
    },
    SchedulerAlreadyRunning,
    SchedulerNotRunning,
    SchedulerStopped,
    SchedulerStopping,
    SchedulerThreadNotJoined,
    SchedulerFault(String),
    RuntimeExpired,
    CycleStarted(u32),
    ActivePhaseStarted(u64),   // duration in seconds
    IdlePhaseStarted(u64),     // duration in seconds
    IdlePhaseSkipped,
    ActionExecuted(String),    // description
    ActionFailed(String),      // failure text
    AppSwitchFailed(String),   // reason
    PauseEntered,              // real user input detected
    PauseResumed(u64),         // paused seconds

    // === MONITOR MESSAGES ===
    MonitorStarted {
        idle_timeout: u64,
        poll_interval: u64,
    },
    MonitorAlreadyRunning,
    MonitorStopped,
    MonitorThreadNotJoined,
    MonitorSampleFailed(String),
    ActivityDetected(String), // kind
    UserIdle,

    // === CONFIGURATION MESSAGES ===
    ConfigSaved,
    ConfigParseError,
    ConfigModuleScheduler,
    ConfigModuleMonitor,
    PromptSelectModules,
    PromptActiveMin,
    PromptActiveMax,
    PromptIdleMin,
    PromptIdleMax,
    PromptActionIntervalMin,
    PromptActionIntervalMax,
    PromptAppSwitchInterval,
    PromptClickDelayMax,
    PromptTotalRuntime,
    PromptUserIdleTimeout,
    PromptPollInterval,
    PromptCheckInterval,

    // === RUNNER MESSAGES ===
    RunnerStarted,
    RunnerReceivedCtrlC,
    RunnerCtrlCListenFailed(String),
    RunnerReceivedSigterm,
    RunnerReceivedSigint,
    RunnerSignalHandlingNotSupported,
    RunnerShuttingDown,

    // === GENERIC ERROR MESSAGES ===
    InvalidInput,
    OperationCancelled,
}
