/// Recording session state machine.
///
/// State transitions:
/// ```text
/// init → awaiting_filename → opening_output → recording → finalizing
///                  ↓               ↓               ↓           ↓
///                  ↓               ↓               ↓        moving → retention_sweep
///                  ↓               ↓               ↓                        ↓
///                  └───────────────┴───────────────┴───────→ reporting ←────┘
///                                                               ↓
///                                                     completed / failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    AwaitingFilename,
    OpeningOutput,
    Recording,
    Finalizing,
    Moving,
    RetentionSweep,
    Reporting,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether capture has not started yet, so cancelling produces no output.
    pub fn is_before_recording(&self) -> bool {
        matches!(self, Self::Init | Self::AwaitingFilename)
    }
}
