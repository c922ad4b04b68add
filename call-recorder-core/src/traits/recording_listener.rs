use crate::models::error::SessionError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::SessionState;
use crate::traits::storage::Artifact;

/// Event listener for recording session notifications.
///
/// All methods are called from the recording thread. Exactly one of
/// `on_completed` / `on_failed` is invoked per session.
pub trait RecordingListener: Send + Sync {
    /// Called when the session moves to a new state.
    fn on_state_changed(&self, state: SessionState) {
        let _ = state;
    }

    /// Called once the recording has been finalized successfully.
    fn on_completed(&self, result: &RecordingResult);

    /// Called when the session fails. `artifact` is the best known location
    /// of whatever was recorded before the failure.
    fn on_failed(&self, error: &SessionError, artifact: Option<&Artifact>);
}

