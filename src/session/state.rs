//! The recording lifecycle as an explicit state machine.
//!
//! `transition` is the single source of truth for which moves are legal; the
//! controller never assigns a state directly. `completed` is deliberately not
//! a controller state: it exists only as the status stamped on a persisted
//! record, so a finished lifecycle lands back on `Idle`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// No session in progress
    Idle,
    /// Acquiring capture and opening the live connection
    Initializing,
    /// Streaming audio, timer running
    Recording,
    /// Timer frozen, frames suppressed, connection left open
    Paused,
    /// Finalizing: summary request and persistence
    Processing,
    /// Aborted with a user-facing message
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// User starts a session
    Start,
    /// The live connection acknowledged setup
    Opened,
    /// User pauses
    Pause,
    /// User resumes
    Resume,
    /// User stops, or the capture stream ended externally
    Stop,
    /// Unrecoverable failure (capture, credential, connection, persistence)
    Fatal,
    /// Finalization finished (persisted, or nothing to persist)
    Finished,
}

/// Apply an event to a state. `None` means the event is not legal from this
/// state and must be ignored or rejected by the caller.
pub fn transition(state: LifecycleState, event: LifecycleEvent) -> Option<LifecycleState> {
    use LifecycleEvent::*;
    use LifecycleState::*;

    match (state, event) {
        (Idle, Start) | (Error, Start) => Some(Initializing),
        (Initializing, Opened) => Some(Recording),
        (Recording, Pause) => Some(Paused),
        (Paused, Resume) => Some(Recording),
        (Recording, Stop) | (Paused, Stop) => Some(Processing),
        (Processing, Finished) => Some(Idle),
        (Initializing, Fatal) | (Recording, Fatal) | (Paused, Fatal) | (Processing, Fatal) => {
            Some(Error)
        }
        _ => None,
    }
}

impl LifecycleState {
    /// Whether a capture-stream end should stop the session. Anything past
    /// Paused is already finalizing and must not be stopped again.
    pub fn is_active_recording(self) -> bool {
        matches!(self, LifecycleState::Recording | LifecycleState::Paused)
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleEvent::*;
    use super::LifecycleState::*;
    use super::*;

    #[test]
    fn happy_path_walks_every_state() {
        let mut state = Idle;
        for (event, expected) in [
            (Start, Initializing),
            (Opened, Recording),
            (Pause, Paused),
            (Resume, Recording),
            (Stop, Processing),
            (Finished, Idle),
        ] {
            state = transition(state, event).unwrap();
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn error_state_allows_a_fresh_start() {
        assert_eq!(transition(Error, Start), Some(Initializing));
    }

    #[test]
    fn stop_works_from_paused() {
        assert_eq!(transition(Paused, Stop), Some(Processing));
    }

    #[test]
    fn fatal_reaches_error_from_any_in_flight_state() {
        for state in [Initializing, Recording, Paused, Processing] {
            assert_eq!(transition(state, Fatal), Some(Error));
        }
    }

    #[test]
    fn late_events_are_rejected() {
        // Events landing after the lifecycle moved on must not re-trigger it
        assert_eq!(transition(Processing, Stop), None);
        assert_eq!(transition(Idle, Stop), None);
        assert_eq!(transition(Idle, Fatal), None);
        assert_eq!(transition(Idle, Opened), None);
        assert_eq!(transition(Recording, Start), None);
        assert_eq!(transition(Recording, Resume), None);
        assert_eq!(transition(Paused, Pause), None);
    }

    #[test]
    fn only_recording_and_paused_react_to_stream_end() {
        assert!(Recording.is_active_recording());
        assert!(Paused.is_active_recording());
        for state in [Idle, Initializing, Processing, Error] {
            assert!(!state.is_active_recording());
        }
    }

    #[test]
    fn states_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Initializing).unwrap(), r#""initializing""#);
        assert_eq!(serde_json::to_string(&Paused).unwrap(), r#""paused""#);
    }
}
