//! Lifecycle of one lesson generation.
//!
//! ```text
//! idle -> streaming -> (parse success: rendered | parse failure: parse_failed) -> saved
//! ```
//!
//! A connection failure or cancellation drops back to idle; reset returns to
//! idle from anywhere.

use crate::error::{LessonMapError, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationState {
    #[default]
    Idle,
    Streaming,
    Rendered,
    ParseFailed,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationEvent {
    Start,
    ConnectionFailed,
    StreamFinished { parsed: bool },
    Saved,
    Cancelled,
    Reset,
}

impl GenerationState {
    /// Applies `event`, rejecting transitions the lifecycle does not allow.
    pub fn transition(self, event: GenerationEvent) -> Result<GenerationState> {
        use GenerationEvent as E;
        use GenerationState as S;

        let next = match (self, event) {
            (_, E::Reset) => S::Idle,
            (S::Idle | S::Rendered | S::ParseFailed | S::Saved, E::Start) => S::Streaming,
            (S::Streaming, E::ConnectionFailed | E::Cancelled) => S::Idle,
            (S::Streaming, E::StreamFinished { parsed: true }) => S::Rendered,
            (S::Streaming, E::StreamFinished { parsed: false }) => S::ParseFailed,
            (S::Rendered | S::ParseFailed, E::Saved) => S::Saved,
            (state, event) => {
                return Err(LessonMapError::InvalidTransition(format!(
                    "{event:?} is not allowed while {state}"
                )));
            }
        };

        Ok(next)
    }

    pub fn is_streaming(self) -> bool {
        self == Self::Streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GenerationEvent as E;
    use GenerationState as S;

    #[test]
    fn test_happy_path() {
        let state = S::Idle
            .transition(E::Start)
            .and_then(|s| s.transition(E::StreamFinished { parsed: true }))
            .and_then(|s| s.transition(E::Saved))
            .unwrap();
        assert_eq!(state, S::Saved);
    }

    #[test]
    fn test_parse_failure_can_still_be_saved() {
        let state = S::Streaming
            .transition(E::StreamFinished { parsed: false })
            .unwrap();
        assert_eq!(state, S::ParseFailed);
        assert_eq!(state.transition(E::Saved).unwrap(), S::Saved);
    }

    #[test]
    fn test_failures_return_to_idle() {
        assert_eq!(S::Streaming.transition(E::ConnectionFailed).unwrap(), S::Idle);
        assert_eq!(S::Streaming.transition(E::Cancelled).unwrap(), S::Idle);
        assert_eq!(S::Saved.transition(E::Reset).unwrap(), S::Idle);
    }

    #[test]
    fn test_restart_from_finished_states() {
        for state in [S::Idle, S::Rendered, S::ParseFailed, S::Saved] {
            assert_eq!(state.transition(E::Start).unwrap(), S::Streaming);
        }
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(S::Streaming.transition(E::Start).is_err());
        assert!(S::Idle.transition(E::Saved).is_err());
        assert!(S::Idle.transition(E::StreamFinished { parsed: true }).is_err());
        let err = S::Rendered.transition(E::Cancelled).unwrap_err();
        assert!(err.to_string().contains("rendered"));
    }
}
