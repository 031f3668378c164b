use std::fmt;

use crate::error::CoreError;

/// The states of one offer → credential exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum IssuanceState {
    /// Issuer has produced an offer.
    Offered,
    /// Holder has answered the offer with a blinded request.
    Requested,
    /// Issuer has signed the blinded request.
    Issued,
    /// Holder has unblinded and validated the credential. Final state.
    Processed,
    /// A step failed validation and the exchange was abandoned. Final state.
    Rejected,
}

impl IssuanceState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Processed | Self::Rejected)
    }
}

impl fmt::Display for IssuanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offered => write!(f, "Offered"),
            Self::Requested => write!(f, "Requested"),
            Self::Issued => write!(f, "Issued"),
            Self::Processed => write!(f, "Processed"),
            Self::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Events that move an exchange forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceEvent {
    /// Holder sends a credential request.
    Request,
    /// Issuer signs the request.
    Issue,
    /// Holder unblinds and stores the credential.
    Process,
    /// Either party rejects the artifact it received.
    Reject,
}

/// Issuance transitions.
///
/// Valid transitions:
/// - Offered → Requested (Request)
/// - Requested → Issued (Issue)
/// - Issued → Processed (Process)
/// - Offered | Requested | Issued → Rejected (Reject)
pub struct IssuanceStateMachine;

impl IssuanceStateMachine {
    /// Attempt a state transition based on an event.
    pub fn transition(
        current: IssuanceState,
        event: IssuanceEvent,
    ) -> Result<IssuanceState, CoreError> {
        let new_state = match (current, event) {
            (IssuanceState::Offered, IssuanceEvent::Request) => IssuanceState::Requested,
            (IssuanceState::Requested, IssuanceEvent::Issue) => IssuanceState::Issued,
            (IssuanceState::Issued, IssuanceEvent::Process) => IssuanceState::Processed,
            (state, IssuanceEvent::Reject) if !state.is_final() => IssuanceState::Rejected,

            _ => {
                let target = match event {
                    IssuanceEvent::Request => IssuanceState::Requested,
                    IssuanceEvent::Issue => IssuanceState::Issued,
                    IssuanceEvent::Process => IssuanceState::Processed,
                    IssuanceEvent::Reject => IssuanceState::Rejected,
                };
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "issuance state transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: IssuanceState, event: IssuanceEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = IssuanceState::Offered;
        let state = IssuanceStateMachine::transition(state, IssuanceEvent::Request).unwrap();
        assert_eq!(state, IssuanceState::Requested);
        let state = IssuanceStateMachine::transition(state, IssuanceEvent::Issue).unwrap();
        assert_eq!(state, IssuanceState::Issued);
        let state = IssuanceStateMachine::transition(state, IssuanceEvent::Process).unwrap();
        assert_eq!(state, IssuanceState::Processed);
        assert!(state.is_final());
    }

    #[test]
    fn test_cannot_issue_before_request() {
        let result = IssuanceStateMachine::transition(IssuanceState::Offered, IssuanceEvent::Issue);
        match result {
            Err(CoreError::InvalidStateTransition { from, to }) => {
                assert_eq!(from, IssuanceState::Offered);
                assert_eq!(to, IssuanceState::Issued);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_cannot_process_before_issue() {
        assert!(
            IssuanceStateMachine::transition(IssuanceState::Requested, IssuanceEvent::Process)
                .is_err()
        );
    }

    #[test]
    fn test_cannot_request_twice() {
        assert!(
            IssuanceStateMachine::transition(IssuanceState::Requested, IssuanceEvent::Request)
                .is_err()
        );
    }

    #[test]
    fn test_reject_from_any_open_state() {
        for state in [
            IssuanceState::Offered,
            IssuanceState::Requested,
            IssuanceState::Issued,
        ] {
            let next = IssuanceStateMachine::transition(state, IssuanceEvent::Reject).unwrap();
            assert_eq!(next, IssuanceState::Rejected);
        }
    }

    #[test]
    fn test_final_states_are_sticky() {
        for state in [IssuanceState::Processed, IssuanceState::Rejected] {
            for event in [
                IssuanceEvent::Request,
                IssuanceEvent::Issue,
                IssuanceEvent::Process,
                IssuanceEvent::Reject,
            ] {
                assert!(!IssuanceStateMachine::can_transition(state, event));
            }
        }
    }

    #[test]
    fn test_all_final_states() {
        assert!(IssuanceState::Processed.is_final());
        assert!(IssuanceState::Rejected.is_final());
        assert!(!IssuanceState::Offered.is_final());
        assert!(!IssuanceState::Requested.is_final());
        assert!(!IssuanceState::Issued.is_final());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", IssuanceState::Offered), "Offered");
        assert_eq!(format!("{}", IssuanceState::Processed), "Processed");
        assert_eq!(format!("{}", IssuanceState::Rejected), "Rejected");
    }
}
