//! The session lifecycle controller.

use proxchat_protocol::ClientId;

use crate::{SessionEffect, SessionError, SessionSignal, SessionState};

/// Drives a [`SessionState`] from transport and hub signals.
///
/// The controller owns no I/O. It is told what happened and answers with
/// what must be done ([`SessionEffect`]); the caller carries the effect out
/// against the room store. That split keeps the state machine testable
/// without a socket or a runtime.
#[derive(Debug, Default)]
pub struct SessionController {
    state: SessionState,
    uuid: ClientId,
    last_reason: Option<String>,
    resets: u64,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The identity last assigned by the hub. Empty after a reset.
    pub fn uuid(&self) -> &ClientId {
        &self.uuid
    }

    /// Why the session last dropped, if it ever did.
    pub fn last_reason(&self) -> Option<&str> {
        self.last_reason.as_deref()
    }

    /// How many resets this controller has asked for.
    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// Applies a signal and returns the effect the caller must perform.
    ///
    /// # Errors
    /// - [`SessionError::NotConnected`] — a join acknowledgment arrived
    ///   while disconnected.
    /// - [`SessionError::AlreadyConnected`] — `Connect` while a connection
    ///   is already live.
    ///
    /// The state is unchanged on error.
    pub fn apply(
        &mut self,
        signal: SessionSignal,
    ) -> Result<Option<SessionEffect>, SessionError> {
        match signal {
            SessionSignal::Connect => {
                if self.state != SessionState::Disconnected {
                    return Err(SessionError::AlreadyConnected(self.state));
                }
                self.transition(SessionState::Connecting);
                Ok(None)
            }
            SessionSignal::Error(reason) => {
                tracing::warn!(from = %self.state, %reason, "transport error");
                Ok(Some(self.drop_session(reason)))
            }
            SessionSignal::Disconnect(reason) => {
                tracing::info!(from = %self.state, %reason, "transport closed");
                Ok(Some(self.drop_session(reason)))
            }
            SessionSignal::UuidAssigned(uuid) => {
                tracing::debug!(%uuid, "identity assigned");
                self.uuid = uuid;
                Ok(None)
            }
            SessionSignal::JoinedRoom(true) => match self.state {
                SessionState::Disconnected => Err(SessionError::NotConnected(self.state)),
                SessionState::Connecting => {
                    self.transition(SessionState::Joined);
                    Ok(None)
                }
                SessionState::Joined => Ok(None),
            },
            SessionSignal::JoinedRoom(false) => {
                if self.state == SessionState::Joined {
                    self.transition(SessionState::Connecting);
                }
                Ok(None)
            }
        }
    }

    /// Like [`apply`](Self::apply), but logs and ignores rejected signals.
    pub fn handle(&mut self, signal: SessionSignal) -> Option<SessionEffect> {
        match self.apply(signal) {
            Ok(effect) => effect,
            Err(e) => {
                tracing::debug!(error = %e, "session signal ignored");
                None
            }
        }
    }

    fn drop_session(&mut self, reason: String) -> SessionEffect {
        self.transition(SessionState::Disconnected);
        self.uuid = ClientId::default();
        self.last_reason = Some(reason);
        self.resets += 1;
        SessionEffect::ResetRoom
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            tracing::info!(from = %self.state, %to, "session state changed");
            self.state = to;
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionController`.
    //!
    //! Naming follows `test_{signal}_{scenario}_{expected}`.

    use super::*;

    fn joined() -> SessionController {
        let mut c = SessionController::new();
        c.apply(SessionSignal::Connect).unwrap();
        c.apply(SessionSignal::UuidAssigned(ClientId::new("me"))).unwrap();
        c.apply(SessionSignal::JoinedRoom(true)).unwrap();
        c
    }

    // =====================================================================
    // Connect / join
    // =====================================================================

    #[test]
    fn test_new_controller_is_disconnected() {
        let c = SessionController::new();
        assert_eq!(c.state(), SessionState::Disconnected);
        assert!(c.uuid().is_empty());
        assert_eq!(c.resets(), 0);
    }

    #[test]
    fn test_connect_from_disconnected_goes_connecting() {
        let mut c = SessionController::new();
        assert_eq!(c.apply(SessionSignal::Connect).unwrap(), None);
        assert_eq!(c.state(), SessionState::Connecting);
    }

    #[test]
    fn test_connect_while_joined_is_rejected() {
        let mut c = joined();
        let err = c.apply(SessionSignal::Connect).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyConnected(SessionState::Joined)));
        assert_eq!(c.state(), SessionState::Joined);
    }

    #[test]
    fn test_uuid_assigned_does_not_join() {
        let mut c = SessionController::new();
        c.apply(SessionSignal::Connect).unwrap();
        c.apply(SessionSignal::UuidAssigned(ClientId::new("u1"))).unwrap();
        assert_eq!(c.state(), SessionState::Connecting);
        assert_eq!(c.uuid().as_str(), "u1");
    }

    #[test]
    fn test_joined_room_true_from_connecting_joins() {
        let c = joined();
        assert_eq!(c.state(), SessionState::Joined);
    }

    #[test]
    fn test_joined_room_true_while_disconnected_is_ignored() {
        let mut c = SessionController::new();
        assert!(matches!(
            c.apply(SessionSignal::JoinedRoom(true)),
            Err(SessionError::NotConnected(_))
        ));
        assert_eq!(c.handle(SessionSignal::JoinedRoom(true)), None);
        assert_eq!(c.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_joined_room_false_falls_back_to_connecting() {
        let mut c = joined();
        c.apply(SessionSignal::JoinedRoom(false)).unwrap();
        assert_eq!(c.state(), SessionState::Connecting);
    }

    // =====================================================================
    // Error / disconnect
    // =====================================================================

    #[test]
    fn test_error_from_any_state_resets() {
        for setup in [
            SessionController::new as fn() -> SessionController,
            || {
                let mut c = SessionController::new();
                c.apply(SessionSignal::Connect).unwrap();
                c
            },
            joined,
        ] {
            let mut c = setup();
            let effect = c.apply(SessionSignal::Error("boom".into())).unwrap();
            assert_eq!(effect, Some(SessionEffect::ResetRoom));
            assert_eq!(c.state(), SessionState::Disconnected);
            assert!(c.uuid().is_empty());
        }
    }

    #[test]
    fn test_repeated_disconnect_is_idempotent() {
        let mut c = joined();
        let first = c.handle(SessionSignal::Disconnect("closed".into()));
        let second = c.handle(SessionSignal::Disconnect("closed".into()));
        let third = c.handle(SessionSignal::Error("late error".into()));

        assert_eq!(first, Some(SessionEffect::ResetRoom));
        assert_eq!(second, first);
        assert_eq!(third, first);
        assert_eq!(c.state(), SessionState::Disconnected);
        assert_eq!(c.resets(), 3);
        assert_eq!(c.last_reason(), Some("late error"));
    }

    #[test]
    fn test_no_automatic_reconnect() {
        let mut c = joined();
        c.handle(SessionSignal::Disconnect("closed".into()));
        c.handle(SessionSignal::UuidAssigned(ClientId::new("late")));
        c.handle(SessionSignal::JoinedRoom(true));
        assert_eq!(c.state(), SessionState::Disconnected);

        c.apply(SessionSignal::Connect).unwrap();
        assert_eq!(c.state(), SessionState::Connecting);
    }
}
