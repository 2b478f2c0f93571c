//! The backend for rooms with no game attached.

use crate::{Backend, BackendError, BackendStatus};

/// Accepts every call and produces no events.
///
/// Groups and poses in a NoOp room change only through the relay hub.
#[derive(Debug, Default)]
pub struct NoOpBackend {
    status: BackendStatus,
}

impl NoOpBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for NoOpBackend {
    async fn try_initialize(&mut self) -> Result<(), BackendError> {
        if matches!(self.status, BackendStatus::Connected | BackendStatus::Destroyed) {
            return Err(BackendError::AlreadyInitialized(self.status));
        }
        tracing::debug!("noop backend initialized");
        self.status = BackendStatus::Connected;
        Ok(())
    }

    async fn destroy(&mut self) -> Result<(), BackendError> {
        if self.status == BackendStatus::Idle {
            return Err(BackendError::NotInitialized);
        }
        self.status = BackendStatus::Destroyed;
        Ok(())
    }

    async fn track(&self, _game_code: &str) -> Result<(), BackendError> {
        match self.status {
            BackendStatus::Idle => Err(BackendError::NotInitialized),
            BackendStatus::Connected => Ok(()),
            BackendStatus::Failed | BackendStatus::Destroyed => Err(BackendError::Closed),
        }
    }

    fn status(&self) -> BackendStatus {
        self.status
    }
}
