//! The backend capability contract and the adapter that dispatches it.

use std::fmt;

use proxchat_protocol::{BackendEvent, BackendModel, BackendParams, BackendType};
use tokio::sync::mpsc;

use crate::{BackendError, ImpostorBackend, NoOpBackend};

// ---------------------------------------------------------------------------
// BackendStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a backend adapter.
///
/// ```text
///  Idle ──initialize──▶ Connected ──hub lost──▶ Failed
///   │                       │                     │
///   └──initialize fails─────┼──────▶ Failed       │
///                           ▼                     ▼
///                       Destroyed ◀──destroy──────┘
/// ```
///
/// `Failed` is alive but idle: no events flow, `initialize` may be tried
/// again, `destroy` succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendStatus {
    #[default]
    Idle,
    Connected,
    Failed,
    Destroyed,
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connected => write!(f, "connected"),
            Self::Failed => write!(f, "failed"),
            Self::Destroyed => write!(f, "destroyed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// What every game backend can do.
///
/// Implementations translate their own upstream vocabulary into
/// [`BackendEvent`]s and push them into the channel they were built with.
pub trait Backend {
    /// Connects upstream, starts event delivery, and sends "track game".
    async fn try_initialize(&mut self) -> Result<(), BackendError>;

    /// Closes the upstream connection. Returns once the close completes.
    ///
    /// # Errors
    /// [`BackendError::NotInitialized`] if `initialize` was never attempted.
    async fn destroy(&mut self) -> Result<(), BackendError>;

    /// Asks the upstream to follow a (possibly different) game.
    async fn track(&self, game_code: &str) -> Result<(), BackendError>;

    fn status(&self) -> BackendStatus;
}

// ---------------------------------------------------------------------------
// BackendAdapter
// ---------------------------------------------------------------------------

/// One variant per supported game, selected by `backendType`.
pub enum BackendAdapter {
    NoOp(NoOpBackend),
    Impostor(ImpostorBackend),
}

impl BackendAdapter {
    /// Builds the adapter a model asks for. Nothing is dialed yet.
    ///
    /// Events will be pushed into `events` once initialized.
    pub fn from_model(model: &BackendModel, events: mpsc::Sender<BackendEvent>) -> Self {
        match &model.backend {
            BackendParams::NoOp => Self::NoOp(NoOpBackend::new()),
            BackendParams::Impostor(params) => Self::Impostor(ImpostorBackend::new(
                model.game_code.clone(),
                params.clone(),
                events,
            )),
        }
    }

    pub fn backend_type(&self) -> BackendType {
        match self {
            Self::NoOp(_) => BackendType::NoOp,
            Self::Impostor(_) => BackendType::Impostor,
        }
    }

    /// Connects upstream. Failures are logged, never returned: the adapter
    /// stays alive with status [`BackendStatus::Failed`].
    pub async fn initialize(&mut self) {
        let backend_type = self.backend_type();
        if let Err(e) = self.try_initialize().await {
            tracing::warn!(%backend_type, error = %e, "backend failed to initialize");
        }
    }
}

impl Backend for BackendAdapter {
    async fn try_initialize(&mut self) -> Result<(), BackendError> {
        match self {
            Self::NoOp(b) => b.try_initialize().await,
            Self::Impostor(b) => b.try_initialize().await,
        }
    }

    async fn destroy(&mut self) -> Result<(), BackendError> {
        match self {
            Self::NoOp(b) => b.destroy().await,
            Self::Impostor(b) => b.destroy().await,
        }
    }

    async fn track(&self, game_code: &str) -> Result<(), BackendError> {
        match self {
            Self::NoOp(b) => b.track(game_code).await,
            Self::Impostor(b) => b.track(game_code).await,
        }
    }

    fn status(&self) -> BackendStatus {
        match self {
            Self::NoOp(b) => b.status(),
            Self::Impostor(b) => b.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proxchat_protocol::ImpostorParams;

    use super::*;

    #[test]
    fn test_from_model_selects_variant() {
        let (tx, _rx) = mpsc::channel(1);
        let noop = BackendAdapter::from_model(&BackendModel::default(), tx.clone());
        assert_eq!(noop.backend_type(), BackendType::NoOp);

        let mut params = ImpostorParams::new("10.0.0.2");
        params.port = Some(5000);
        let model = BackendModel::new("ABCDEF", BackendParams::Impostor(params));
        let adapter = BackendAdapter::from_model(&model, tx);
        assert_eq!(adapter.backend_type(), BackendType::Impostor);
        assert_eq!(adapter.status(), BackendStatus::Idle);
        let BackendAdapter::Impostor(b) = adapter else {
            panic!("expected impostor");
        };
        assert_eq!(b.hub_url(), "ws://10.0.0.2:5000/hub");
        assert_eq!(b.game_code(), "ABCDEF");
    }

    #[test]
    fn test_default_port() {
        let (tx, _rx) = mpsc::channel(1);
        let b = ImpostorBackend::new("X", ImpostorParams::new("host"), tx);
        assert_eq!(b.hub_url(), "ws://host:22024/hub");
    }

    #[tokio::test]
    async fn test_initialize_failure_is_swallowed() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (tx, _rx) = mpsc::channel(1);
        let mut params = ImpostorParams::new("127.0.0.1");
        params.port = Some(port);
        let model = BackendModel::new("ABCDEF", BackendParams::Impostor(params));
        let mut adapter = BackendAdapter::from_model(&model, tx);

        adapter.initialize().await;
        assert_eq!(adapter.status(), BackendStatus::Failed);

        // Attempted, so destroy is allowed.
        adapter.destroy().await.unwrap();
        assert_eq!(adapter.status(), BackendStatus::Destroyed);
    }

    #[tokio::test]
    async fn test_destroy_before_initialize_is_an_error() {
        let (tx, _rx) = mpsc::channel(1);
        let model = BackendModel::new("ABCDEF", BackendParams::Impostor(ImpostorParams::new("x")));
        let mut adapter = BackendAdapter::from_model(&model, tx);
        assert!(matches!(adapter.destroy().await, Err(BackendError::NotInitialized)));
    }
}
