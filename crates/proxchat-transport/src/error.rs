/// Errors that can occur in the transport layer.
///
/// Every variant is a connection failure from the point of view of the
/// layers above: the session controller treats them all as "disconnected".
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote end could not be reached or refused the upgrade.
    #[error("connect to {url} failed: {reason}")]
    ConnectFailed { url: String, reason: String },

    /// The connection attempt did not finish within the configured deadline.
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
