/// Errors that can occur in the discovery layer.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Binding the discovery socket failed.
    #[error("discovery bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Enabling broadcast or nonblocking mode on the socket failed.
    #[error("discovery socket setup failed: {0}")]
    Setup(#[source] std::io::Error),

    /// Sending a broadcast or response failed.
    #[error("discovery send failed: {0}")]
    Send(#[source] std::io::Error),
}
