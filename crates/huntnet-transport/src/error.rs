use crate::PeerId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the UDP socket failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Reading the socket's local address failed.
    #[error("local address unavailable: {0}")]
    LocalAddr(#[source] std::io::Error),

    /// Sending a datagram failed.
    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),

    /// The payload does not fit in a single datagram.
    ///
    /// There is no fragmentation layer; callers must keep messages under
    /// the budget.
    #[error("payload of {len} bytes exceeds the {max}-byte datagram budget")]
    PayloadTooLarge { len: usize, max: usize },

    /// The peer id does not name a live peer.
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),

    /// The peer exists but the handshake has not completed yet.
    #[error("{0} is not connected yet")]
    NotConnected(PeerId),
}
