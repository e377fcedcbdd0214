//! Error types for the wire codec.

/// Errors that can occur while decoding a packet.
///
/// Decoding is the adversarial path: the bytes may come from a hostile or
/// broken peer, so every failure mode is an explicit variant rather than a
/// panic. Encoding never fails — over-long fields are truncated, not
/// rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before the packet body was fully read.
    ///
    /// Covers the empty buffer, a lone tag byte, and any length prefix
    /// that points past the end of the buffer.
    #[error("unexpected end of packet buffer")]
    UnexpectedEnd,

    /// The leading tag byte does not name any known packet variant.
    #[error("unknown packet tag {0}")]
    UnknownTag(u8),

    /// A list declared more elements than the protocol-level cap allows.
    ///
    /// Encoders cap list counts, so a compliant peer never produces this;
    /// it exists to bound memory against hostile length prefixes.
    #[error("list length {len} exceeds cap {max}")]
    OversizedList { len: usize, max: usize },

    /// The packet body decoded cleanly but bytes were left over.
    ///
    /// Treated as corruption: a tag byte flipped in transit would otherwise
    /// let one variant's fields be misread as another's.
    #[error("{0} trailing bytes after packet body")]
    TrailingBytes(usize),
}
