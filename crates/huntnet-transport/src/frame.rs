//! Control frames that ride inside each UDP datagram.
//!
//! Every datagram carries exactly one frame: a 1-byte kind, then a
//! fixed-layout body. Application payloads are opaque to this layer — the
//! frame only adds the sequence number that reliable delivery needs.
//!
//! Frame kinds are internal to the transport and independent of the
//! application packet tags layered on top.

pub const KIND_CONNECT: u8 = 1;
pub const KIND_ACCEPT: u8 = 2;
pub const KIND_REFUSE: u8 = 3;
pub const KIND_PAYLOAD: u8 = 4;
pub const KIND_ACK: u8 = 5;
pub const KIND_DISCONNECT: u8 = 6;
pub const KIND_KEEPALIVE: u8 = 7;

/// Why a connection attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefuseReason {
    /// The endpoint is at its peer capacity.
    Full,
    /// A reason byte this build does not know. Kept verbatim so newer
    /// peers can refuse with codes we have not learned yet.
    Other(u8),
}

impl RefuseReason {
    fn to_byte(self) -> u8 {
        match self {
            RefuseReason::Full => 1,
            RefuseReason::Other(b) => b,
        }
    }

    fn from_byte(byte: u8) -> Self {
        match byte {
            1 => RefuseReason::Full,
            other => RefuseReason::Other(other),
        }
    }
}

/// One datagram's worth of transport traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Client asks to open a connection. Retransmitted until answered.
    Connect,
    /// Host grants the connection.
    Accept,
    /// Host turns the connection away.
    Refuse { reason: RefuseReason },
    /// One reliable application message. `seq` starts at 1 per connection.
    Payload { seq: u32, data: Vec<u8> },
    /// Cumulative acknowledgement: every payload with `seq <= cumulative`
    /// has been delivered in order on the sending side of this frame.
    Ack { cumulative: u32 },
    /// Orderly teardown. Best effort, sent once.
    Disconnect,
    /// Traffic to keep the timeout clock from firing on an idle link.
    Keepalive,
}

impl Frame {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Frame::Connect => vec![KIND_CONNECT],
            Frame::Accept => vec![KIND_ACCEPT],
            Frame::Refuse { reason } => vec![KIND_REFUSE, reason.to_byte()],
            Frame::Payload { seq, data } => {
                let mut buf = Vec::with_capacity(5 + data.len());
                buf.push(KIND_PAYLOAD);
                buf.extend_from_slice(&seq.to_ne_bytes());
                buf.extend_from_slice(data);
                buf
            }
            Frame::Ack { cumulative } => {
                let mut buf = Vec::with_capacity(5);
                buf.push(KIND_ACK);
                buf.extend_from_slice(&cumulative.to_ne_bytes());
                buf
            }
            Frame::Disconnect => vec![KIND_DISCONNECT],
            Frame::Keepalive => vec![KIND_KEEPALIVE],
        }
    }

    /// Parses one datagram. `None` means the datagram is malformed and
    /// should be dropped — a bad frame from the network is noise, not an
    /// error the caller can act on.
    pub fn decode(buf: &[u8]) -> Option<Frame> {
        let (&kind, body) = buf.split_first()?;
        match kind {
            KIND_CONNECT if body.is_empty() => Some(Frame::Connect),
            KIND_ACCEPT if body.is_empty() => Some(Frame::Accept),
            KIND_REFUSE if body.len() == 1 => Some(Frame::Refuse {
                reason: RefuseReason::from_byte(body[0]),
            }),
            KIND_PAYLOAD if body.len() >= 4 => {
                let seq = u32::from_ne_bytes([body[0], body[1], body[2], body[3]]);
                Some(Frame::Payload {
                    seq,
                    data: body[4..].to_vec(),
                })
            }
            KIND_ACK if body.len() == 4 => {
                let cumulative = u32::from_ne_bytes([body[0], body[1], body[2], body[3]]);
                Some(Frame::Ack { cumulative })
            }
            KIND_DISCONNECT if body.is_empty() => Some(Frame::Disconnect),
            KIND_KEEPALIVE if body.is_empty() => Some(Frame::Keepalive),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_frame_round_trips() {
        let frames = [
            Frame::Connect,
            Frame::Accept,
            Frame::Refuse {
                reason: RefuseReason::Full,
            },
            Frame::Payload {
                seq: 7,
                data: vec![1, 2, 3],
            },
            Frame::Payload {
                seq: 1,
                data: vec![],
            },
            Frame::Ack { cumulative: 42 },
            Frame::Disconnect,
            Frame::Keepalive,
        ];
        for frame in frames {
            let decoded = Frame::decode(&frame.encode());
            assert_eq!(decoded, Some(frame));
        }
    }

    #[test]
    fn test_empty_datagram_is_dropped() {
        assert_eq!(Frame::decode(&[]), None);
    }

    #[test]
    fn test_unknown_kind_is_dropped() {
        assert_eq!(Frame::decode(&[0]), None);
        assert_eq!(Frame::decode(&[99, 1, 2]), None);
    }

    #[test]
    fn test_short_ack_is_dropped() {
        assert_eq!(Frame::decode(&[KIND_ACK, 1, 2]), None);
    }

    #[test]
    fn test_connect_with_trailing_bytes_is_dropped() {
        assert_eq!(Frame::decode(&[KIND_CONNECT, 0xFF]), None);
    }

    #[test]
    fn test_unknown_refuse_code_is_preserved() {
        let frame = Frame::decode(&[KIND_REFUSE, 200]).unwrap();
        assert_eq!(
            frame,
            Frame::Refuse {
                reason: RefuseReason::Other(200)
            }
        );
    }
}
