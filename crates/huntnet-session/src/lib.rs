//! Session lifecycle tracking for Huntnet.
//!
//! A "session" here is the whole networking run — hosting a lobby or
//! joining one — not an individual connection. This crate owns the state
//! machine that the rest of the stack reads:
//!
//! ```text
//! Coordinator (above)  ← drives transitions as transport events arrive
//!     ↕
//! Session Layer (this crate)  ← one state + one reason, nothing else
//!     ↕
//! UI / menus (outside)  ← render menu, lobby, or error banner from it
//! ```
//!
//! Keeping this crate tiny and free of socket types is deliberate: every
//! consumer that only needs "are we connected?" avoids depending on the
//! transport.

mod machine;

pub use machine::{SessionMachine, SessionState};
