//! Signaling Relay Module
//!
//! Role assignment, message dispatch and disconnect handling for the
//! broadcaster/viewer pair.

pub mod engine;
pub mod session;

pub use engine::{CloseRequest, Outbox, RelayEngine, SessionSnapshot};
pub use session::{
    ConnectionId, ConnectionState, DropReason, Effect, Event, Outcome, RejectReason, Session,
    Transition,
};
