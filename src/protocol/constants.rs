//! Signaling Protocol Constants

// Message types interpreted by the relay
pub const MSG_TYPE_IDENTIFY: &str = "identify";

// Role names carried by `identify`
pub const ROLE_BROADCASTER: &str = "broadcaster";
pub const ROLE_VIEWER: &str = "viewer";

// WebSocket close codes (RFC 6455 section 7.4.1)
pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_GOING_AWAY: u16 = 1001;
pub const CLOSE_INVALID_PAYLOAD: u16 = 1007;
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;
pub const CLOSE_TRY_AGAIN_LATER: u16 = 1013;

// Close reasons sent alongside the codes above
pub const REASON_COUNTERPART_GONE: &str = "broadcaster disconnected";
pub const REASON_SHUTTING_DOWN: &str = "server shutting down";
pub const REASON_MALFORMED: &str = "malformed message";
pub const REASON_INVALID_ROLE: &str = "invalid role";
pub const REASON_SLOT_OCCUPIED: &str = "role already taken";
pub const REASON_SEND_QUEUE_FULL: &str = "send queue overflow";
