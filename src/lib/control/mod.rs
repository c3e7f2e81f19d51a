pub mod client;
pub mod message;

/// Control-protocol framing limits. A line longer than this, or with more
/// tokens than this, is a protocol error, never a crash.
pub const MAX_MSG_SIZE: usize = 2048;
pub const MAX_TOKENS: usize = 100;
