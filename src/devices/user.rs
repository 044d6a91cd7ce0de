// MIT License - Copyright (c) 2026 Peter Wright

/// Last-known open/close record for a panel user.
///
/// Users are created both by dedicated user-update frames and as a side
/// effect of user-closing/user-opening partition frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserState {
    /// Status label from the catalogue row (e.g. "userclosing")
    pub status: String,
    /// Human-readable command name from the catalogue row
    pub name: String,
    /// The raw frame that produced this state, checksum included
    pub last_frame: String,
}
