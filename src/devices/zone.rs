// MIT License - Copyright (c) 2026 Peter Wright

/// Last-known state of a single alarm zone.
///
/// Created on the first observed frame for the zone id, overwritten on every
/// later frame, never deleted during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneState {
    /// Status label from the catalogue row (e.g. "open", "restored")
    pub status: String,
    /// Human-readable command name from the catalogue row
    pub name: String,
    /// The raw frame that produced this state, checksum included
    pub last_frame: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_state_clone_eq() {
        let zone = ZoneState {
            status: "open".to_string(),
            name: "Zone Open".to_string(),
            last_frame: "60900130".to_string(),
        };
        assert_eq!(zone.clone(), zone);
    }
}
