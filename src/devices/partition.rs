// MIT License - Copyright (c) 2026 Peter Wright

/// Last-known state of a partition.
///
/// Derived values (arm mode, opening/closing actor) are computed per update
/// and carried on the event, never stored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionState {
    /// Status label from the catalogue row (e.g. "armed", "ready")
    pub status: String,
    /// Human-readable command name from the catalogue row
    pub name: String,
    /// The raw frame that produced this state, checksum included
    pub last_frame: String,
}

/// Arming mode reported by a partition-armed frame (code 652).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMode {
    Away,
    Stay,
    ZeroEntryAway,
    ZeroEntryStay,
}

impl ArmMode {
    /// Decode the single mode digit at offset 4 of a 652 frame.
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Self::Away),
            1 => Some(Self::Stay),
            2 => Some(Self::ZeroEntryAway),
            3 => Some(Self::ZeroEntryStay),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Away => "away",
            Self::Stay => "stay",
            Self::ZeroEntryAway => "zero-entry-away",
            Self::ZeroEntryStay => "zero-entry-stay",
        }
    }
}

/// Who drove an opening or closing transition (codes 700/701/750/751).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpeningClosing {
    UserClosing,
    SpecialClosing,
    UserOpening,
    SpecialOpening,
}

impl OpeningClosing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserClosing => "userClosing",
            Self::SpecialClosing => "specialClosing",
            Self::UserOpening => "userOpening",
            Self::SpecialOpening => "specialOpening",
        }
    }
}
