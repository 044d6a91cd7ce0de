// MIT License - Copyright (c) 2026 Peter Wright

use bitflags::bitflags;

bitflags! {
    /// Verbose trouble status bitfield (code 849).
    ///
    /// One byte packs eight independent system faults, bit 0 through bit 7.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TroubleFlags: u8 {
        const SERVICE_IS_REQUIRED        = 1 << 0;
        const AC_POWER_LOST              = 1 << 1;
        const TELEPHONE_LINE_FAULT       = 1 << 2;
        const FAILURE_TO_COMMUNICATE     = 1 << 3;
        const SENSOR_OR_ZONE_FAULT       = 1 << 4;
        const SENSOR_OR_ZONE_TAMPER      = 1 << 5;
        const SENSOR_OR_ZONE_LOW_BATTERY = 1 << 6;
        const LOSS_OF_TIME               = 1 << 7;
    }
}

impl TroubleFlags {
    /// Parse the two hex characters at offset 3 of an 849 frame.
    pub fn from_hex(s: &str) -> Option<Self> {
        u8::from_str_radix(s, 16).ok().map(Self::from_bits_retain)
    }

    // Convenience accessors matching the reported fault names
    pub fn service_is_required(&self) -> bool { self.contains(Self::SERVICE_IS_REQUIRED) }
    pub fn ac_power_lost(&self) -> bool { self.contains(Self::AC_POWER_LOST) }
    pub fn telephone_line_fault(&self) -> bool { self.contains(Self::TELEPHONE_LINE_FAULT) }
    pub fn failure_to_communicate(&self) -> bool { self.contains(Self::FAILURE_TO_COMMUNICATE) }
    pub fn sensor_or_zone_fault(&self) -> bool { self.contains(Self::SENSOR_OR_ZONE_FAULT) }
    pub fn sensor_or_zone_tamper(&self) -> bool { self.contains(Self::SENSOR_OR_ZONE_TAMPER) }
    pub fn sensor_or_zone_low_battery(&self) -> bool { self.contains(Self::SENSOR_OR_ZONE_LOW_BATTERY) }
    pub fn loss_of_time(&self) -> bool { self.contains(Self::LOSS_OF_TIME) }
}
