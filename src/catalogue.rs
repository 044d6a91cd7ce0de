// MIT License - Copyright (c) 2026 Peter Wright
// Command catalogue: code -> metadata lookup, one table per traffic direction

/// What the bridge does with a frame received from the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    /// Panel is asking for a user access code
    CodeRequired,
    /// Zone status change
    UpdateZone,
    /// Partition status change
    UpdatePartition,
    /// Partition user open/close record
    UpdatePartitionUser,
    /// System-wide status change
    UpdateSystem,
    /// Login interaction (challenge/result)
    LoginResponse,
    /// Acknowledge for a previously sent command
    CommandCompleted,
    /// Error response for a previously sent command
    CommandError,
    /// Recognized but not dispatched
    None,
}

/// What the bridge does with a frame received from a downstream client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAction {
    /// Session login: compare the payload against the proxy password
    CheckPassword,
    /// Relay the frame (minus checksum) to the panel
    Forward,
    /// Recognized but not relayed
    None,
}

/// One catalogue row: static metadata for a 3-character command code.
///
/// `bytes` is the expected payload length; a row with `bytes == 0` carries no
/// payload and is logged rather than dispatched. `send` is direction-specific:
/// for panel rows it is the status label stored into the state maps, for
/// client rows it is the acknowledgement payload written back to the client.
#[derive(Debug, Clone)]
pub struct CommandMeta<A> {
    pub code: &'static str,
    pub name: &'static str,
    pub bytes: usize,
    pub pre: &'static str,
    pub post: &'static str,
    pub action: A,
    pub send: &'static str,
}

pub type PanelMeta = CommandMeta<PanelAction>;
pub type ClientMeta = CommandMeta<ClientAction>;

/// Read-only code→metadata lookup, one table per direction.
///
/// The bridge core only depends on this trait; the table contents are a
/// collaborator concern. [`TpiCatalogue`] ships a usable default.
pub trait Catalogue: Send + Sync {
    fn panel_meta(&self, code: &str) -> Option<&PanelMeta>;
    fn client_meta(&self, code: &str) -> Option<&ClientMeta>;
}

macro_rules! meta {
    ($code:literal, $name:literal, $bytes:literal, $pre:literal, $post:literal, $action:expr, $send:literal) => {
        CommandMeta {
            code: $code,
            name: $name,
            bytes: $bytes,
            pre: $pre,
            post: $post,
            action: $action,
            send: $send,
        }
    };
}

/// Panel → bridge command table.
static PANEL_COMMANDS: &[PanelMeta] = &[
    meta!("500", "Command Acknowledge", 3, "Acknowledge for command", "", PanelAction::CommandCompleted, "commandack"),
    meta!("501", "Command Error", 0, "Command error (bad checksum)", "", PanelAction::CommandError, "commanderror"),
    meta!("502", "System Error", 3, "System error code", "", PanelAction::CommandError, "systemerror"),
    meta!("505", "Login Interaction", 1, "Login status", "", PanelAction::LoginResponse, "loginresponse"),
    meta!("510", "Keypad LED State", 2, "Keypad LED bitfield", "", PanelAction::None, "keypadled"),
    meta!("550", "Time-Date Broadcast", 10, "Panel time", "", PanelAction::None, "timebroadcast"),
    meta!("560", "Ring Detected", 0, "Ring detected on phone line", "", PanelAction::None, "ring"),
    meta!("601", "Zone Alarm", 4, "Alarm in zone", "", PanelAction::UpdateZone, "alarm"),
    meta!("602", "Zone Alarm Restore", 4, "Alarm restored in zone", "", PanelAction::UpdateZone, "alarmrestore"),
    meta!("603", "Zone Tamper", 4, "Tamper in zone", "", PanelAction::UpdateZone, "tamper"),
    meta!("604", "Zone Tamper Restore", 4, "Tamper restored in zone", "", PanelAction::UpdateZone, "tamperrestore"),
    meta!("605", "Zone Fault", 3, "Fault in zone", "", PanelAction::UpdateZone, "fault"),
    meta!("606", "Zone Fault Restore", 3, "Fault restored in zone", "", PanelAction::UpdateZone, "faultrestore"),
    meta!("609", "Zone Open", 3, "Zone open", "", PanelAction::UpdateZone, "open"),
    meta!("610", "Zone Restored", 3, "Zone restored", "", PanelAction::UpdateZone, "restored"),
    meta!("620", "Duress Alarm", 4, "Duress alarm, code", "", PanelAction::UpdateSystem, "duressalarm"),
    meta!("621", "Fire Key Alarm", 0, "Fire key alarm", "", PanelAction::UpdateSystem, "firekeyalarm"),
    meta!("622", "Fire Key Restore", 0, "Fire key restored", "", PanelAction::UpdateSystem, "firekeyrestore"),
    meta!("625", "Panic Key Alarm", 0, "Panic key alarm", "", PanelAction::UpdateSystem, "panickeyalarm"),
    meta!("626", "Panic Key Restore", 0, "Panic key restored", "", PanelAction::UpdateSystem, "panickeyrestore"),
    meta!("650", "Partition Ready", 1, "Partition ready", "", PanelAction::UpdatePartition, "ready"),
    meta!("651", "Partition Not Ready", 1, "Partition not ready", "", PanelAction::UpdatePartition, "notready"),
    meta!("652", "Partition Armed", 2, "Partition armed, mode", "", PanelAction::UpdatePartition, "armed"),
    meta!("653", "Partition Ready - Force Arming Enabled", 1, "Partition ready (force arm)", "", PanelAction::UpdatePartition, "readyforce"),
    meta!("654", "Partition In Alarm", 1, "Partition in alarm", "", PanelAction::UpdatePartition, "alarm"),
    meta!("655", "Partition Disarmed", 1, "Partition disarmed", "", PanelAction::UpdatePartition, "disarmed"),
    meta!("656", "Exit Delay In Progress", 1, "Partition exit delay", "", PanelAction::UpdatePartition, "exitdelay"),
    meta!("657", "Entry Delay In Progress", 1, "Partition entry delay", "", PanelAction::UpdatePartition, "entrydelay"),
    meta!("658", "Keypad Lock-out", 1, "Keypad lockout, partition", "", PanelAction::UpdatePartition, "keypadlockout"),
    meta!("659", "Partition Failed To Arm", 1, "Partition failed to arm", "", PanelAction::UpdatePartition, "failedtoarm"),
    meta!("660", "PGM Output In Progress", 1, "PGM output, partition", "", PanelAction::UpdatePartition, "pgminprogress"),
    meta!("663", "Chime Enabled", 1, "Chime enabled, partition", "", PanelAction::UpdatePartition, "chimeenabled"),
    meta!("664", "Chime Disabled", 1, "Chime disabled, partition", "", PanelAction::UpdatePartition, "chimedisabled"),
    meta!("670", "Invalid Access Code", 1, "Invalid access code, partition", "", PanelAction::UpdatePartition, "invalidcode"),
    meta!("671", "Function Not Available", 1, "Function not available, partition", "", PanelAction::UpdatePartition, "notavailable"),
    meta!("672", "Failure To Arm", 1, "Failure to arm partition", "", PanelAction::UpdatePartition, "failuretoarm"),
    meta!("673", "Partition Busy", 1, "Partition busy", "", PanelAction::UpdatePartition, "busy"),
    meta!("674", "System Arming In Progress", 1, "Auto-arm in progress, partition", "", PanelAction::UpdatePartition, "arminginprogress"),
    meta!("700", "User Closing", 5, "Partition closed by user", "", PanelAction::UpdatePartition, "userclosing"),
    meta!("701", "Special Closing", 1, "Partition closed (special)", "", PanelAction::UpdatePartition, "specialclosing"),
    meta!("702", "Partial Closing", 1, "Partition closed (partial)", "", PanelAction::UpdatePartition, "partialclosing"),
    meta!("750", "User Opening", 5, "Partition opened by user", "", PanelAction::UpdatePartition, "useropening"),
    meta!("751", "Special Opening", 1, "Partition opened (special)", "", PanelAction::UpdatePartition, "specialopening"),
    meta!("800", "Panel Battery Trouble", 0, "Panel battery trouble", "", PanelAction::UpdateSystem, "batterytrouble"),
    meta!("801", "Panel Battery Trouble Restore", 0, "Panel battery restored", "", PanelAction::UpdateSystem, "batteryrestore"),
    meta!("802", "Panel AC Trouble", 0, "Panel AC trouble", "", PanelAction::UpdateSystem, "actrouble"),
    meta!("803", "Panel AC Restore", 0, "Panel AC restored", "", PanelAction::UpdateSystem, "acrestore"),
    meta!("806", "System Bell Trouble", 0, "Bell trouble", "", PanelAction::UpdateSystem, "belltrouble"),
    meta!("807", "System Bell Trouble Restore", 0, "Bell restored", "", PanelAction::UpdateSystem, "bellrestore"),
    meta!("814", "FTC Trouble", 0, "Failure to communicate", "", PanelAction::UpdateSystem, "ftctrouble"),
    meta!("816", "Buffer Near Full", 0, "Event buffer near full", "", PanelAction::UpdateSystem, "buffernearfull"),
    meta!("829", "General System Tamper", 0, "System tamper", "", PanelAction::UpdateSystem, "systemtamper"),
    meta!("830", "General System Tamper Restore", 0, "System tamper restored", "", PanelAction::UpdateSystem, "systemtamperrestore"),
    meta!("840", "Trouble LED On", 1, "Trouble LED on, partition", "", PanelAction::UpdateSystem, "troubleled"),
    meta!("841", "Trouble LED Off", 1, "Trouble LED off, partition", "", PanelAction::UpdateSystem, "troubleledoff"),
    meta!("849", "Verbose Trouble Status", 2, "Trouble bitfield", "", PanelAction::UpdateSystem, "troublestatus"),
    meta!("900", "Code Required", 6, "Access code required", "", PanelAction::CodeRequired, "coderequired"),
];

/// Client → bridge command table.
///
/// Every row acknowledges with `500` + its own code (command acknowledge),
/// matching what the panel itself would send.
static CLIENT_COMMANDS: &[ClientMeta] = &[
    meta!("000", "Poll", 0, "Poll", "", ClientAction::Forward, "500000"),
    meta!("001", "Status Report", 0, "Status report request", "", ClientAction::Forward, "500001"),
    meta!("005", "Network Login", 6, "Session login", "", ClientAction::CheckPassword, "500005"),
    meta!("008", "Dump Zone Timers", 0, "Zone timer dump request", "", ClientAction::Forward, "500008"),
    meta!("010", "Set Time And Date", 10, "Set panel clock", "", ClientAction::Forward, "500010"),
    meta!("020", "Command Output Control", 2, "Activate command output", "", ClientAction::Forward, "500020"),
    meta!("030", "Partition Arm Control - Away", 1, "Arm partition away", "", ClientAction::Forward, "500030"),
    meta!("031", "Partition Arm Control - Stay", 1, "Arm partition stay", "", ClientAction::Forward, "500031"),
    meta!("032", "Partition Arm Control - Zero Entry Delay", 1, "Arm partition zero-entry", "", ClientAction::Forward, "500032"),
    meta!("033", "Partition Arm Control - With Code", 7, "Arm partition with code", "", ClientAction::Forward, "500033"),
    meta!("040", "Partition Disarm Control", 7, "Disarm partition", "", ClientAction::Forward, "500040"),
    meta!("055", "Time Stamp Control", 1, "Time stamp on/off", "", ClientAction::Forward, "500055"),
    meta!("056", "Time Broadcast Control", 1, "Time broadcast on/off", "", ClientAction::Forward, "500056"),
    meta!("060", "Trigger Panic Alarm", 1, "Trigger panic alarm", "", ClientAction::Forward, "500060"),
    meta!("071", "Send Keystroke String", 6, "Keystroke string, partition", "", ClientAction::Forward, "500071"),
    meta!("200", "Send Code", 6, "Send access code", "", ClientAction::Forward, "500200"),
];

/// The built-in TPI catalogue.
///
/// Covers the command set the bridge dispatches on plus the common
/// informational codes. Callers with firmware-specific extensions can
/// implement [`Catalogue`] themselves and pass it to the bridge.
#[derive(Debug, Default, Clone, Copy)]
pub struct TpiCatalogue;

impl Catalogue for TpiCatalogue {
    fn panel_meta(&self, code: &str) -> Option<&PanelMeta> {
        PANEL_COMMANDS.iter().find(|meta| meta.code == code)
    }

    fn client_meta(&self, code: &str) -> Option<&ClientMeta> {
        CLIENT_COMMANDS.iter().find(|meta| meta.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_lookup() {
        let cat = TpiCatalogue;
        let meta = cat.panel_meta("609").unwrap();
        assert_eq!(meta.name, "Zone Open");
        assert_eq!(meta.action, PanelAction::UpdateZone);
        assert_eq!(meta.send, "open");
        assert!(cat.panel_meta("999").is_none());
    }

    #[test]
    fn test_client_lookup() {
        let cat = TpiCatalogue;
        let meta = cat.client_meta("005").unwrap();
        assert_eq!(meta.action, ClientAction::CheckPassword);
        assert_eq!(meta.send, "500005");
        assert!(cat.client_meta("609").is_none());
    }

    #[test]
    fn test_dispatch_codes_present() {
        let cat = TpiCatalogue;
        assert_eq!(cat.panel_meta("505").unwrap().action, PanelAction::LoginResponse);
        assert_eq!(cat.panel_meta("500").unwrap().action, PanelAction::CommandCompleted);
        assert_eq!(cat.panel_meta("502").unwrap().action, PanelAction::CommandError);
        assert_eq!(cat.panel_meta("900").unwrap().action, PanelAction::CodeRequired);
        assert_eq!(cat.panel_meta("700").unwrap().action, PanelAction::UpdatePartition);
        assert_eq!(cat.panel_meta("750").unwrap().action, PanelAction::UpdatePartition);
        assert_eq!(cat.panel_meta("849").unwrap().action, PanelAction::UpdateSystem);
    }

    #[test]
    fn test_client_acks_echo_their_code() {
        for meta in super::CLIENT_COMMANDS {
            assert_eq!(meta.send, format!("500{}", meta.code));
        }
    }

    #[test]
    fn test_no_duplicate_codes() {
        for table_len in [
            (1..PANEL_COMMANDS.len()).filter(|&i| {
                PANEL_COMMANDS[..i].iter().any(|m| m.code == PANEL_COMMANDS[i].code)
            }).count(),
            (1..CLIENT_COMMANDS.len()).filter(|&i| {
                CLIENT_COMMANDS[..i].iter().any(|m| m.code == CLIENT_COMMANDS[i].code)
            }).count(),
        ] {
            assert_eq!(table_len, 0);
        }
    }
}
