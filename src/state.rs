// MIT License - Copyright (c) 2026 Peter Wright
// Alarm state store: merge partial updates, decide what to emit

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::catalogue::PanelMeta;
use crate::config::BridgeConfig;
use crate::devices::{ArmMode, OpeningClosing, PartitionState, TroubleFlags, UserState, ZoneState};
use crate::event::{
    AlarmSnapshot, BridgeEvent, EventSender, PartitionUpdateEvent, SystemUpdateEvent,
    ZoneUpdateEvent,
};

/// Incrementally-updated store of zone/partition/user state.
///
/// Each update upserts the target record and then decides what to publish:
/// in atomic mode a discrete typed event (unless this is a suppressed initial
/// observation), otherwise one aggregate `Data` snapshot. Ids beyond the
/// configured maxima are ignored outright — no store mutation, no event.
pub struct AlarmStateStore {
    zones: BTreeMap<u16, ZoneState>,
    partitions: BTreeMap<u16, PartitionState>,
    users: BTreeMap<u16, UserState>,
    max_zones: u16,
    max_partitions: u16,
    atomic_events: bool,
    suppress_initial_update: bool,
    zone_labels: HashMap<u16, String>,
    user_labels: HashMap<u16, String>,
    event_tx: EventSender,
}

impl AlarmStateStore {
    pub fn new(config: &BridgeConfig, event_tx: EventSender) -> Self {
        Self {
            zones: BTreeMap::new(),
            partitions: BTreeMap::new(),
            users: BTreeMap::new(),
            max_zones: config.max_zones,
            max_partitions: config.max_partitions,
            atomic_events: config.atomic_events,
            suppress_initial_update: config.suppress_initial_update,
            zone_labels: config.zone_labels.clone(),
            user_labels: config.user_labels.clone(),
            event_tx,
        }
    }

    /// Apply a zone-update frame. Zone id is the 3 digits at offset 3.
    pub fn update_zone(&mut self, meta: &PanelMeta, frame: &str) {
        let Some(id) = parse_id(frame, 3, 6) else {
            debug!("Zone frame too short to carry an id: {frame}");
            return;
        };
        if id > self.max_zones {
            return;
        }

        let initial = !self.zones.contains_key(&id);
        self.zones.insert(id, zone_record(meta, frame));

        if self.atomic_events {
            if initial && self.suppress_initial_update {
                return;
            }
            let _ = self.event_tx.send(BridgeEvent::ZoneUpdate(ZoneUpdateEvent {
                zone: id,
                code: frame[..3].to_string(),
                status: meta.send.to_string(),
                zone_label: self.zone_label(id),
            }));
        } else {
            self.emit_snapshot();
        }
    }

    /// Apply a partition-update frame. Partition id is the digit at offset 3.
    ///
    /// When an atomic user-closing/user-opening event (700/750) goes out, the
    /// user store is fed as a side effect and its event fires first. A
    /// suppressed or non-atomic partition update leaves the user store alone.
    pub fn update_partition(&mut self, meta: &PanelMeta, frame: &str) {
        let Some(id) = parse_id(frame, 3, 4) else {
            debug!("Partition frame too short to carry an id: {frame}");
            return;
        };
        if id > self.max_partitions {
            return;
        }

        let initial = !self.partitions.contains_key(&id);
        self.partitions.insert(id, partition_record(meta, frame));

        if !self.atomic_events {
            self.emit_snapshot();
            return;
        }
        if initial && self.suppress_initial_update {
            return;
        }

        let code = &frame[..3];
        let mut evt = PartitionUpdateEvent {
            partition: id,
            code: code.to_string(),
            status: meta.send.to_string(),
            arm_mode: None,
            arm_type: None,
            user_id: None,
            user_label: None,
        };
        match code {
            "652" => {
                evt.arm_mode =
                    parse_id(frame, 4, 5).and_then(|digit| ArmMode::from_digit(digit as u8));
            }
            "700" | "750" => {
                evt.arm_type = Some(if code == "700" {
                    OpeningClosing::UserClosing
                } else {
                    OpeningClosing::UserOpening
                });
                evt.user_id = parse_id(frame, 4, 8);
                evt.user_label = evt
                    .user_id
                    .and_then(|user| self.user_labels.get(&user).cloned());
                // The user store rides along, its event ahead of ours
                self.update_partition_user(meta, frame);
            }
            "701" => evt.arm_type = Some(OpeningClosing::SpecialClosing),
            "751" => evt.arm_type = Some(OpeningClosing::SpecialOpening),
            _ => {}
        }

        let _ = self.event_tx.send(BridgeEvent::PartitionUpdate(evt));
    }

    /// Apply a user open/close frame: partition digit at offset 3, 4-digit
    /// user id at offset 4.
    ///
    /// The initial-suppression flag is not consulted here; only the first
    /// observation of the user id (plus atomic mode) gates emission.
    pub fn update_partition_user(&mut self, meta: &PanelMeta, frame: &str) {
        let Some(partition) = parse_id(frame, 3, 4) else {
            return;
        };
        let Some(user) = parse_id(frame, 4, 8) else {
            return;
        };
        if partition > self.max_partitions {
            return;
        }

        let initial = !self.users.contains_key(&user);
        let entry = user_record(meta, frame);
        self.users.insert(user, entry.clone());

        if self.atomic_events {
            if initial {
                return;
            }
            let _ = self
                .event_tx
                .send(BridgeEvent::PartitionUserUpdate(user, entry));
        } else {
            self.emit_snapshot();
        }
    }

    /// Apply a system-status frame. Nothing is persisted; each frame
    /// recomputes and emits a fresh structure.
    pub fn update_system(&mut self, meta: &PanelMeta, frame: &str) {
        let code = &frame[..3];
        let mut evt = SystemUpdateEvent {
            code: code.to_string(),
            status: meta.send.to_string(),
            partition: None,
            trouble: None,
        };

        match code {
            "840" | "841" => {
                if let Some(partition) = parse_id(frame, 3, 4) {
                    if partition > self.max_partitions {
                        // Suppressed entirely, even in non-atomic mode.
                        return;
                    }
                    evt.partition = Some(partition);
                }
            }
            "849" => {
                evt.trouble = frame.get(3..5).and_then(TroubleFlags::from_hex);
            }
            _ => {}
        }

        if self.atomic_events {
            let _ = self.event_tx.send(BridgeEvent::SystemUpdate(evt));
        } else {
            self.emit_snapshot();
        }
    }

    /// The full current aggregate.
    pub fn snapshot(&self) -> AlarmSnapshot {
        AlarmSnapshot {
            zones: self.zones.clone(),
            partitions: self.partitions.clone(),
            users: self.users.clone(),
        }
    }

    /// Publish the current aggregate as a `Data` event.
    pub fn emit_snapshot(&self) {
        let _ = self.event_tx.send(BridgeEvent::Data(self.snapshot()));
    }

    fn zone_label(&self, id: u16) -> String {
        self.zone_labels
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Zone-{id}"))
    }
}

macro_rules! record_fn {
    ($fn_name:ident, $state:ident) => {
        fn $fn_name(meta: &PanelMeta, frame: &str) -> $state {
            $state {
                status: meta.send.to_string(),
                name: meta.name.to_string(),
                last_frame: frame.to_string(),
            }
        }
    };
}

record_fn!(zone_record, ZoneState);
record_fn!(partition_record, PartitionState);
record_fn!(user_record, UserState);

fn parse_id(frame: &str, start: usize, end: usize) -> Option<u16> {
    frame.get(start..end)?.parse().ok()
}
