// MIT License - Copyright (c) 2026 Peter Wright

use std::collections::BTreeMap;

use crate::devices::{ArmMode, OpeningClosing, PartitionState, TroubleFlags, UserState, ZoneState};

/// All events emitted by the bridge.
///
/// Subscribe via `bridge.subscribe()` to receive a
/// `tokio::sync::broadcast::Receiver<BridgeEvent>`. Each receiver is an
/// independently cancellable subscription handle; dropping it unsubscribes.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// The panel connection ended
    ConnectionEnded,
    /// The panel is asking for a user access code
    CodeRequired(CodeRequiredEvent),
    /// Discrete zone status change (atomic mode)
    ZoneUpdate(ZoneUpdateEvent),
    /// Discrete partition status change (atomic mode)
    PartitionUpdate(PartitionUpdateEvent),
    /// Discrete user open/close record (atomic mode).
    ///
    /// Positional pair rather than a named struct, unlike its sibling
    /// events; downstream consumers depend on this shape.
    PartitionUserUpdate(u16, UserState),
    /// System-wide status change (atomic mode)
    SystemUpdate(SystemUpdateEvent),
    /// Full aggregate snapshot (non-atomic mode, or on request)
    Data(AlarmSnapshot),
}

#[derive(Debug, Clone)]
pub struct CodeRequiredEvent {
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct ZoneUpdateEvent {
    pub zone: u16,
    /// 3-character command code that produced the update
    pub code: String,
    /// Status label from the catalogue row
    pub status: String,
    /// Configured label, or a synthesized `Zone-<id>`
    pub zone_label: String,
}

#[derive(Debug, Clone)]
pub struct PartitionUpdateEvent {
    pub partition: u16,
    pub code: String,
    pub status: String,
    /// Arming mode, present for partition-armed frames (652)
    pub arm_mode: Option<ArmMode>,
    /// Opening/closing actor, present for 700/701/750/751 frames
    pub arm_type: Option<OpeningClosing>,
    /// User id, present for user-closing/user-opening frames (700/750)
    pub user_id: Option<u16>,
    /// Configured user label, when one exists for `user_id`
    pub user_label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SystemUpdateEvent {
    pub code: String,
    pub status: String,
    /// Partition id for trouble-LED frames (840/841)
    pub partition: Option<u16>,
    /// Decoded trouble bitfield for verbose trouble status frames (849)
    pub trouble: Option<TroubleFlags>,
}

/// Full current zone/partition/user state, emitted as one `Data` event.
#[derive(Debug, Clone, Default)]
pub struct AlarmSnapshot {
    pub zones: BTreeMap<u16, ZoneState>,
    pub partitions: BTreeMap<u16, PartitionState>,
    pub users: BTreeMap<u16, UserState>,
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<BridgeEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<BridgeEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
