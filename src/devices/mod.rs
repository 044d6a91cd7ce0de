// MIT License - Copyright (c) 2026 Peter Wright

pub mod partition;
pub mod system;
pub mod user;
pub mod zone;

pub use partition::{ArmMode, OpeningClosing, PartitionState};
pub use system::TroubleFlags;
pub use user::UserState;
pub use zone::ZoneState;
