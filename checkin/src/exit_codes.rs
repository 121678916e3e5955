//! Stable exit codes for the `checkin` CLI.

/// Command succeeded and the flow is still in progress (or was just moved).
pub const OK: i32 = 0;
/// Command failed: invalid step, unreadable store or config, or a rejected operation.
pub const INVALID: i32 = 1;
/// The check-in has been completed.
pub const COMPLETE: i32 = 2;
/// The user backed out of the flow without completing it.
pub const EXITED: i32 = 3;
/// `checkin due` found the scheduled check-in is not open yet.
pub const NOT_DUE: i32 = 4;
