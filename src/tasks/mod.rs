//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a cache region.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired local entries at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
