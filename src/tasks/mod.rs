//! Background Tasks Module
//!
//! Contains background tasks owned by a cache instance.
//!
//! # Tasks
//! - Purge: Removes expired cache entries at a configured interval

mod purge;

pub(crate) use purge::spawn_purge_task;
