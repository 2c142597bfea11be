//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache sweep: purges expired inspection results at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
