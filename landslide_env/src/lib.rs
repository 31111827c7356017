//! Landslide Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam between the landslide controller
//! and whatever drives it. The controller never reads wall-clock time and
//! never owns a global simulator; it is handed a [`Scheduler`] instead.
//!
//! # Core Concept: Virtual Time
//!
//! All time is virtual and measured as a [`std::time::Duration`] since the
//! start of the simulation. Actions are queued as [`ScheduledEvent`] values
//! and delivered in `(fire_time, seq)` order, so two events scheduled for
//! the same instant fire in the order they were inserted.
//!
//! # Example
//!
//! ```ignore
//! use landslide_env::Scheduler;
//! use std::time::Duration;
//!
//! fn drive<S: Scheduler>(clock: &mut S, until: Duration) {
//!     clock.run(until, |_clock, event| {
//!         println!("t={:?} {:?}", event.fire_time, event.seq);
//!     });
//! }
//! ```

mod scheduler;
mod types;
mod error;

pub use scheduler::Scheduler;
pub use types::{virtual_time, EntityId, ScheduledEvent};
pub use error::EnvError;
