//! Worker tasks that back the runtime orchestration.
//!
//! The scheduler worker owns the countdown timer and forced transitions;
//! the announcer it holds spawns one-shot broadcast tasks ahead of the next
//! transition.

mod announcer;
mod scheduler;

pub use announcer::Announcer;
pub use scheduler::{Command, SchedulerWorker};
