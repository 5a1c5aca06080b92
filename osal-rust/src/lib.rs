//! # OSAL tasks for hosted targets
//!
//! Runs application code written against an RTOS task API (fixed-priority
//! tasks, suspend/resume, explicit stack and priority attributes) on top of
//! native POSIX threads.
//!
//! Every task is one native thread. Because a thread cannot safely be frozen
//! from the outside, suspend and delete are cooperative: they take effect when
//! the task reaches a checkpoint, i.e. calls [`CurrentTask::delay`],
//! [`CurrentTask::delay_ms`] or [`CurrentTask::yield_now`]. A checkpoint
//! returns [`Stopped`] once the task was asked to exit.
//!
//! Priorities 0–255 are mapped onto `SCHED_FIFO` 1–99. Without the privilege
//! for real-time scheduling the task runs in the default class instead and
//! a warning is logged.
//!
//! # Samples
//!
//! Spawning a new task
//!
//! ```rust
//! # use osal_rust::*;
//! # use core::time::Duration;
//! let osal = Osal::init(Config::new(Backend::Linux)).unwrap();
//!
//! let task = osal.task().name("hello").priority(TaskPriority::new(2)).start(|task| {
//!   loop {
//!     println!("Hello world!");
//!     task.delay(Duration::from_millis(500))?;
//!   }
//! }).unwrap();
//!
//! task.suspend().unwrap();
//! assert_eq!(task.state(), TaskState::Waiting);
//! task.resume().unwrap();
//!
//! task.delete().unwrap();
//! assert_eq!(osal.task_count(), 0);
//! ```
//!
//! Listing tasks
//!
//! ```rust
//! # use osal_rust::*;
//! let osal = Osal::init(Config::default()).unwrap();
//! osal.for_each(|task| println!("{:?}: {}", task.name(), task.state()));
//! println!("{}", osal.system_state());
//! ```

#[macro_use]
mod logging;

mod config;
mod delay;
mod error;
mod runtime;
pub mod sched;
pub mod task;

pub use crate::config::{Backend, Config, LogFn, PlatformContext, DEFAULT_CHECKPOINT_SLICE, DEFAULT_MAX_TASKS};
pub use crate::delay::{TaskDelay, TaskDelayPeriodic};
pub use crate::error::{OsalError, Stopped, TaskResult};
pub use crate::runtime::Osal;
pub use crate::sched::SchedOutcome;
pub use crate::task::*;
