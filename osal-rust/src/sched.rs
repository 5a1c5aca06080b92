//! Host scheduling-class control for task threads.
//!
//! Requested priorities are applied as `SCHED_FIFO`. Without the privilege
//! for real-time scheduling (usually `CAP_SYS_NICE`) the thread is moved to
//! `SCHED_OTHER` instead and the degradation is logged, not reported as a
//! failure.

use std::thread::JoinHandle;

use crate::{
  logging::Logger,
  task::{HostPriority, TaskPriority},
  OsalError,
};

/// Scheduling class a thread ended up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedOutcome {
  /// Real-time, run-to-completion scheduling at the mapped priority.
  RealTime(HostPriority),
  /// Default time-shared scheduling at default priority.
  Degraded,
}

/// Identifier of a task's native thread.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct NativeThread(libc::pthread_t);

// SAFETY: a `pthread_t` is an opaque identifier only interpreted by the pthread library.
#[cfg(unix)]
unsafe impl Send for NativeThread {}
#[cfg(unix)]
unsafe impl Sync for NativeThread {}

#[cfg(not(unix))]
#[derive(Debug, Clone, Copy)]
pub(crate) struct NativeThread;

#[cfg(unix)]
pub(crate) fn native_of<T>(thread: &JoinHandle<T>) -> NativeThread {
  use std::os::unix::thread::JoinHandleExt;

  NativeThread(thread.as_pthread_t() as libc::pthread_t)
}

#[cfg(not(unix))]
pub(crate) fn native_of<T>(_thread: &JoinHandle<T>) -> NativeThread {
  NativeThread
}

#[cfg(unix)]
pub(crate) fn current() -> NativeThread {
  NativeThread(unsafe { libc::pthread_self() })
}

#[cfg(not(unix))]
pub(crate) fn current() -> NativeThread {
  NativeThread
}

/// What the host did with a scheduling request, not yet logged.
///
/// Produced under the task lock by [`apply`], reported once the lock is
/// released, so a log sink may query the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub(crate) enum Applied {
  RealTime(HostPriority),
  Degraded { rc: i32 },
  Denied { rc: i32, fallback_rc: i32 },
  #[cfg_attr(unix, allow(dead_code))]
  Unsupported(TaskPriority),
}

impl Applied {
  pub fn report(self, logger: &Logger) -> Result<SchedOutcome, OsalError> {
    match self {
      Self::RealTime(host) => {
        osal_log!(logger, Debug, "[OSAL][Task] SCHED_FIFO prio={} ok", host);
        Ok(SchedOutcome::RealTime(host))
      },
      Self::Degraded { rc } => {
        osal_log!(logger, Warn, "[OSAL][Task] fallback SCHED_OTHER (rc={}, no CAP_SYS_NICE?)", rc);
        Ok(SchedOutcome::Degraded)
      },
      Self::Denied { rc, fallback_rc } => {
        osal_log!(logger, Error, "[OSAL][Task] set prio failed (rc={}, fallback rc={})", rc, fallback_rc);
        Err(OsalError::SchedulingDenied)
      },
      Self::Unsupported(priority) => {
        osal_log!(logger, Warn, "[OSAL][Task] no real-time scheduling on this host, prio {} ignored", priority);
        Ok(SchedOutcome::Degraded)
      },
    }
  }
}

/// Apply `priority` to `thread`.
///
/// `thread` must not have been joined yet.
#[cfg(unix)]
pub(crate) fn apply(thread: NativeThread, priority: TaskPriority) -> Applied {
  let host = priority.to_host();

  let rc = set_sched_param(thread, libc::SCHED_FIFO, host.get());
  if rc == 0 {
    return Applied::RealTime(host)
  }

  let fallback_rc = set_sched_param(thread, libc::SCHED_OTHER, 0);
  if fallback_rc != 0 {
    return Applied::Denied { rc, fallback_rc }
  }

  Applied::Degraded { rc }
}

#[cfg(not(unix))]
pub(crate) fn apply(_thread: NativeThread, priority: TaskPriority) -> Applied {
  Applied::Unsupported(priority)
}

#[cfg(unix)]
fn set_sched_param(NativeThread(thread): NativeThread, policy: libc::c_int, priority: libc::c_int) -> libc::c_int {
  // SAFETY: `sched_param` is plain old data; zero is valid for every field.
  let mut param: libc::sched_param = unsafe { core::mem::zeroed() };
  param.sched_priority = priority;

  // SAFETY: callers guarantee `thread` still refers to an unjoined thread.
  unsafe { libc::pthread_setschedparam(thread, policy, &param) }
}
