use core::{fmt, time::Duration};

use std::sync::Arc;

use crate::{
  sched::{self, SchedOutcome},
  OsalError,
};

use super::{control_block::ControlBlock, table::TaskTable, TaskPriority, TaskState};

/// A handle for managing a task.
///
/// See [`Task`](crate::task::Task) for the owned version returned on creation.
/// Handles are cheap to clone; all clones refer to the same task, and every
/// operation on a deleted task fails with [`OsalError::InvalidArgument`].
#[derive(Clone)]
pub struct TaskHandle {
  tcb: Arc<ControlBlock>,
  table: Arc<TaskTable>,
}

impl fmt::Debug for TaskHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskHandle")
      .field("slot", &self.tcb.slot())
      .field("name", self.tcb.name())
      .finish()
  }
}

impl PartialEq for TaskHandle {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.tcb, &other.tcb)
  }
}

impl Eq for TaskHandle {}

impl TaskHandle {
  pub(crate) fn new(tcb: Arc<ControlBlock>, table: Arc<TaskTable>) -> Self {
    Self { tcb, table }
  }

  fn ensure_used(&self) -> Result<(), OsalError> {
    if self.tcb.is_used() {
      Ok(())
    } else {
      Err(OsalError::InvalidArgument)
    }
  }

  /// Get the name of this task, `None` if it was created without one.
  pub fn name(&self) -> Option<&str> {
    Some(self.tcb.name().as_str()).filter(|name| !name.is_empty())
  }

  /// Index of the slot this task occupies.
  #[inline]
  pub fn slot(&self) -> usize {
    self.tcb.slot()
  }

  /// Last priority successfully applied or requested at creation.
  #[inline]
  pub fn priority(&self) -> TaskPriority {
    self.tcb.priority()
  }

  /// Stack size the thread was started with, `0` for the host default.
  #[inline]
  pub fn stack_size(&self) -> usize {
    self.tcb.stack_size()
  }

  /// Get the current state of the task.
  #[inline]
  pub fn state(&self) -> TaskState {
    self.tcb.state()
  }

  /// Ask the task to suspend at its next checkpoint.
  ///
  /// Succeeds without effect if the task has already finished.
  pub fn suspend(&self) -> Result<(), OsalError> {
    self.ensure_used()?;
    self.tcb.request_suspend();
    Ok(())
  }

  /// Resume a suspended task.
  pub fn resume(&self) -> Result<(), OsalError> {
    self.ensure_used()?;
    self.tcb.request_resume();
    Ok(())
  }

  /// Re-apply the host scheduling class with a new priority.
  ///
  /// The stored priority is only updated if the host accepted either the
  /// real-time class or the fallback.
  pub fn change_priority(&self, priority: TaskPriority) -> Result<SchedOutcome, OsalError> {
    // The lock keeps the thread from finishing, and so from being joined.
    let mut flags = self.tcb.lock();
    if !flags.used || !flags.running {
      return Err(OsalError::InvalidArgument)
    }

    let native = flags.native.ok_or(OsalError::InvalidArgument)?;
    let applied = sched::apply(native, priority);
    flags.priority_applied = true;
    if !matches!(applied, sched::Applied::Denied { .. }) {
      self.tcb.set_priority(priority);
    }
    drop(flags);

    applied.report(&self.table.logger)
  }

  /// Stop the task and release its slot.
  ///
  /// Blocks until the task reaches a checkpoint and its thread has been
  /// joined. A task that never calls a checkpoint blocks the caller forever;
  /// see [`delete_timeout`](Self::delete_timeout).
  pub fn delete(&self) -> Result<(), OsalError> {
    self.delete_inner(None)
  }

  /// Like [`delete`](Self::delete), but gives up after `timeout`.
  ///
  /// On [`OsalError::Timeout`] the stop request stays pending and the task
  /// keeps its slot; deleting it again is allowed.
  pub fn delete_timeout(&self, timeout: Duration) -> Result<(), OsalError> {
    self.delete_inner(Some(timeout))
  }

  fn delete_inner(&self, timeout: Option<Duration>) -> Result<(), OsalError> {
    self.ensure_used()?;

    // A task joining its own thread would never return.
    if self.tcb.is_current_thread() {
      return Err(OsalError::InvalidArgument)
    }

    self.tcb.request_stop();

    if !self.tcb.wait_finished(timeout) {
      osal_log!(self.table.logger, Warn, "[OSAL][Task] '{}' did not stop in time", self.tcb.name());
      return Err(OsalError::Timeout)
    }

    // Concurrent deletes race for the join handle; only the winner joins.
    let thread = self.table.take_thread(&self.tcb).ok_or(OsalError::InvalidArgument)?;
    if thread.join().is_err() {
      osal_log!(self.table.logger, Error, "[OSAL][Task] join '{}' failed: task panicked", self.tcb.name());
    }

    self.table.reclaim(&self.tcb);
    osal_log!(self.table.logger, Debug, "[OSAL][Task] '{}' deleted, slot {} free", self.tcb.name(), self.tcb.slot());
    Ok(())
  }
}
