use std::thread;

use crate::{CurrentTask, Osal, OsalError, TaskResult};

use super::{trampoline, Task, TaskHandle, TaskName, TaskPriority};

/// Helper for spawning a new task, created with [`Osal::task`].
pub struct TaskBuilder<'a> {
  osal: &'a Osal,
  name: &'a str,
  stack_size: usize,
  priority: TaskPriority,
}

impl<'a> TaskBuilder<'a> {
  pub(crate) const fn new(osal: &'a Osal) -> Self {
    TaskBuilder {
      osal,
      name: "",
      stack_size: 0,
      priority: TaskPriority::UNSET,
    }
  }

  /// Set the task name. Names longer than the task name width are truncated.
  pub const fn name(mut self, name: &'a str) -> Self {
    self.name = name;
    self
  }

  /// Set the stack size in bytes.
  ///
  /// `0` keeps the host default; anything else below the configured minimum
  /// is raised to that minimum.
  pub const fn stack_size(mut self, stack_size: usize) -> Self {
    self.stack_size = stack_size;
    self
  }

  /// Set the task priority.
  pub const fn priority(mut self, priority: TaskPriority) -> Self {
    self.priority = priority;
    self
  }

  /// Create and start the [`Task`].
  ///
  /// `f` runs exactly once on a new thread. On failure no task is left
  /// behind and the slot is free again.
  pub fn start<F>(self, f: F) -> Result<Task, OsalError>
  where
    F: FnOnce(&mut CurrentTask) -> TaskResult + Send + 'static,
  {
    let table = self.osal.table()?;

    // The host thread API cannot carry interior NULs in a name.
    if self.name.contains('\0') {
      return Err(OsalError::InvalidArgument)
    }

    let stack_size = match self.stack_size {
      0 => 0,
      n => n.max(table.min_stack_size),
    };

    let tcb = table.allocate(TaskName::new(self.name), self.priority, stack_size)?;

    let mut builder = thread::Builder::new();
    if !tcb.name().is_empty() {
      builder = builder.name(tcb.name().as_str().to_owned());
    }
    if stack_size != 0 {
      builder = builder.stack_size(stack_size);
    }

    let entry: trampoline::Entry = Box::new(f);
    let spawned = {
      let tcb = tcb.clone();
      let table = table.clone();
      builder.spawn(move || trampoline::run(tcb, table, entry))
    };

    match spawned {
      Ok(thread) => {
        table.attach(&tcb, thread);
        osal_log!(
          table.logger, Info,
          "[OSAL][Task] created '{}' slot={} prio={} stack={}",
          tcb.name(), tcb.slot(), self.priority, stack_size,
        );
        Ok(Task { handle: TaskHandle::new(tcb, table.clone()) })
      },
      Err(err) => {
        osal_log!(table.logger, Error, "[OSAL][Task] thread spawn failed: {}", err);
        tcb.mark_finished();
        table.reclaim(&tcb);
        Err(OsalError::ResourceExhausted)
      },
    }
  }
}
