use core::fmt;

use super::{HostPriority, TaskHandle, TaskPriority, TaskState};

/// Snapshot of a single task, see [`Osal::system_state`](crate::Osal::system_state).
#[derive(Debug)]
pub struct TaskStatus {
  pub(crate) handle: TaskHandle,
  pub(crate) state: TaskState,
  pub(crate) priority: TaskPriority,
}

impl TaskStatus {
  pub(crate) fn new(handle: TaskHandle) -> Self {
    let state = handle.state();
    let priority = handle.priority();
    Self { handle, state, priority }
  }

  /// Get the task.
  #[inline]
  pub fn task(&self) -> &TaskHandle {
    &self.handle
  }

  #[inline]
  pub fn name(&self) -> &str {
    self.handle.name().unwrap_or_default()
  }

  #[inline]
  pub fn slot(&self) -> usize {
    self.handle.slot()
  }

  #[inline]
  pub fn state(&self) -> TaskState {
    self.state
  }

  pub fn priority(&self) -> TaskPriority {
    self.priority
  }

  /// Host priority the requested priority maps to, if one was requested.
  pub fn host_priority(&self) -> Option<HostPriority> {
    (!self.priority.is_unset()).then(|| self.priority.to_host())
  }
}

#[derive(Debug)]
pub struct SystemState {
  pub(crate) tasks: Vec<TaskStatus>,
  pub(crate) capacity: usize,
}

impl SystemState {
  pub fn tasks(&self) -> &[TaskStatus] {
    &self.tasks
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }
}

impl fmt::Display for SystemState {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    writeln!(f, "OSAL tasks ({}/{} slots)", self.tasks.len(), self.capacity)?;

    writeln!(
      f,
      "{slot: <4} | {name: <15} | {state: <7} | {priority: <8} | {host: <4} | {stack: >10}",
      slot = "Slot",
      name = "Name",
      state = "State",
      priority = "Priority",
      host = "Host",
      stack = "Stack",
    )?;

    for task in &self.tasks {
      writeln!(
        f,
        "{slot: <4} | {name: <15} | {state: <7} | {priority: <8} | {host: <4} | {stack: >10}",
        slot = task.slot(),
        name = task.name(),
        state = task.state(),
        priority = task.priority(),
        host = task.host_priority().map(|p| p.to_string()).unwrap_or_else(|| "-".to_owned()),
        stack = match task.handle.stack_size() {
          0 => "default".to_owned(),
          n => n.to_string(),
        },
      )?;
    }

    Ok(())
  }
}
