use core::fmt;

/// Coarse status of a [`Task`](crate::Task).
///
/// This is a snapshot; the task may change state right after it was taken.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
  /// The task has finished, was asked to stop, or was deleted.
  Invalid = 0,
  /// The task is running.
  Running = 2,
  /// A suspend request is outstanding.
  Waiting = 3,
}

impl fmt::Display for TaskState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(match self {
      Self::Invalid => "Invalid",
      Self::Running => "Running",
      Self::Waiting => "Waiting",
    })
  }
}
