use thiserror::Error;

/// Basic error type for the library.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum OsalError {
  /// Missing entry, unknown or already deleted handle, malformed attributes.
  #[error("invalid argument")]
  InvalidArgument,
  /// The task pool is full or the native thread could not be started.
  #[error("resource exhausted")]
  ResourceExhausted,
  /// The host refused every scheduling class for the thread.
  #[error("scheduling denied by host")]
  SchedulingDenied,
  /// The runtime was used before `Osal::init` or after `Osal::deinit`.
  #[error("runtime not initialized")]
  NotInitialized,
  /// Timeout during a blocking operation.
  #[error("operation timed out")]
  Timeout,
  /// The calling task was asked to stop at a checkpoint.
  #[error("task stop requested")]
  Stopped,
  #[error("invalid configuration")]
  Config,
}

/// Returned by a checkpoint when the task has been asked to stop.
///
/// The entry function is expected to propagate it with `?`, which unwinds
/// the task back into its trampoline.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("task stop requested")]
pub struct Stopped;

impl From<Stopped> for OsalError {
  fn from(_: Stopped) -> Self {
    OsalError::Stopped
  }
}

/// Result of a task entry function.
pub type TaskResult = Result<(), Stopped>;
