//! Runtime configuration record.

use core::{any::Any, fmt, time::Duration};

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::OsalError;

/// Default number of task slots.
pub const DEFAULT_MAX_TASKS: usize = 8;

/// Default upper bound for a single slice of a checkpoint delay.
pub const DEFAULT_CHECKPOINT_SLICE: Duration = Duration::from_millis(10);

/// Printf-style log sink supplied by the platform.
pub type LogFn = fn(log::Level, fmt::Arguments<'_>);

/// Opaque platform context, passed through to lower layers untouched.
pub type PlatformContext = Arc<dyn Any + Send + Sync>;

/// Identity of the RTOS flavour the application was written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Backend {
  Ucos3,
  FreeRtos,
  #[default]
  Linux,
}

impl fmt::Display for Backend {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Ucos3 => f.write_str("ucos3"),
      Self::FreeRtos => f.write_str("freertos"),
      Self::Linux => f.write_str("linux"),
    }
  }
}

/// Configuration handed to [`Osal::init`](crate::Osal::init).
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Config {
  pub backend: Backend,
  /// Capacity of the task slot table.
  pub max_tasks: usize,
  /// Longest uninterrupted sleep inside [`CurrentTask::delay`](crate::CurrentTask::delay).
  #[cfg_attr(feature = "serde", serde(rename = "checkpoint_slice_ms", with = "millis"))]
  pub checkpoint_slice: Duration,
  /// Non-zero stack sizes below this are raised to it.
  pub min_stack_size: usize,
  #[cfg_attr(feature = "serde", serde(skip))]
  pub log: Option<LogFn>,
  #[cfg_attr(feature = "serde", serde(skip))]
  pub platform_ctx: Option<PlatformContext>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      backend: Backend::default(),
      max_tasks: DEFAULT_MAX_TASKS,
      checkpoint_slice: DEFAULT_CHECKPOINT_SLICE,
      min_stack_size: crate::task::MINIMAL_STACK_SIZE,
      log: None,
      platform_ctx: None,
    }
  }
}

impl fmt::Debug for Config {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Config")
      .field("backend", &self.backend)
      .field("max_tasks", &self.max_tasks)
      .field("checkpoint_slice", &self.checkpoint_slice)
      .field("min_stack_size", &self.min_stack_size)
      .field("log", &self.log.is_some())
      .field("platform_ctx", &self.platform_ctx.is_some())
      .finish()
  }
}

impl Config {
  pub fn new(backend: Backend) -> Self {
    Self { backend, ..Self::default() }
  }

  pub fn max_tasks(mut self, max_tasks: usize) -> Self {
    self.max_tasks = max_tasks;
    self
  }

  pub fn checkpoint_slice(mut self, slice: Duration) -> Self {
    self.checkpoint_slice = slice;
    self
  }

  pub fn min_stack_size(mut self, size: usize) -> Self {
    self.min_stack_size = size;
    self
  }

  /// Route diagnostics to the given sink instead of the `log` crate facade.
  pub fn log(mut self, log: LogFn) -> Self {
    self.log = Some(log);
    self
  }

  pub fn platform_ctx(mut self, ctx: PlatformContext) -> Self {
    self.platform_ctx = Some(ctx);
    self
  }

  /// Parse the plain-data part of a configuration from TOML.
  ///
  /// ```
  /// use osal_rust::{Backend, Config};
  ///
  /// let config = Config::from_toml_str("backend = \"freertos\"\nmax_tasks = 4\n").unwrap();
  /// assert_eq!(config.backend, Backend::FreeRtos);
  /// assert_eq!(config.max_tasks, 4);
  /// ```
  #[cfg(feature = "serde")]
  pub fn from_toml_str(s: &str) -> Result<Self, OsalError> {
    toml::from_str(s).map_err(|err| {
      log::error!(target: "osal", "[OSAL] bad config: {err}");
      OsalError::Config
    })
  }

  pub(crate) fn validate(&self) -> Result<(), OsalError> {
    if self.max_tasks == 0 || self.checkpoint_slice.is_zero() {
      return Err(OsalError::InvalidArgument)
    }

    Ok(())
  }
}

#[cfg(feature = "serde")]
mod millis {
  use core::time::Duration;

  use serde::{Deserialize, Deserializer};

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
  }
}
