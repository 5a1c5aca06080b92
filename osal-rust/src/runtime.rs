use core::sync::atomic::{AtomicBool, Ordering};

use std::sync::Arc;

use crate::{
  config::{Backend, Config, PlatformContext},
  task::{table::TaskTable, SystemState, TaskBuilder, TaskHandle, TaskStatus},
  OsalError,
};

/// Runtime state of one task layer instance.
///
/// Owns the task slot table. Several instances may coexist in one process;
/// each has its own pool and configuration.
pub struct Osal {
  config: Config,
  table: Arc<TaskTable>,
  initialized: AtomicBool,
}

impl Osal {
  /// Initialize a runtime from `config`.
  pub fn init(config: Config) -> Result<Self, OsalError> {
    config.validate()?;

    let table = Arc::new(TaskTable::new(&config));
    osal_log!(table.logger, Info, "[OSAL] Init backend={} max_tasks={}", config.backend, config.max_tasks);

    Ok(Self {
      config,
      table,
      initialized: AtomicBool::new(true),
    })
  }

  /// Refuse further task creation. Running tasks are left untouched.
  pub fn deinit(&self) {
    if self.initialized.swap(false, Ordering::AcqRel) {
      osal_log!(self.table.logger, Info, "[OSAL] Deinit backend={}", self.config.backend);
    }
  }

  #[inline]
  pub fn is_initialized(&self) -> bool {
    self.initialized.load(Ordering::Acquire)
  }

  #[inline]
  pub fn backend(&self) -> Backend {
    self.config.backend
  }

  #[inline]
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// The platform context given at init, untouched.
  #[inline]
  pub fn platform_ctx(&self) -> Option<&PlatformContext> {
    self.config.platform_ctx.as_ref()
  }

  /// Prepare a builder for a new task.
  pub const fn task(&self) -> TaskBuilder<'_> {
    TaskBuilder::new(self)
  }

  pub(crate) fn table(&self) -> Result<&Arc<TaskTable>, OsalError> {
    if !self.is_initialized() {
      return Err(OsalError::NotInitialized)
    }

    Ok(&self.table)
  }

  /// Number of occupied task slots.
  pub fn task_count(&self) -> usize {
    self.table.count()
  }

  /// Visit every task occupying a slot.
  ///
  /// The visitor sees a snapshot taken before the first call; tasks created
  /// or deleted meanwhile are not reflected.
  pub fn for_each<F: FnMut(&TaskHandle)>(&self, mut visitor: F) {
    for tcb in self.table.snapshot() {
      visitor(&TaskHandle::new(tcb, self.table.clone()));
    }
  }

  /// Get the state of all tasks.
  pub fn system_state(&self) -> SystemState {
    let mut tasks = Vec::with_capacity(self.table.capacity());
    self.for_each(|handle| tasks.push(TaskStatus::new(handle.clone())));

    SystemState { tasks, capacity: self.table.capacity() }
  }
}

impl Drop for Osal {
  /// Stop and join every remaining task.
  fn drop(&mut self) {
    self.for_each(|handle| {
      if let Err(err) = handle.delete() {
        osal_log!(self.table.logger, Warn, "[OSAL] shutdown of slot {}: {}", handle.slot(), err);
      }
    });
  }
}
