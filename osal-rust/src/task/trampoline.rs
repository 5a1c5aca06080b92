use std::sync::Arc;

use crate::{logging::Logger, sched, Stopped, TaskResult};

use super::{control_block::ControlBlock, table::TaskTable, CurrentTask};

pub(super) type Entry = Box<dyn FnOnce(&mut CurrentTask) -> TaskResult + Send>;

/// Marks the task finished however the entry function is left.
struct FinishGuard<'a> {
  tcb: &'a ControlBlock,
  logger: Logger,
}

impl Drop for FinishGuard<'_> {
  fn drop(&mut self) {
    if std::thread::panicking() {
      osal_log!(self.logger, Error, "[OSAL][Task] slot {} panicked", self.tcb.slot());
    }
    self.tcb.mark_finished();
  }
}

/// Body of every task thread.
pub(super) fn run(tcb: Arc<ControlBlock>, table: Arc<TaskTable>, entry: Entry) {
  let logger = table.logger;
  let _finish = FinishGuard { tcb: &tcb, logger };

  // The thread name was already set by the spawning `thread::Builder`.
  tcb.bind_current_thread();

  let applied = {
    let mut flags = tcb.lock();
    let priority = tcb.priority();
    if flags.priority_applied || priority.is_unset() {
      None
    } else {
      flags.priority_applied = true;
      Some(sched::apply(sched::current(), priority))
    }
  };
  if let Some(applied) = applied {
    // A denied priority does not stop the task.
    let _ = applied.report(&logger);
  }

  let mut current = CurrentTask::new(tcb.clone(), table);
  match entry(&mut current) {
    Ok(()) => osal_log!(logger, Debug, "[OSAL][Task] '{}' returned", tcb.name()),
    Err(Stopped) => osal_log!(logger, Debug, "[OSAL][Task] '{}' stopped at checkpoint", tcb.name()),
  }
}
