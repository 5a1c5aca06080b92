use core::time::Duration;

use std::{
  sync::{Arc, Mutex, MutexGuard, PoisonError},
  thread::JoinHandle,
};

use crate::{logging::Logger, sched, Config, OsalError};

use super::{control_block::ControlBlock, TaskName, TaskPriority, MAX_TASK_NAME_LEN};

struct Slot {
  tcb: Arc<ControlBlock>,
  thread: Option<JoinHandle<()>>,
}

/// Fixed-capacity pool of task control blocks.
///
/// The table lock only covers slot occupancy; each control block guards its
/// own flags.
pub(crate) struct TaskTable {
  slots: Mutex<Vec<Option<Slot>>>,
  pub(crate) logger: Logger,
  pub(crate) checkpoint_slice: Duration,
  pub(crate) min_stack_size: usize,
}

impl TaskTable {
  pub fn new(config: &Config) -> Self {
    Self {
      slots: Mutex::new((0..config.max_tasks).map(|_| None).collect()),
      logger: Logger::new(config.log),
      checkpoint_slice: config.checkpoint_slice,
      min_stack_size: config.min_stack_size,
    }
  }

  fn slots(&self) -> MutexGuard<'_, Vec<Option<Slot>>> {
    self.slots.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn capacity(&self) -> usize {
    self.slots().len()
  }

  /// Claim the first free slot for a new, running control block.
  pub fn allocate(
    &self,
    name: TaskName<MAX_TASK_NAME_LEN>,
    priority: TaskPriority,
    stack_size: usize,
  ) -> Result<Arc<ControlBlock>, OsalError> {
    let mut slots = self.slots();

    let (index, slot) = slots
      .iter_mut()
      .enumerate()
      .find(|(_, slot)| slot.is_none())
      .ok_or(OsalError::ResourceExhausted)?;

    let tcb = Arc::new(ControlBlock::new(index, name, priority, stack_size));
    *slot = Some(Slot { tcb: tcb.clone(), thread: None });
    Ok(tcb)
  }

  /// Hand the spawned thread to the slot owning `tcb`.
  pub fn attach(&self, tcb: &Arc<ControlBlock>, thread: JoinHandle<()>) {
    tcb.attach_native(sched::native_of(&thread));

    if let Some(slot) = self.slot_of(&mut self.slots(), tcb) {
      slot.thread = Some(thread);
    }
  }

  /// Take the join handle; only one caller ever gets it.
  pub fn take_thread(&self, tcb: &Arc<ControlBlock>) -> Option<JoinHandle<()>> {
    self.slot_of(&mut self.slots(), tcb)?.thread.take()
  }

  /// Release the slot owning `tcb`.
  ///
  /// The task's thread must have been joined, or never started.
  pub fn reclaim(&self, tcb: &Arc<ControlBlock>) {
    let mut slots = self.slots();
    if let Some(slot) = slots.get_mut(tcb.slot()) {
      if slot.as_ref().is_some_and(|s| Arc::ptr_eq(&s.tcb, tcb)) {
        tcb.mark_reclaimed();
        *slot = None;
      }
    }
  }

  pub fn count(&self) -> usize {
    self.slots().iter().filter(|slot| slot.is_some()).count()
  }

  /// Control blocks of all used slots, in slot order.
  pub fn snapshot(&self) -> Vec<Arc<ControlBlock>> {
    self.slots().iter().flatten().map(|slot| slot.tcb.clone()).collect()
  }

  fn slot_of<'s>(&self, slots: &'s mut MutexGuard<'_, Vec<Option<Slot>>>, tcb: &Arc<ControlBlock>) -> Option<&'s mut Slot> {
    slots
      .get_mut(tcb.slot())?
      .as_mut()
      .filter(|slot| Arc::ptr_eq(&slot.tcb, tcb))
  }
}
