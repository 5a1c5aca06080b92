use core::{
  sync::atomic::{AtomicU8, Ordering},
  time::Duration,
};

use std::{
  sync::{Condvar, Mutex, MutexGuard, OnceLock, PoisonError},
  thread::{self, ThreadId},
  time::Instant,
};

use crate::{sched::NativeThread, Stopped, TaskResult};

use super::{TaskName, TaskPriority, TaskState, MAX_TASK_NAME_LEN};

/// Flags guarded by the control block's mutex.
#[derive(Debug)]
pub(crate) struct TaskFlags {
  /// The slot still owns this control block.
  pub used: bool,
  /// Cleared when the entry returns or a stop request is issued; never set again.
  pub running: bool,
  /// Cooperative suspend request, only meaningful while `running`.
  pub suspended: bool,
  /// The trampoline has left the entry function.
  pub finished: bool,
  /// Present only while the native thread is alive and unjoined.
  pub native: Option<NativeThread>,
  /// A priority reached the host; later changes win over the creation priority.
  pub priority_applied: bool,
}

/// Per-task state shared between the slot table, the handles and the task itself.
pub(crate) struct ControlBlock {
  slot: usize,
  name: TaskName<MAX_TASK_NAME_LEN>,
  stack_size: usize,
  priority: AtomicU8,
  thread_id: OnceLock<ThreadId>,
  flags: Mutex<TaskFlags>,
  wake: Condvar,
}

impl ControlBlock {
  pub fn new(slot: usize, name: TaskName<MAX_TASK_NAME_LEN>, priority: TaskPriority, stack_size: usize) -> Self {
    Self {
      slot,
      name,
      stack_size,
      priority: AtomicU8::new(priority.get()),
      thread_id: OnceLock::new(),
      flags: Mutex::new(TaskFlags {
        used: true,
        running: true,
        suspended: false,
        finished: false,
        native: None,
        priority_applied: false,
      }),
      wake: Condvar::new(),
    }
  }

  #[inline]
  pub fn slot(&self) -> usize {
    self.slot
  }

  #[inline]
  pub fn name(&self) -> &TaskName<MAX_TASK_NAME_LEN> {
    &self.name
  }

  #[inline]
  pub fn stack_size(&self) -> usize {
    self.stack_size
  }

  #[inline]
  pub fn priority(&self) -> TaskPriority {
    TaskPriority::new(self.priority.load(Ordering::Acquire))
  }

  #[inline]
  pub fn set_priority(&self, priority: TaskPriority) {
    self.priority.store(priority.get(), Ordering::Release)
  }

  /// Lock the flags.
  ///
  /// User code never runs under this lock, so a poisoned lock still holds
  /// consistent flags.
  pub fn lock(&self) -> MutexGuard<'_, TaskFlags> {
    self.flags.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Record the thread executing this task; called first thing in the trampoline.
  pub fn bind_current_thread(&self) {
    let _ = self.thread_id.set(thread::current().id());
  }

  pub fn is_current_thread(&self) -> bool {
    self.thread_id.get() == Some(&thread::current().id())
  }

  /// Store the native thread once it was spawned, unless it already finished.
  pub fn attach_native(&self, native: NativeThread) {
    let mut flags = self.lock();
    if !flags.finished {
      flags.native = Some(native);
    }
  }

  pub fn state(&self) -> TaskState {
    let flags = self.lock();
    if !flags.running {
      TaskState::Invalid
    } else if flags.suspended {
      TaskState::Waiting
    } else {
      TaskState::Running
    }
  }

  pub fn is_used(&self) -> bool {
    self.lock().used
  }

  pub fn request_suspend(&self) {
    let mut flags = self.lock();
    if flags.running {
      flags.suspended = true;
    }
  }

  pub fn request_resume(&self) {
    self.lock().suspended = false;
    self.wake.notify_all();
  }

  pub fn request_stop(&self) {
    {
      let mut flags = self.lock();
      flags.running = false;
      flags.suspended = false;
    }
    self.wake.notify_all();
  }

  /// Called by the trampoline once the entry function is done.
  pub fn mark_finished(&self) {
    {
      let mut flags = self.lock();
      flags.running = false;
      flags.suspended = false;
      flags.finished = true;
      flags.native = None;
    }
    self.wake.notify_all();
  }

  /// Called by the slot table after the thread has been joined.
  pub fn mark_reclaimed(&self) {
    let mut flags = self.lock();
    debug_assert!(flags.finished, "reclaiming the slot of a live task");
    flags.used = false;
  }

  /// Wait until the trampoline has left the entry function.
  ///
  /// Returns `false` if `timeout` elapsed first.
  pub fn wait_finished(&self, timeout: Option<Duration>) -> bool {
    let flags = self.lock();

    match timeout {
      None => {
        let flags = self.wake.wait_while(flags, |f| !f.finished).unwrap_or_else(PoisonError::into_inner);
        flags.finished
      },
      Some(timeout) => {
        let (flags, _) = self.wake
          .wait_timeout_while(flags, timeout, |f| !f.finished)
          .unwrap_or_else(PoisonError::into_inner);
        flags.finished
      },
    }
  }

  /// Sleep for at most `slice`, waking early only on a stop request.
  pub fn sleep_slice<'a>(&'a self, flags: MutexGuard<'a, TaskFlags>, slice: Duration) -> MutexGuard<'a, TaskFlags> {
    if slice.is_zero() {
      return flags
    }

    let deadline = Instant::now() + slice;
    let mut flags = flags;
    while flags.running {
      let now = Instant::now();
      if now >= deadline {
        break
      }

      flags = self.wake
        .wait_timeout(flags, deadline - now)
        .unwrap_or_else(PoisonError::into_inner)
        .0;
    }
    flags
  }

  /// Observe pending requests: park while suspended, then report a stop.
  pub fn checkpoint(&self, flags: MutexGuard<'_, TaskFlags>) -> TaskResult {
    let flags = self.wake
      .wait_while(flags, |f| f.running && f.suspended)
      .unwrap_or_else(PoisonError::into_inner);

    if flags.running {
      Ok(())
    } else {
      Err(Stopped)
    }
  }
}
