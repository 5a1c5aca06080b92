//! Task primitives.
//!
//! # Examples
//!
//! ```
//! use core::time::Duration;
//! use osal_rust::{Config, Osal};
//!
//! let osal = Osal::init(Config::default()).unwrap();
//!
//! let task = osal.task().name("hello").stack_size(16384).start(|task| {
//!   loop {
//!     println!("Hello, world!");
//!     task.delay(Duration::from_millis(100))?;
//!   }
//! }).unwrap();
//!
//! task.delete().unwrap();
//! ```

use core::ops::Deref;

mod builder;
pub use builder::TaskBuilder;
pub(crate) mod control_block;
mod current;
pub use current::CurrentTask;
mod handle;
pub use handle::TaskHandle;
mod name;
pub use name::TaskName;
mod priority;
pub use priority::{HostPriority, TaskPriority};
mod state;
pub use state::TaskState;
mod system_state;
pub use system_state::{SystemState, TaskStatus};
pub(crate) mod table;
mod trampoline;

/// Minimal task stack size in bytes.
pub const MINIMAL_STACK_SIZE: usize = 16384;

/// Width of a task name including the terminator.
pub const MAX_TASK_NAME_LEN: usize = 16;

/// A task, as returned by [`TaskBuilder::start`].
///
/// Dropping a `Task` does not stop it; the task keeps its slot until it is
/// deleted through any of its handles or the owning [`Osal`](crate::Osal)
/// is dropped.
#[must_use = "a task can only be deleted through its handle"]
#[derive(Debug)]
pub struct Task {
  handle: TaskHandle,
}

impl Task {
  /// Get a shareable handle for this task.
  pub fn handle(&self) -> TaskHandle {
    self.handle.clone()
  }

  /// Stop the task, wait for its thread and release its slot.
  pub fn delete(self) -> Result<(), crate::OsalError> {
    self.handle.delete()
  }
}

impl Deref for Task {
  type Target = TaskHandle;

  #[inline]
  fn deref(&self) -> &Self::Target {
    &self.handle
  }
}

#[cfg(test)]
mod tests {
  use core::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
  };

  use std::{
    sync::{mpsc, Arc},
    thread,
    time::Instant,
  };

  use crate::{Config, Osal, OsalError, SchedOutcome};

  use super::*;

  fn osal(max_tasks: usize) -> Osal {
    Osal::init(Config::default().max_tasks(max_tasks)).unwrap()
  }

  fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
      if condition() {
        return true
      }
      thread::sleep(Duration::from_millis(1));
    }
    false
  }

  #[test]
  fn suspended_delay_returns_only_after_resume() {
    let osal = osal(8);
    let (done_tx, done_rx) = mpsc::channel();

    let task = osal.task().name("T1").stack_size(2048).priority(TaskPriority::UNSET).start(move |task| {
      task.delay_ms(1000)?;
      done_tx.send(Instant::now()).unwrap();
      Ok(())
    }).unwrap();

    assert_eq!(task.state(), TaskState::Running);
    task.suspend().unwrap();
    assert_eq!(task.state(), TaskState::Waiting);

    thread::sleep(Duration::from_millis(1200));
    assert!(done_rx.try_recv().is_err(), "delay returned while suspended");

    let resumed_at = Instant::now();
    task.resume().unwrap();
    let returned_at = done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(returned_at.duration_since(resumed_at) < Duration::from_millis(500));

    task.delete().unwrap();
  }

  #[test]
  fn pool_capacity_is_enforced() {
    let osal = osal(4);

    let tasks = (0..4)
      .map(|_| osal.task().start(|task| loop { task.delay_ms(5)? }).unwrap())
      .collect::<Vec<_>>();
    assert_eq!(osal.task_count(), 4);

    let overflow = osal.task().start(|_| Ok(()));
    assert_eq!(overflow.err(), Some(OsalError::ResourceExhausted));
    assert_eq!(osal.task_count(), 4);

    let mut tasks = tasks.into_iter();
    tasks.next().unwrap().delete().unwrap();
    assert_eq!(osal.task_count(), 3);

    let replacement = osal.task().start(|task| loop { task.delay_ms(5)? }).unwrap();
    assert_eq!(replacement.slot(), 0);
    assert_eq!(osal.task_count(), 4);
  }

  #[test]
  fn delete_stops_a_yielding_loop_without_leaking_its_thread() {
    let osal = osal(8);
    let alive = Arc::new(());
    let iterations = Arc::new(AtomicUsize::new(0));

    let task = {
      let alive = alive.clone();
      let iterations = iterations.clone();
      osal.task().name("yielder").start(move |task| {
        let _alive = alive;
        loop {
          iterations.fetch_add(1, Ordering::Relaxed);
          task.yield_now()?;
        }
      }).unwrap()
    };

    assert!(wait_for(|| iterations.load(Ordering::Relaxed) > 100));
    task.delete().unwrap();

    assert_eq!(Arc::strong_count(&alive), 1);
    assert_eq!(osal.task_count(), 0);
  }

  #[test]
  fn delete_is_terminal() {
    let osal = osal(1);
    let task = osal.task().name("short").start(|task| loop { task.delay_ms(1)? }).unwrap();
    let handle = task.handle();
    assert_eq!(handle, *task);

    task.delete().unwrap();

    assert_eq!(handle.state(), TaskState::Invalid);
    assert_eq!(handle.suspend(), Err(OsalError::InvalidArgument));
    assert_eq!(handle.resume(), Err(OsalError::InvalidArgument));
    assert_eq!(handle.delete(), Err(OsalError::InvalidArgument));
    assert_eq!(handle.change_priority(TaskPriority::new(10)).err(), Some(OsalError::InvalidArgument));

    let next = osal.task().start(|_| Ok(())).unwrap();
    assert_eq!(next.slot(), handle.slot());
    next.delete().unwrap();
  }

  #[test]
  fn suspend_takes_effect_at_the_next_checkpoint() {
    let osal = osal(8);
    let release = Arc::new(AtomicBool::new(false));
    let spins = Arc::new(AtomicUsize::new(0));
    let past_checkpoint = Arc::new(AtomicBool::new(false));

    let task = {
      let (release, spins, past_checkpoint) = (release.clone(), spins.clone(), past_checkpoint.clone());
      osal.task().start(move |task| {
        while !release.load(Ordering::Acquire) {
          spins.fetch_add(1, Ordering::Relaxed);
          std::hint::spin_loop();
        }
        task.yield_now()?;
        past_checkpoint.store(true, Ordering::Release);
        loop { task.delay_ms(5)? }
      }).unwrap()
    };

    assert!(wait_for(|| spins.load(Ordering::Relaxed) > 0));
    task.suspend().unwrap();

    let before = spins.load(Ordering::Relaxed);
    assert!(wait_for(|| spins.load(Ordering::Relaxed) > before), "suspend froze the task between checkpoints");

    release.store(true, Ordering::Release);
    thread::sleep(Duration::from_millis(50));
    assert!(!past_checkpoint.load(Ordering::Acquire));
    assert_eq!(task.state(), TaskState::Waiting);

    task.resume().unwrap();
    assert!(wait_for(|| past_checkpoint.load(Ordering::Acquire)));
    assert_eq!(task.state(), TaskState::Running);

    task.delete().unwrap();
  }

  #[test]
  fn back_to_back_suspend_resume_never_loses_a_wakeup() {
    let osal = osal(8);
    let iterations = Arc::new(AtomicUsize::new(0));

    let task = {
      let iterations = iterations.clone();
      osal.task().start(move |task| loop {
        iterations.fetch_add(1, Ordering::Relaxed);
        task.delay_ms(1)?;
      }).unwrap()
    };

    for _ in 0..200 {
      task.suspend().unwrap();
      task.resume().unwrap();
    }

    task.suspend().unwrap();
    thread::sleep(Duration::from_millis(50));
    task.resume().unwrap();

    let before = iterations.load(Ordering::Relaxed);
    assert!(wait_for(|| iterations.load(Ordering::Relaxed) > before + 5));
    assert_eq!(task.state(), TaskState::Running);

    task.delete().unwrap();
  }

  #[test]
  fn delete_wakes_a_suspended_task() {
    let osal = osal(8);
    let task = osal.task().start(|task| loop { task.delay_ms(1)? }).unwrap();
    task.suspend().unwrap();
    thread::sleep(Duration::from_millis(30));

    let start = Instant::now();
    task.delete().unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(osal.task_count(), 0);
  }

  #[test]
  fn delete_timeout_leaves_a_busy_task_in_place() {
    let osal = osal(8);
    let release = Arc::new(AtomicBool::new(false));

    let task = {
      let release = release.clone();
      osal.task().name("busy").start(move |task| {
        while !release.load(Ordering::Acquire) {
          thread::sleep(Duration::from_millis(1));
        }
        task.yield_now()
      }).unwrap()
    };

    assert_eq!(task.delete_timeout(Duration::from_millis(50)), Err(OsalError::Timeout));
    assert_eq!(task.state(), TaskState::Invalid);
    assert_eq!(osal.task_count(), 1);

    release.store(true, Ordering::Release);
    task.delete_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(osal.task_count(), 0);
  }

  #[test]
  fn a_task_cannot_delete_itself() {
    let osal = osal(8);
    let (tx, rx) = mpsc::channel();

    let task = osal.task().start(move |task| {
      tx.send(task.handle().delete()).unwrap();
      loop { task.delay_ms(5)? }
    }).unwrap();

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), Err(OsalError::InvalidArgument));
    assert_eq!(task.state(), TaskState::Running);
    task.delete().unwrap();
  }

  #[test]
  fn finished_tasks_report_invalid_until_deleted() {
    let osal = osal(8);
    let task = osal.task().name("oneshot").start(|_| Ok(())).unwrap();

    assert!(wait_for(|| task.state() == TaskState::Invalid));
    assert_eq!(task.suspend(), Ok(()));
    assert_eq!(task.state(), TaskState::Invalid);
    assert_eq!(osal.task_count(), 1);

    task.delete().unwrap();
    assert_eq!(osal.task_count(), 0);
  }

  #[test]
  fn panicking_task_still_frees_its_slot() {
    let osal = osal(8);
    let task = osal.task().name("panics").start(|_| panic!("task failure")).unwrap();

    assert!(wait_for(|| task.state() == TaskState::Invalid));
    task.delete().unwrap();
    assert_eq!(osal.task_count(), 0);
  }

  #[test]
  fn change_priority_updates_the_stored_priority() {
    let osal = osal(8);
    let task = osal.task().priority(TaskPriority::new(10)).start(|task| loop { task.delay_ms(5)? }).unwrap();
    assert_eq!(task.priority(), TaskPriority::new(10));

    match task.change_priority(TaskPriority::new(200)).unwrap() {
      SchedOutcome::RealTime(host) => assert_eq!(host, TaskPriority::new(200).to_host()),
      SchedOutcome::Degraded => {},
    }
    assert_eq!(task.priority(), TaskPriority::new(200));

    task.delete().unwrap();
  }

  #[cfg(unix)]
  #[test]
  fn early_priority_change_is_not_overwritten_by_the_creation_priority() {
    let osal = osal(8);

    for _ in 0..20 {
      let (go_tx, go_rx) = mpsc::channel::<()>();
      let (sched_tx, sched_rx) = mpsc::channel();

      let task = osal.task().priority(TaskPriority::new(10)).start(move |task| {
        go_rx.recv().unwrap();
        let mut policy = 0;
        let mut param: libc::sched_param = unsafe { core::mem::zeroed() };
        let rc = unsafe { libc::pthread_getschedparam(libc::pthread_self(), &mut policy, &mut param) };
        assert_eq!(rc, 0);
        sched_tx.send((policy, param.sched_priority)).unwrap();
        loop { task.delay_ms(5)? }
      }).unwrap();

      let outcome = task.change_priority(TaskPriority::new(200)).unwrap();
      go_tx.send(()).unwrap();
      let (policy, host) = sched_rx.recv_timeout(Duration::from_secs(5)).unwrap();

      match outcome {
        SchedOutcome::RealTime(expected) => {
          assert_eq!(policy, libc::SCHED_FIFO);
          assert_eq!(host, expected.get());
        },
        SchedOutcome::Degraded => assert_eq!(policy, libc::SCHED_OTHER),
      }
      assert_eq!(task.priority(), TaskPriority::new(200));

      task.delete().unwrap();
    }
  }

  #[test]
  fn log_sink_may_query_the_task_whose_priority_changes() {
    use core::fmt;

    use std::sync::Mutex;

    use log::Level;

    static WATCHED: Mutex<Option<TaskHandle>> = Mutex::new(None);
    static SEEN: Mutex<Vec<TaskState>> = Mutex::new(Vec::new());

    fn sink(_level: Level, _args: fmt::Arguments<'_>) {
      let watched = WATCHED.lock().unwrap().clone();
      if let Some(handle) = watched {
        let state = handle.state();
        SEEN.lock().unwrap().push(state);
      }
    }

    let osal = Osal::init(Config::default().max_tasks(2).log(sink)).unwrap();
    let task = osal.task().start(|task| loop { task.delay_ms(5)? }).unwrap();
    *WATCHED.lock().unwrap() = Some(task.handle());

    let (done_tx, done_rx) = mpsc::channel();
    let handle = task.handle();
    thread::spawn(move || done_tx.send(handle.change_priority(TaskPriority::new(50))).unwrap());
    let outcome = done_rx.recv_timeout(Duration::from_secs(5)).expect("change_priority deadlocked in the log sink");
    assert!(outcome.is_ok());
    assert!(SEEN.lock().unwrap().contains(&TaskState::Running));

    *WATCHED.lock().unwrap() = None;
    task.delete().unwrap();
  }

  #[cfg(target_pointer_width = "64")]
  #[test]
  fn failed_spawn_releases_the_slot() {
    let osal = osal(1);

    let huge = osal.task().name("huge").stack_size(1 << 46).start(|_| Ok(()));
    assert_eq!(huge.err(), Some(OsalError::ResourceExhausted));
    assert_eq!(osal.task_count(), 0);

    let next = osal.task().start(|task| loop { task.delay_ms(5)? }).unwrap();
    assert_eq!(next.slot(), 0);
    assert_eq!(osal.task_count(), 1);
    next.delete().unwrap();
  }

  #[test]
  fn attributes_are_normalized() {
    let osal = osal(8);

    let long = osal.task().name("a-rather-long-task-name").stack_size(2048).start(|_| Ok(())).unwrap();
    assert_eq!(long.name(), Some("a-rather-long-t"));
    assert_eq!(long.stack_size(), MINIMAL_STACK_SIZE);

    let unnamed = osal.task().start(|_| Ok(())).unwrap();
    assert_eq!(unnamed.name(), None);
    assert_eq!(unnamed.stack_size(), 0);

    let bad = osal.task().name("nul\0name").start(|_| Ok(()));
    assert_eq!(bad.err(), Some(OsalError::InvalidArgument));
    assert_eq!(osal.task_count(), 2);

    long.delete().unwrap();
    unnamed.delete().unwrap();
  }

  #[test]
  fn thread_carries_the_task_name() {
    let osal = osal(8);
    let (tx, rx) = mpsc::channel();

    let task = osal.task().name("named-thread").start(move |task| {
      let names = (thread::current().name().map(str::to_owned), task.name().map(str::to_owned));
      tx.send(names).unwrap();
      Ok(())
    }).unwrap();

    let (thread_name, task_name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(thread_name.as_deref(), Some("named-thread"));
    assert_eq!(task_name.as_deref(), Some("named-thread"));
    task.delete().unwrap();
  }
}
