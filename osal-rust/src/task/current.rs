use core::time::Duration;

use std::{sync::Arc, thread, time::Instant};

use crate::TaskResult;

use super::{control_block::ControlBlock, table::TaskTable, TaskHandle};

/// The task that is currently executing.
///
/// Handed to the entry function by the trampoline. Its delay and yield
/// methods are the only points where a task observes suspend and stop
/// requests; they return [`Stopped`](crate::Stopped) once the task should
/// exit, which the entry is expected to propagate with `?`.
pub struct CurrentTask {
  tcb: Arc<ControlBlock>,
  table: Arc<TaskTable>,
}

impl CurrentTask {
  pub(super) fn new(tcb: Arc<ControlBlock>, table: Arc<TaskTable>) -> Self {
    Self { tcb, table }
  }

  /// Delay the execution of the current task.
  ///
  /// The delay is split into slices of at most the configured checkpoint
  /// slice. Suspension is honored after each slice, a stop request at once.
  /// Time spent suspended counts towards the delay.
  pub fn delay(&mut self, delay: Duration) -> TaskResult {
    let slice = self.table.checkpoint_slice;
    let deadline = Instant::now().checked_add(delay);

    loop {
      let remaining = match deadline {
        Some(deadline) => deadline.saturating_duration_since(Instant::now()),
        None => Duration::MAX,
      };

      let flags = self.tcb.sleep_slice(self.tcb.lock(), remaining.min(slice));
      self.tcb.checkpoint(flags)?;

      if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
        return Ok(())
      }
    }
  }

  /// Delay the execution of the current task by `ms` milliseconds.
  #[inline]
  pub fn delay_ms(&mut self, ms: u32) -> TaskResult {
    self.delay(Duration::from_millis(ms.into()))
  }

  /// Honor pending requests, then give up the rest of the time slice.
  pub fn yield_now(&mut self) -> TaskResult {
    self.tcb.checkpoint(self.tcb.lock())?;
    thread::yield_now();
    Ok(())
  }

  /// Whether a stop was requested and the task should wind down.
  pub fn is_stop_requested(&self) -> bool {
    !self.tcb.lock().running
  }

  pub fn name(&self) -> Option<&str> {
    Some(self.tcb.name().as_str()).filter(|name| !name.is_empty())
  }

  /// Get a handle for this task, e.g. to pass to other tasks.
  pub fn handle(&self) -> TaskHandle {
    TaskHandle::new(self.tcb.clone(), self.table.clone())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::mpsc;

  use crate::{Config, Osal, Stopped};

  use super::*;

  fn osal() -> Osal {
    Osal::init(Config::default()).unwrap()
  }

  #[test]
  fn delay_lasts_at_least_the_requested_time() {
    let osal = osal();
    let (tx, rx) = mpsc::channel();

    let task = osal.task().start(move |task| {
      let start = Instant::now();
      task.delay(Duration::from_millis(55))?;
      tx.send(start.elapsed()).unwrap();
      Ok(())
    }).unwrap();

    let elapsed = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(elapsed >= Duration::from_millis(55));
    task.delete().unwrap();
  }

  #[test]
  fn stop_interrupts_a_long_delay() {
    let osal = osal();
    let (tx, rx) = mpsc::channel();

    let task = osal.task().start(move |task| {
      let result = task.delay(Duration::from_secs(3600));
      tx.send(result).unwrap();
      result
    }).unwrap();

    thread::sleep(Duration::from_millis(20));
    let start = Instant::now();
    task.delete().unwrap();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(rx.recv().unwrap(), Err(Stopped));
  }

  #[test]
  fn zero_delay_still_parks_a_suspended_task() {
    let osal = osal();
    let (ready_tx, ready_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();

    let task = osal.task().start(move |task| {
      ready_rx.recv().unwrap();
      task.delay(Duration::ZERO)?;
      done_tx.send(()).unwrap();
      Ok(())
    }).unwrap();

    task.suspend().unwrap();
    ready_tx.send(()).unwrap();
    assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());

    task.resume().unwrap();
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    task.delete().unwrap();
  }

  #[test]
  fn current_task_knows_its_handle() {
    let osal = osal();
    let (tx, rx) = mpsc::channel();

    let task = osal.task().name("self").start(move |task| {
      tx.send(task.handle()).unwrap();
      loop { task.delay_ms(5)? }
    }).unwrap();

    let handle = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(handle, *task);
    assert_eq!(handle.name(), Some("self"));
    task.delete().unwrap();
  }

  #[cfg(feature = "hal")]
  #[test]
  fn hal_drivers_delay_through_the_checkpoint() {
    use embedded_hal::blocking::delay::DelayMs;

    fn toggle_forever<D: DelayMs<u16>>(delay: &mut D, toggles: &mut usize, stop: impl Fn(&D) -> bool) {
      while !stop(delay) {
        *toggles += 1;
        delay.delay_ms(2);
      }
    }

    let osal = osal();
    let (tx, rx) = mpsc::channel();

    let task = osal.task().name("blink").start(move |task| {
      let mut toggles = 0;
      toggle_forever(task, &mut toggles, CurrentTask::is_stop_requested);
      tx.send(toggles).unwrap();
      Err(Stopped)
    }).unwrap();

    thread::sleep(Duration::from_millis(30));
    task.delete().unwrap();
    assert!(rx.recv().unwrap() > 0);
  }
}
