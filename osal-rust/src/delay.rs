use core::time::Duration;

use std::time::Instant;

use crate::{CurrentTask, TaskResult};

/// Delay the current task by the given duration, minus the
/// time that was spent processing the last wakeup loop.
pub struct TaskDelay {
  last_wake_time: Instant,
}

impl TaskDelay {
  /// Create a new helper, marking the current time as the start of the
  /// next measurement.
  pub fn new() -> TaskDelay {
    TaskDelay {
      last_wake_time: Instant::now(),
    }
  }

  /// Delay the execution of the current task by the given duration,
  /// minus the time spent in this task since the last delay.
  pub fn delay_until(&mut self, task: &mut CurrentTask, period: Duration) -> TaskResult {
    let wake_time = self.last_wake_time + period;
    self.last_wake_time = wake_time;
    task.delay(wake_time.saturating_duration_since(Instant::now()))
  }
}

impl Default for TaskDelay {
  fn default() -> Self {
    Self::new()
  }
}

/// Periodic delay timer.
///
/// Use inside a polling loop that also does other work: `should_run` returns
/// true once the period has elapsed and restarts the period from that moment.
pub struct TaskDelayPeriodic {
  last_wake_time: Instant,
  period: Duration,
}

impl TaskDelayPeriodic {
  /// Create a new timer with the set period.
  pub fn new(period: Duration) -> TaskDelayPeriodic {
    TaskDelayPeriodic {
      last_wake_time: Instant::now(),
      period,
    }
  }

  /// Has the set period passed? If it has, resets the internal timer.
  pub fn should_run(&mut self) -> bool {
    let now = Instant::now();
    if now.duration_since(self.last_wake_time) < self.period {
      false
    } else {
      self.last_wake_time = now;
      true
    }
  }

  /// Set a new delay period
  pub fn set_period(&mut self, period: Duration) {
    self.period = period;
  }

  /// Reset the internal timer to zero.
  pub fn reset(&mut self) {
    self.last_wake_time = Instant::now();
  }
}

/// Lets `embedded-hal` drivers delay through the task's checkpoint.
///
/// The trait cannot report a stop; the delay just ends early and the next
/// fallible checkpoint returns [`Stopped`](crate::Stopped).
#[cfg(feature = "hal")]
mod hal {
  use core::time::Duration;

  use embedded_hal::blocking::delay::DelayMs;

  use crate::CurrentTask;

  macro_rules! impl_delay_ms {
    ($($ty:ty),+) => {
      $(
        impl DelayMs<$ty> for CurrentTask {
          fn delay_ms(&mut self, ms: $ty) {
            let _ = self.delay(Duration::from_millis(ms.into()));
          }
        }
      )+
    };
  }

  impl_delay_ms!(u8, u16, u32);
}
