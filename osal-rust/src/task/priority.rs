use core::fmt;

/// Task execution priority.
///
/// Low priority numbers denote low priority tasks. `0` means no priority was
/// requested and the task keeps the host's default scheduling class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TaskPriority {
  priority: u8,
}

impl TaskPriority {
  pub const UNSET: Self = Self::new(0);
  pub const HIGHEST: Self = Self::new(u8::MAX);

  /// Create a new `TaskPriority`.
  pub const fn new(priority: u8) -> Self {
    Self { priority }
  }

  #[inline]
  pub const fn get(self) -> u8 {
    self.priority
  }

  #[inline]
  pub const fn is_unset(self) -> bool {
    self.priority == 0
  }

  /// Map onto the host real-time priority range.
  ///
  /// `0` maps to [`HostPriority::MIN`], `255` to [`HostPriority::MAX`], and
  /// the mapping is monotonic in between.
  pub const fn to_host(self) -> HostPriority {
    let span = (HostPriority::MAX.0 - HostPriority::MIN.0) as u32;
    let p = HostPriority::MIN.0 + (self.priority as u32 * span / u8::MAX as u32) as i32;

    HostPriority(if p < HostPriority::MIN.0 {
      HostPriority::MIN.0
    } else if p > HostPriority::MAX.0 {
      HostPriority::MAX.0
    } else {
      p
    })
  }
}

impl From<u8> for TaskPriority {
  fn from(priority: u8) -> Self {
    Self::new(priority)
  }
}

impl fmt::Display for TaskPriority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.priority.fmt(f)
  }
}

/// Priority in the host's `SCHED_FIFO` range, `1` being the lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HostPriority(i32);

impl HostPriority {
  pub const MIN: Self = Self(1);
  pub const MAX: Self = Self(99);

  #[inline]
  pub const fn get(self) -> i32 {
    self.0
  }
}

impl fmt::Display for HostPriority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}
