use core::{fmt, str};

/// Fixed-width task identity.
///
/// One byte of `CAPACITY` is kept for the terminator the host thread API
/// expects, so at most `CAPACITY - 1` bytes of the name are stored. Longer
/// names are cut at the last character that fits.
#[derive(Clone, Copy)]
pub struct TaskName<const CAPACITY: usize> {
  buf: [u8; CAPACITY],
  len: usize,
}

impl<const CAPACITY: usize> TaskName<CAPACITY> {
  pub fn new(name: &str) -> Self {
    let mut buf = [0; CAPACITY];

    let mut len = 0;
    for c in name.chars() {
      if len + c.len_utf8() >= CAPACITY {
        break
      }

      c.encode_utf8(&mut buf[len..]);
      len += c.len_utf8();
    }

    Self { buf, len }
  }

  pub fn as_str(&self) -> &str {
    str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}

impl<const CAPACITY: usize> fmt::Debug for TaskName<CAPACITY> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.as_str().fmt(f)
  }
}

impl<const CAPACITY: usize> fmt::Display for TaskName<CAPACITY> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}
