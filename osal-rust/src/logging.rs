use core::fmt;

use log::Level;

use crate::config::LogFn;

/// Diagnostic output of the runtime.
///
/// Records go to the platform sink from the [`Config`](crate::Config) if one
/// was given, otherwise to the `log` facade under the `osal` target.
#[derive(Clone, Copy, Default)]
pub(crate) struct Logger {
  sink: Option<LogFn>,
}

impl Logger {
  pub const fn new(sink: Option<LogFn>) -> Self {
    Self { sink }
  }

  pub fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
    match self.sink {
      Some(sink) => sink(level, args),
      None => log::log!(target: "osal", level, "{}", args),
    }
  }
}

macro_rules! osal_log {
  ($logger:expr, $level:ident, $($arg:tt)+) => {
    $logger.emit(::log::Level::$level, format_args!($($arg)+))
  };
}
