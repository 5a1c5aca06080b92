use core::time::Duration;

use std::thread;

use embedded_hal::blocking::delay::DelayMs;
use osal_rust::*;

/// Stand-in for a board LED driver written against `embedded-hal`.
fn blink<D: DelayMs<u16>>(delay: &mut D, on: &mut bool) {
  *on = !*on;
  log::info!("LED {}", if *on { "on" } else { "off" });
  delay.delay_ms(250);
}

fn main() {
  stderrlog::new().verbosity(3).init().unwrap();

  let osal = Osal::init(Config::new(Backend::Linux).max_tasks(4)).unwrap();

  let blinker = osal.task()
    .name("blink")
    .stack_size(2048)
    .priority(TaskPriority::new(10))
    .start(|task| {
      let mut on = false;
      while !task.is_stop_requested() {
        blink(task, &mut on);
      }
      Err(Stopped)
    })
    .unwrap();

  let counter = osal.task()
    .name("counter")
    .priority(TaskPriority::new(2))
    .start(|task| {
      let mut period = TaskDelay::new();
      for i in 0.. {
        log::info!("Hello from task! {}", i);
        period.delay_until(task, Duration::from_secs(1))?;
      }
      Ok(())
    })
    .unwrap();

  println!("Task {:?} started.", blinker.name());
  thread::sleep(Duration::from_secs(2));

  blinker.suspend().unwrap();
  println!("{}", osal.system_state());
  thread::sleep(Duration::from_secs(2));
  blinker.resume().unwrap();

  thread::sleep(Duration::from_secs(2));
  blinker.delete().unwrap();
  counter.delete().unwrap();
  println!("{} tasks left.", osal.task_count());
}
