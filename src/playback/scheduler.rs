//! Cooperative scheduling of the render loop and the control loop.
//!
//! Tasks never block. Each step returns how long the task wants to be left
//! alone, and the scheduler sleeps only until the earliest deadline, so a
//! parameter change written by one task is seen by the other at its next
//! step.

use std::thread;
use std::time::{Duration, Instant};

use log::trace;

/// Time source for the scheduler.
pub trait Clock {
    /// Time since the clock started.
    fn now(&self) -> Duration;

    /// Block until `deadline`. Returns immediately if it already passed.
    fn sleep_until(&mut self, deadline: Duration);
}

/// Wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep_until(&mut self, deadline: Duration) {
        let now = self.now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
    }
}

/// Virtual clock that jumps straight to each deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock {
    now: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep_until(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }
}

/// A cooperative task.
pub trait Task {
    fn name(&self) -> &str {
        "task"
    }

    /// Do one bounded unit of work at time `now` and return the delay until
    /// the task wants to run again.
    fn step(&mut self, now: Duration) -> Duration;
}

struct Slot<'a> {
    task: &'a mut dyn Task,
    due: Duration,
    /// Step number of the last run, 0 if never run.
    last_run: u64,
}

/// Runs tasks in deadline order on one thread.
pub struct Scheduler<'a, C: Clock> {
    clock: C,
    slots: Vec<Slot<'a>>,
    steps: u64,
}

impl<'a, C: Clock> Scheduler<'a, C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            slots: Vec::new(),
            steps: 0,
        }
    }

    /// Add a task, due immediately.
    pub fn add(&mut self, task: &'a mut dyn Task) {
        let due = self.clock.now();
        self.slots.push(Slot {
            task,
            due,
            last_run: 0,
        });
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Task steps run so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Run the task with the earliest deadline. Ties go to the task that
    /// waited longest. Returns `false` if there is nothing to run.
    pub fn run_once(&mut self) -> bool {
        let Some(next) = self
            .slots
            .iter()
            .enumerate()
            .min_by_key(|(i, slot)| (slot.due, slot.last_run, *i))
            .map(|(i, _)| i)
        else {
            return false;
        };

        self.clock.sleep_until(self.slots[next].due);
        let now = self.clock.now();
        let slot = &mut self.slots[next];
        let delay = slot.task.step(now);
        trace!("{} at {:?}, next in {:?}", slot.task.name(), now, delay);
        self.steps += 1;
        slot.due = now + delay;
        slot.last_run = self.steps;
        true
    }

    /// Run `steps` task steps.
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            if !self.run_once() {
                break;
            }
        }
    }

    /// Run until the clock reaches `until`.
    pub fn run_until(&mut self, until: Duration) {
        while self.slots.iter().any(|slot| slot.due <= until) {
            if !self.run_once() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ticker {
        period: Duration,
        runs: Vec<Duration>,
    }

    impl Task for Ticker {
        fn step(&mut self, now: Duration) -> Duration {
            self.runs.push(now);
            self.period
        }
    }

    #[test]
    fn test_interleaves_by_deadline() {
        let mut fast = Ticker {
            period: Duration::from_millis(10),
            runs: Vec::new(),
        };
        let mut slow = Ticker {
            period: Duration::from_millis(25),
            runs: Vec::new(),
        };

        let mut scheduler = Scheduler::new(ManualClock::new());
        scheduler.add(&mut fast);
        scheduler.add(&mut slow);
        scheduler.run_until(Duration::from_millis(50));
        assert_eq!(scheduler.clock().now(), Duration::from_millis(50));
        drop(scheduler);

        let ms = |runs: &[Duration]| runs.iter().map(|d| d.as_millis()).collect::<Vec<_>>();
        assert_eq!(ms(&fast.runs[..]), vec![0, 10, 20, 30, 40, 50]);
        assert_eq!(ms(&slow.runs[..]), vec![0, 25, 50]);
    }

    #[test]
    fn test_zero_delay_task_does_not_starve_others() {
        let mut busy = Ticker {
            period: Duration::ZERO,
            runs: Vec::new(),
        };
        let mut other = Ticker {
            period: Duration::from_millis(1),
            runs: Vec::new(),
        };
        let mut scheduler = Scheduler::new(ManualClock::new());
        scheduler.add(&mut busy);
        scheduler.add(&mut other);
        scheduler.run(4);
        drop(scheduler);
        assert_eq!(busy.runs.len(), 3);
        assert_eq!(other.runs.len(), 1);
    }

    #[test]
    fn test_empty_scheduler() {
        let mut scheduler = Scheduler::new(ManualClock::new());
        assert!(!scheduler.run_once());
        assert_eq!(scheduler.steps(), 0);
    }
}
