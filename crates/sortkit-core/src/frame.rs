#![forbid(unsafe_code)]

//! Three-phase frame scheduling.
//!
//! Layout reads and writes must not interleave within one visual update:
//! reading measured geometry after a style write but before the host has
//! applied it yields stale values. [`FrameScheduler`] is the seam through
//! which the engine defers work into the right phase; a host integration
//! implements it on top of its own render loop.
//!
//! [`FrameLoop`] is a deterministic, manually driven implementation with a
//! virtual clock. Headless hosts, tests and fuzz targets use it directly.
//!
//! # Phases
//!
//! Each turn drains its queues in order:
//!
//! 1. [`Phase::Actions`]: state mutation.
//! 2. [`Phase::Render`]: layout writes (transforms, transition styles).
//! 3. [`Phase::AfterRender`]: layout reads (measurement, registration).
//!
//! A task that schedules into an earlier phase causes that phase to run
//! again before later phases continue, so the turn only ends once every
//! queue is empty.
//!
//! Next-tick and delayed tasks never run inside the turn that scheduled
//! them. They are timers, fired one per turn by [`FrameLoop::step`],
//! [`FrameLoop::advance`] or [`FrameLoop::settle`].
//!
//! # Invariants
//!
//! 1. Within a turn, no Render task runs while an Actions task is queued,
//!    and no AfterRender task runs while a Render task is queued.
//! 2. Timers fire in `(due, scheduling order)` order.
//! 3. A cancelled task never runs.

use std::cell::RefCell;
use std::collections::VecDeque;

use web_time::Duration;

/// Deferred unit of work.
pub type Task = Box<dyn FnOnce()>;

/// Handle to a scheduled task, usable with [`FrameScheduler::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Phase of a visual-update turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Actions,
    Render,
    AfterRender,
}

impl Phase {
    const ALL: [Phase; 3] = [Phase::Actions, Phase::Render, Phase::AfterRender];

    const fn index(self) -> usize {
        match self {
            Self::Actions => 0,
            Self::Render => 1,
            Self::AfterRender => 2,
        }
    }
}

/// Host visual-update scheduler.
pub trait FrameScheduler {
    /// Queue `task` into `phase` of the current (or next) turn.
    fn schedule(&self, phase: Phase, task: Task) -> TaskId;

    /// Run `task` in a later turn after `delay` has elapsed.
    fn schedule_later(&self, delay: Duration, task: Task) -> TaskId;

    /// Cancel a queued task. Returns `false` if it already ran or was unknown.
    fn cancel(&self, id: TaskId) -> bool;

    /// Queue a style/transform write.
    fn schedule_layout_write(&self, task: Task) -> TaskId {
        self.schedule(Phase::Render, task)
    }

    /// Queue a geometry read, after this turn's writes were applied.
    fn schedule_layout_read(&self, task: Task) -> TaskId {
        self.schedule(Phase::AfterRender, task)
    }

    /// Run `task` in a fresh turn, after the current one completes.
    fn schedule_next_tick(&self, task: Task) -> TaskId {
        self.schedule_later(Duration::ZERO, task)
    }
}

struct Timer {
    id: TaskId,
    due: Duration,
    task: Task,
}

struct LoopState {
    next_id: u64,
    now: Duration,
    queues: [VecDeque<(TaskId, Task)>; 3],
    timers: Vec<Timer>,
}

impl LoopState {
    fn alloc_id(&mut self) -> TaskId {
        self.next_id += 1;
        TaskId(self.next_id)
    }

    fn pop_phase_task(&mut self) -> Option<Task> {
        Phase::ALL
            .iter()
            .find_map(|phase| self.queues[phase.index()].pop_front())
            .map(|(_, task)| task)
    }

    /// Index of the earliest timer, optionally bounded by `limit`.
    fn earliest_timer(&self, limit: Option<Duration>) -> Option<usize> {
        self.timers
            .iter()
            .enumerate()
            .filter(|(_, t)| limit.is_none_or(|limit| t.due <= limit))
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(idx, _)| idx)
    }
}

/// Deterministic [`FrameScheduler`] with a virtual clock.
///
/// Input is delivered inside [`run`](Self::run), which flushes the phase
/// queues afterwards, mirroring a host that wraps event dispatch in a
/// render loop turn.
pub struct FrameLoop {
    state: RefCell<LoopState>,
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FrameLoop")
            .field("now", &state.now)
            .field("queued", &state.queues.iter().map(VecDeque::len).sum::<usize>())
            .field("timers", &state.timers.len())
            .finish()
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameLoop {
    /// Create an idle loop at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RefCell::new(LoopState {
                next_id: 0,
                now: Duration::ZERO,
                queues: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
                timers: Vec::new(),
            }),
        }
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Tasks waiting in phase queues.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.state.borrow().queues.iter().map(VecDeque::len).sum()
    }

    /// Timers (next-tick and delayed) not yet fired.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// `true` when nothing is queued and no timer is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queued() == 0 && self.pending_timers() == 0
    }

    /// Run `f`, then drain the phase queues.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let result = f();
        self.flush();
        result
    }

    /// Drain phase queues until all are empty. Returns the number of tasks run.
    pub fn flush(&self) -> usize {
        let mut ran = 0;
        loop {
            // Release the borrow before running: tasks schedule more work.
            let task = self.state.borrow_mut().pop_phase_task();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Fire the earliest timer already due, in its own turn.
    ///
    /// Returns `false` if no timer is due at the current virtual time.
    pub fn step(&self) -> bool {
        let now = self.now();
        self.fire_earliest(Some(now))
    }

    /// Move the clock forward by `delta`, firing every timer that comes due
    /// (including ones scheduled by earlier timers within the window).
    pub fn advance(&self, delta: Duration) {
        let target = self.now() + delta;
        while self.fire_earliest(Some(target)) {}
        self.state.borrow_mut().now = target;
    }

    /// Fire timers until none remain, moving the clock as needed.
    ///
    /// Returns the virtual time that elapsed. Stops after `max_turns` timers
    /// so a self-rescheduling task cannot spin forever.
    pub fn settle(&self, max_turns: usize) -> Duration {
        let start = self.now();
        for _ in 0..max_turns {
            if !self.fire_earliest(None) {
                break;
            }
        }
        self.now() - start
    }

    fn fire_earliest(&self, limit: Option<Duration>) -> bool {
        let timer = {
            let mut state = self.state.borrow_mut();
            let Some(idx) = state.earliest_timer(limit) else {
                return false;
            };
            let timer = state.timers.swap_remove(idx);
            if timer.due > state.now {
                state.now = timer.due;
            }
            timer
        };
        (timer.task)();
        self.flush();
        true
    }
}

impl FrameScheduler for FrameLoop {
    fn schedule(&self, phase: Phase, task: Task) -> TaskId {
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        state.queues[phase.index()].push_back((id, task));
        id
    }

    fn schedule_later(&self, delay: Duration, task: Task) -> TaskId {
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        let due = state.now + delay;
        state.timers.push(Timer { id, due, task });
        id
    }

    fn cancel(&self, id: TaskId) -> bool {
        let mut state = self.state.borrow_mut();
        if let Some(idx) = state.timers.iter().position(|t| t.id == id) {
            state.timers.swap_remove(idx);
            return true;
        }
        for queue in &mut state.queues {
            if let Some(idx) = queue.iter().position(|(queued, _)| *queued == id) {
                queue.remove(idx);
                return true;
            }
        }
        false
    }
}
