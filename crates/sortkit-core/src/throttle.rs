#![forbid(unsafe_code)]

//! Trailing-edge throttling for side-effecting calls.
//!
//! A pointer-move stream can arrive far faster than layout should be
//! recomputed. [`Throttle`] coalesces calls made within one interval into a
//! single invocation at the end of that interval.
//!
//! # Design
//!
//! "Latest wins": the first call arms a timer on the [`FrameScheduler`];
//! every call before it fires replaces the pending closure. When the timer
//! fires the most recent closure runs exactly once and the throttle
//! disarms. Calls are coalesced, never queued.
//!
//! # Invariants
//!
//! 1. At most one timer is armed per throttle.
//! 2. At most one closure runs per armed interval.
//! 3. After [`cancel`](Throttle::cancel) nothing pending runs.

use std::cell::RefCell;
use std::rc::Rc;

use web_time::Duration;

use crate::frame::{FrameScheduler, TaskId};

#[derive(Default)]
struct ThrottleState {
    pending: Option<Box<dyn FnOnce()>>,
    timer: Option<TaskId>,
    fired: u64,
}

/// Cancelable trailing-edge throttle. Single-threaded.
pub struct Throttle {
    interval: Duration,
    state: Rc<RefCell<ThrottleState>>,
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Throttle")
            .field("interval", &self.interval)
            .field("armed", &state.timer.is_some())
            .field("fired", &state.fired)
            .finish()
    }
}

impl Throttle {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Rc::new(RefCell::new(ThrottleState::default())),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval. Takes effect the next time the throttle arms.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// `true` while a call is waiting for the interval to elapse.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.borrow().timer.is_some()
    }

    /// Number of coalesced invocations that actually ran.
    #[must_use]
    pub fn fired(&self) -> u64 {
        self.state.borrow().fired
    }

    /// Request `f` to run at the end of the current interval.
    pub fn call(&self, scheduler: &dyn FrameScheduler, f: impl FnOnce() + 'static) {
        let mut state = self.state.borrow_mut();
        state.pending = Some(Box::new(f));
        if state.timer.is_some() {
            return;
        }

        let weak = Rc::downgrade(&self.state);
        let id = scheduler.schedule_later(
            self.interval,
            Box::new(move || {
                let Some(state) = weak.upgrade() else {
                    return;
                };
                let pending = {
                    let mut state = state.borrow_mut();
                    state.timer = None;
                    let pending = state.pending.take();
                    if pending.is_some() {
                        state.fired += 1;
                    }
                    pending
                };
                if let Some(f) = pending {
                    f();
                }
            }),
        );
        state.timer = Some(id);
    }

    /// Drop the pending call and disarm the timer.
    pub fn cancel(&self, scheduler: &dyn FrameScheduler) {
        let mut state = self.state.borrow_mut();
        state.pending = None;
        if let Some(id) = state.timer.take() {
            scheduler.cancel(id);
        }
    }
}
