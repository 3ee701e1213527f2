#![forbid(unsafe_code)]

//! Core: geometry, pointer input, frame scheduling, and throttling.
//!
//! # Role in sortkit
//! `sortkit-core` holds the host-agnostic primitives the drag/reorder engine
//! is written against. Nothing here knows about groups or items.
//!
//! # Primary responsibilities
//! - **Geometry**: pixel-space points, sizes, margins and hit-test rects.
//! - **Event**: normalized mouse/touch pointer events.
//! - **Frame scheduling**: the three-phase [`FrameScheduler`] seam and the
//!   deterministic [`FrameLoop`].
//! - **Throttle**: trailing-edge, cancelable call coalescing.

pub mod event;
pub mod frame;
pub mod geometry;
pub mod throttle;

pub use event::{EventResult, Modifiers, MouseButton, PointerEvent, PointerKind, TargetId};
pub use frame::{FrameLoop, FrameScheduler, Phase, Task, TaskId};
pub use geometry::{Axis, Point, Rect, Sides, Size};
pub use throttle::Throttle;
