#![forbid(unsafe_code)]

//! Drag-origin capture and per-move position math.
//!
//! A [`DragHandler`] is built once, when a drag starts. It freezes the
//! group's axis settings at that moment, so changing the group's
//! configuration mid-drag does not affect the drag in progress.
//!
//! Each move computes
//!
//! ```text
//! element_origin + (pointer - pointer_origin) + (scroll_origin - scroll)
//! ```
//!
//! where `scroll` is the page offset of the item's scrollable container.
//! Scrolling the container mid-drag therefore keeps the item under the
//! pointer.

use sortkit_core::{Axis, Point};

use crate::config::GroupConfig;

/// Drag state captured at drag start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragHandler {
    /// Movement restricted to one axis.
    Constrained {
        axis: Axis,
        pointer_origin: f64,
        element_origin: f64,
        scroll_origin: f64,
    },
    /// Movement in both dimensions.
    Free {
        pointer_origin: Point,
        element_origin: Point,
        scroll_origin: Point,
    },
}

/// Outcome of one pointer move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragStep {
    /// New coordinate along `axis`.
    Axis { axis: Axis, value: f64 },
    /// New item position, plus the raw pointer for host notification.
    Free { position: Point, pointer: Point },
}

impl DragHandler {
    /// Capture origins for a drag starting with the pointer at `pointer`,
    /// the item at `element` and its container at page offset `scroll`.
    #[must_use]
    pub fn new(config: GroupConfig, pointer: Point, element: Point, scroll: Point) -> Self {
        if config.constrain_direction {
            let axis = config.direction;
            Self::Constrained {
                axis,
                pointer_origin: pointer.along(axis),
                element_origin: element.along(axis),
                scroll_origin: scroll.along(axis),
            }
        } else {
            Self::Free {
                pointer_origin: pointer,
                element_origin: element,
                scroll_origin: scroll,
            }
        }
    }

    #[must_use]
    pub fn is_constrained(&self) -> bool {
        matches!(self, Self::Constrained { .. })
    }

    /// Position for a pointer at `pointer` with the container at `scroll`.
    #[must_use]
    pub fn step(&self, pointer: Point, scroll: Point) -> DragStep {
        match *self {
            Self::Constrained {
                axis,
                pointer_origin,
                element_origin,
                scroll_origin,
            } => {
                let delta = pointer.along(axis) - pointer_origin;
                let value = element_origin + delta + (scroll_origin - scroll.along(axis));
                DragStep::Axis { axis, value }
            }
            Self::Free {
                pointer_origin,
                element_origin,
                scroll_origin,
            } => DragStep::Free {
                position: element_origin + (pointer - pointer_origin) + (scroll_origin - scroll),
                pointer,
            },
        }
    }

    /// Container offset captured at drag start.
    #[must_use]
    pub fn scroll_origin(&self) -> Point {
        match *self {
            Self::Constrained {
                axis,
                scroll_origin,
                ..
            } => Point::ZERO.with(axis, scroll_origin),
            Self::Free { scroll_origin, .. } => scroll_origin,
        }
    }
}
