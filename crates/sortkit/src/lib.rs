#![forbid(unsafe_code)]

//! sortkit
//!
//! Drag-and-reorder engine for sortable lists.
//!
//! # Key Components
//!
//! - [`SortableGroup`] - Container that lays items out and commits the order
//! - [`SortableItem`] - Draggable member with the press/drag/drop state machine
//! - [`Change`] - New order reported to the host on commit
//! - [`Surface`] - Host seam for measuring and styling a rendered element
//! - [`MemoryElement`] - In-memory element for headless hosts and tests
//!
//! # Role in sortkit
//! `sortkit` holds the engine. It is written against the primitives in
//! `sortkit-core` (geometry, pointer events, the [`FrameScheduler`] seam)
//! and never touches a rendering technology directly.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use sortkit::{GroupConfig, MemoryElement, SortableGroup, SortableItem};
//! use sortkit_core::{FrameLoop, MouseButton, PointerEvent};
//!
//! let frame = Rc::new(FrameLoop::new());
//! let order = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&order);
//! let group: SortableGroup<&str> = SortableGroup::new(GroupConfig::default(), frame.clone())
//!     .on_change(move |change| *sink.borrow_mut() = change.order().to_vec());
//!
//! let items: Vec<_> = [("a", 0.0), ("b", 20.0)]
//!     .into_iter()
//!     .map(|(model, y)| {
//!         let element = Rc::new(MemoryElement::at(0.0, y, 100.0, 20.0));
//!         let item = SortableItem::new(model, element, frame.clone()).with_group(&group);
//!         item.did_insert();
//!         item
//!     })
//!     .collect();
//! frame.flush();
//!
//! // Drag "a" below "b".
//! let a = &items[0];
//! frame.run(|| a.pointer_down(&PointerEvent::mouse(MouseButton::Primary, 10.0, 10.0)));
//! frame.step();
//! frame.run(|| group.dispatch_pointer_move(&PointerEvent::mouse(MouseButton::Primary, 10.0, 11.0)));
//! frame.run(|| group.dispatch_pointer_move(&PointerEvent::mouse(MouseButton::Primary, 10.0, 45.0)));
//! frame.run(|| group.dispatch_pointer_up(&PointerEvent::mouse(MouseButton::Primary, 10.0, 45.0)));
//! frame.settle(16);
//!
//! assert_eq!(*order.borrow(), vec!["b", "a"]);
//! ```

pub mod config;
pub mod drag;
pub mod element;
pub mod group;
pub mod item;

pub use config::{ConfigError, GroupConfig, ItemConfig, SortableConfig};
pub use drag::{DragHandler, DragStep};
pub use element::{BoxMetrics, Measured, MemoryElement, Surface, Transform, Transition};
pub use group::{Change, SortableGroup, WeakGroup};
pub use item::{ABOVE_THE_FOLD_THRESHOLD, GesturePhase, ItemFlags, SortableItem};

pub use sortkit_core::{Axis, EventResult, FrameLoop, FrameScheduler, Point, PointerEvent};
