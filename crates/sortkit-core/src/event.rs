#![forbid(unsafe_code)]

//! Pointer input types.
//!
//! Hosts translate their native mouse and touch events into
//! [`PointerEvent`] before handing them to the engine.
//!
//! # Design Notes
//!
//! - Mouse events carry page coordinates; touch events carry the screen
//!   coordinates of the first changed touch. [`PointerEvent::position`]
//!   picks the right pair so drag math never cares which device it was.
//! - `Modifiers` use bitflags for easy combination.
//! - The event target is an opaque [`TargetId`] the host can resolve
//!   against its own element tree (used for drag handles).

use bitflags::bitflags;

use crate::geometry::Point;

/// Opaque identifier of the element an event was dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TargetId(pub u64);

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary (usually left) button.
    Primary,
    /// Secondary (usually right) button.
    Secondary,
    /// Middle button (scroll wheel click).
    Middle,
}

bitflags! {
    /// Modifier keys held during a pointer event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

/// Device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse(MouseButton),
    Touch,
}

/// A mouse or touch event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    /// Position relative to the document.
    pub page: Point,
    /// Position relative to the screen.
    pub screen: Point,
    pub modifiers: Modifiers,
    pub target: TargetId,
}

impl PointerEvent {
    /// Mouse event at a page position; screen position mirrors it.
    #[must_use]
    pub const fn mouse(button: MouseButton, x: f64, y: f64) -> Self {
        Self {
            kind: PointerKind::Mouse(button),
            page: Point::new(x, y),
            screen: Point::new(x, y),
            modifiers: Modifiers::NONE,
            target: TargetId(0),
        }
    }

    /// Touch event at a screen position; page position mirrors it.
    #[must_use]
    pub const fn touch(x: f64, y: f64) -> Self {
        Self {
            kind: PointerKind::Touch,
            page: Point::new(x, y),
            screen: Point::new(x, y),
            modifiers: Modifiers::NONE,
            target: TargetId(0),
        }
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub const fn with_target(mut self, target: TargetId) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub const fn with_screen(mut self, screen: Point) -> Self {
        self.screen = screen;
        self
    }

    /// Coordinates used for drag math: screen for touch, page for mouse.
    #[inline]
    pub const fn position(&self) -> Point {
        match self.kind {
            PointerKind::Touch => self.screen,
            PointerKind::Mouse(_) => self.page,
        }
    }

    /// `true` for touch input.
    #[inline]
    pub const fn is_touch(&self) -> bool {
        matches!(self.kind, PointerKind::Touch)
    }
}

/// Whether a handler acted on an event.
///
/// For moves and releases during a drag, hosts map `Consumed` to their
/// equivalent of preventing default handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Ignored,
    Consumed,
}

impl EventResult {
    #[inline]
    pub const fn is_consumed(self) -> bool {
        matches!(self, Self::Consumed)
    }
}
