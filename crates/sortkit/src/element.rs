#![forbid(unsafe_code)]

//! Rendered-element capabilities.
//!
//! The engine never touches a concrete rendering technology. Each item is
//! composed with an element that implements two traits:
//!
//! - [`Measured`]: reads current geometry and transition style.
//! - [`Surface`]: applies transforms and transition suspension.
//!
//! Reads happen in the layout-read phase or on demand; writes are only ever
//! issued from layout-write tasks (see [`sortkit_core::frame`]).
//!
//! [`MemoryElement`] is an in-memory implementation for headless hosts and
//! tests: geometry is set explicitly and writes are recorded.

use std::cell::RefCell;

use sortkit_core::{Point, Rect, Sides, Size, TargetId};
use web_time::Duration;

use crate::item::ItemFlags;

/// Geometry of a rendered element, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxMetrics {
    /// Border-box position relative to the offset parent.
    pub offset: Point,
    /// The element's own scroll offset.
    pub scroll: Point,
    /// Border-box position relative to the document.
    pub page_origin: Point,
    /// Border-box size.
    pub size: Size,
    pub margin: Sides,
    /// Table border spacing (horizontal, vertical), zero outside tables.
    pub border_spacing: Size,
}

impl BoxMetrics {
    /// Element at `(x, y)` with the given border-box size, no margins.
    #[must_use]
    pub const fn at(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            offset: Point::new(x, y),
            scroll: Point::ZERO,
            page_origin: Point::new(x, y),
            size: Size::new(width, height),
            margin: Sides::new(0.0, 0.0, 0.0, 0.0),
            border_spacing: Size::new(0.0, 0.0),
        }
    }

    #[must_use]
    pub const fn with_margin(mut self, margin: Sides) -> Self {
        self.margin = margin;
        self
    }

    /// Untransformed layout origin used to translate logical positions.
    #[inline]
    pub fn layout_origin(&self) -> Point {
        Point::new(self.offset.x - self.margin.left, self.offset.y)
    }

    /// Logical x/y measured from layout (scroll-adjusted on x).
    #[inline]
    pub fn logical_origin(&self) -> Point {
        Point::new(self.scroll.x + self.layout_origin().x, self.offset.y)
    }

    /// Horizontal footprint: border box, both margins, border spacing.
    pub fn outer_width(&self) -> f64 {
        self.size.width + self.margin.horizontal_sum() + self.border_spacing.width
    }

    /// Vertical footprint: border box, bottom margin, border spacing.
    ///
    /// Top margins collapse with the previous sibling's bottom margin, so
    /// only the bottom one counts toward the stride between items.
    pub fn outer_height(&self) -> f64 {
        self.size.height + self.margin.bottom + self.border_spacing.height
    }

    /// Page-space box including all margins, for pointer hit tests.
    pub fn hit_box(&self) -> Rect {
        Rect::from_origin(
            self.page_origin,
            Size::new(
                self.size.width + self.margin.horizontal_sum(),
                self.size.height + self.margin.vertical_sum(),
            ),
        )
    }
}

/// Transition style of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    /// Whether the transition applies to transforms (`all` or `transform`).
    pub animates_transform: bool,
    pub duration: Duration,
}

impl Transition {
    /// No animation.
    pub const NONE: Self = Self {
        animates_transform: false,
        duration: Duration::ZERO,
    };

    #[must_use]
    pub const fn transform(duration: Duration) -> Self {
        Self {
            animates_transform: true,
            duration,
        }
    }

    /// Interpret CSS-like `transition-property` / `transition-duration` values.
    ///
    /// The duration takes the first number in the string; a bare `s` unit
    /// means seconds, anything else milliseconds. Unparseable input yields
    /// zero.
    #[must_use]
    pub fn from_css(property: &str, duration: &str) -> Self {
        Self {
            animates_transform: property.contains("all") || property.contains("transform"),
            duration: parse_css_duration(duration),
        }
    }

    /// How long a drop must wait for the element to settle.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        if self.animates_transform {
            self.duration
        } else {
            Duration::ZERO
        }
    }
}

fn parse_css_duration(rule: &str) -> Duration {
    let Some(start) = rule.find(|c: char| c.is_ascii_digit() || c == '.') else {
        return Duration::ZERO;
    };
    let rest = &rule[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let Ok(value) = rest[..end].parse::<f64>() else {
        return Duration::ZERO;
    };
    let unit: String = rest[end..]
        .chars()
        .take_while(|c| matches!(c, 'm' | 's'))
        .collect();
    let millis = if unit == "s" { value * 1000.0 } else { value };
    if millis.is_finite() && millis > 0.0 {
        Duration::from_micros((millis * 1000.0).round() as u64)
    } else {
        Duration::ZERO
    }
}

/// 2D translation applied to reconcile logical and rendered positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    TranslateX(f64),
    TranslateY(f64),
    Translate(f64, f64),
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TranslateX(dx) => write!(f, "translateX({dx}px)"),
            Self::TranslateY(dy) => write!(f, "translateY({dy}px)"),
            Self::Translate(dx, dy) => write!(f, "translateX({dx}px) translateY({dy}px)"),
        }
    }
}

/// Read capability: current geometry of a rendered element.
pub trait Measured {
    /// Current box metrics, `None` once the element left the rendered tree.
    fn metrics(&self) -> Option<BoxMetrics>;

    /// Page offset of the scrollable container holding the element.
    fn container_offset(&self) -> Option<Point>;

    /// Current transition style.
    fn transition(&self) -> Transition;

    /// Whether `target` lies inside the region matched by `selector`.
    fn handle_contains(&self, selector: &str, target: TargetId) -> bool;

    fn is_attached(&self) -> bool {
        self.metrics().is_some()
    }
}

/// Write capability: styles applied to a rendered element.
pub trait Surface: Measured {
    /// Set (or clear) the translation transform.
    fn set_transform(&self, transform: Option<Transform>);

    /// Suspend (`true`) or restore (`false`) transition animation.
    fn set_transitions_suspended(&self, suspended: bool);

    /// State flags changed; hosts typically mirror them as style classes.
    fn flags_changed(&self, _flags: ItemFlags) {}
}

#[derive(Debug)]
struct MemoryState {
    metrics: BoxMetrics,
    attached: bool,
    container_offset: Point,
    transition: Transition,
    handles: Vec<(String, TargetId)>,
    transform: Option<Transform>,
    transitions_suspended: bool,
    flags: ItemFlags,
    transform_writes: usize,
}

/// In-memory [`Surface`] with explicitly set geometry.
#[derive(Debug)]
pub struct MemoryElement {
    state: RefCell<MemoryState>,
}

impl MemoryElement {
    #[must_use]
    pub fn new(metrics: BoxMetrics) -> Self {
        Self {
            state: RefCell::new(MemoryState {
                metrics,
                attached: true,
                container_offset: Point::ZERO,
                transition: Transition::NONE,
                handles: Vec::new(),
                transform: None,
                transitions_suspended: false,
                flags: ItemFlags::empty(),
                transform_writes: 0,
            }),
        }
    }

    /// Element at `(x, y)` sized `width` x `height`, without margins.
    #[must_use]
    pub fn at(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(BoxMetrics::at(x, y, width, height))
    }

    #[must_use]
    pub fn with_transition(self, transition: Transition) -> Self {
        self.state.borrow_mut().transition = transition;
        self
    }

    /// Register `target` as lying inside the `selector` handle region.
    #[must_use]
    pub fn with_handle(self, selector: &str, target: TargetId) -> Self {
        self.state
            .borrow_mut()
            .handles
            .push((selector.to_owned(), target));
        self
    }

    pub fn set_metrics(&self, metrics: BoxMetrics) {
        self.state.borrow_mut().metrics = metrics;
    }

    pub fn set_attached(&self, attached: bool) {
        self.state.borrow_mut().attached = attached;
    }

    /// Simulate scrolling of the containing scrollable ancestor.
    pub fn set_container_offset(&self, offset: Point) {
        self.state.borrow_mut().container_offset = offset;
    }

    #[must_use]
    pub fn transform(&self) -> Option<Transform> {
        self.state.borrow().transform
    }

    /// Number of `set_transform` calls received.
    #[must_use]
    pub fn transform_writes(&self) -> usize {
        self.state.borrow().transform_writes
    }

    #[must_use]
    pub fn transitions_suspended(&self) -> bool {
        self.state.borrow().transitions_suspended
    }

    /// Last flags reported through [`Surface::flags_changed`].
    #[must_use]
    pub fn flags(&self) -> ItemFlags {
        self.state.borrow().flags
    }
}

impl Measured for MemoryElement {
    fn metrics(&self) -> Option<BoxMetrics> {
        let state = self.state.borrow();
        state.attached.then_some(state.metrics)
    }

    fn container_offset(&self) -> Option<Point> {
        let state = self.state.borrow();
        state.attached.then_some(state.container_offset)
    }

    fn transition(&self) -> Transition {
        self.state.borrow().transition
    }

    fn handle_contains(&self, selector: &str, target: TargetId) -> bool {
        self.state
            .borrow()
            .handles
            .iter()
            .any(|(s, t)| s == selector && *t == target)
    }
}

impl Surface for MemoryElement {
    fn set_transform(&self, transform: Option<Transform>) {
        let mut state = self.state.borrow_mut();
        state.transform = transform;
        state.transform_writes += 1;
    }

    fn set_transitions_suspended(&self, suspended: bool) {
        self.state.borrow_mut().transitions_suspended = suspended;
    }

    fn flags_changed(&self, flags: ItemFlags) {
        self.state.borrow_mut().flags = flags;
    }
}
