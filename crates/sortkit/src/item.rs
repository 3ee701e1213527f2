#![forbid(unsafe_code)]

//! Draggable list item.
//!
//! [`SortableItem`] composes a rendered element ([`Surface`]) with the
//! pointer state machine that turns presses into drags and drags into a
//! committed reorder.
//!
//! # State Machine
//!
//! Gesture phases (see [`GesturePhase`]):
//!
//! ```text
//! Idle --down--> Pressed --next tick, no move/up--> Primed --move--> Dragging
//!                   |                                  |                |
//!                   +--move/up: back to Idle           +--up: Idle      +--up: drop
//! ```
//!
//! State flags (see [`ItemFlags`]):
//!
//! ```text
//! {} --drag start--> DRAGGING --drop--> DROPPING --settled--> WAS_DROPPED
//! ```
//!
//! `WAS_DROPPED` stays set until the owning group's commit clears it.
//!
//! # Invariants
//!
//! 1. A drag never starts from `Dragging`, nor while another member of the
//!    same group is busy. An item stays busy from its drop until the
//!    scheduled completion has committed, even if a press cleared its flags.
//! 2. Releasing before the deferred long-press check cancels the drag; it is
//!    the only cancellation path. A started drag always drops.
//! 3. Setting `x`/`y` to the cached value is a no-op; a changed value
//!    schedules at most one position reconciliation per layout-write phase.
//! 4. Operations on a detached element (freeze, reset, thaw, drop, position
//!    application) are silent no-ops.
//!
//! # Host integration
//!
//! Hosts forward element-level presses to [`SortableItem::pointer_down`],
//! window-level movement and releases to [`SortableItem::pointer_move`] /
//! [`SortableItem::pointer_up`] (or through
//! [`SortableGroup::dispatch_pointer_move`]), and clicks to
//! [`SortableItem::click`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use sortkit_core::{
    Axis, EventResult, FrameScheduler, Modifiers, MouseButton, Point, PointerEvent, PointerKind,
    Throttle,
};
use tracing::{debug, trace};
use web_time::Duration;

use crate::config::{GroupConfig, ItemConfig};
use crate::drag::{DragHandler, DragStep};
use crate::element::{Surface, Transform};
use crate::group::{SortableGroup, WeakGroup};

/// Pointer Y (page units) below which a drop is treated as leaving the list.
///
/// Dropping near the top of the page is assumed to target an external drop
/// zone; the item is then removed rather than returned, so the fly-back
/// animation is skipped.
pub const ABOVE_THE_FOLD_THRESHOLD: f64 = 200.0;

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

bitflags! {
    /// Interaction state of an item.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ItemFlags: u8 {
        /// Following the pointer.
        const DRAGGING         = 0b0001;
        /// Released, waiting for the drop transition to settle.
        const DROPPING         = 0b0010;
        /// Completed a drop; cleared by the next group commit.
        const WAS_DROPPED      = 0b0100;
        /// Under the pointer during a no-slide drag.
        const INSERT_HIGHLIGHT = 0b1000;
        /// Dragging or dropping.
        const BUSY = Self::DRAGGING.bits() | Self::DROPPING.bits();
    }
}

/// Public view of the pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    /// Pressed; the long-press check has not run yet.
    Pressed,
    /// Long-press confirmed; the next move starts the drag.
    Primed,
    Dragging,
}

#[derive(Debug, Clone, Copy)]
enum Gesture {
    Idle,
    Pressed {
        seq: u64,
        event: PointerEvent,
        interrupted: bool,
    },
    Primed,
    Dragging(DragHandler),
}

type ModelCallback<M> = Rc<dyn Fn(&M)>;
type PointCallback = Rc<dyn Fn(Point)>;

pub(crate) struct ItemInner<M, G> {
    id: u64,
    model: M,
    element: Rc<dyn Surface>,
    scheduler: Rc<dyn FrameScheduler>,
    config: ItemConfig,
    group: Option<WeakGroup<M, G>>,
    x: Option<f64>,
    y: Option<f64>,
    flags: ItemFlags,
    drag_y: Option<f64>,
    gesture: Gesture,
    press_seq: u64,
    apply_scheduled: bool,
    suppress_click: bool,
    frozen_for_drop: bool,
    drop_pending: bool,
    group_throttle: Throttle,
    drag_throttle: Throttle,
    on_drag_start: Option<ModelCallback<M>>,
    on_drag: Option<PointCallback>,
    on_drag_stop: Option<ModelCallback<M>>,
}

/// A draggable member of a [`SortableGroup`].
///
/// Cloning creates a new handle to the same item.
pub struct SortableItem<M, G = ()> {
    inner: Rc<RefCell<ItemInner<M, G>>>,
}

impl<M, G> Clone for SortableItem<M, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M: std::fmt::Debug, G> std::fmt::Debug for SortableItem<M, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SortableItem")
            .field("id", &inner.id)
            .field("model", &inner.model)
            .field("x", &inner.x)
            .field("y", &inner.y)
            .field("flags", &inner.flags)
            .finish()
    }
}

impl<M, G> SortableItem<M, G> {
    /// Whether both handles refer to the same item.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn downgrade(&self) -> Weak<RefCell<ItemInner<M, G>>> {
        Rc::downgrade(&self.inner)
    }

    fn from_weak(weak: &Weak<RefCell<ItemInner<M, G>>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Stable identifier, used in logs.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    #[must_use]
    pub fn flags(&self) -> ItemFlags {
        self.inner.borrow().flags
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.flags().contains(ItemFlags::DRAGGING)
    }

    #[must_use]
    pub fn is_dropping(&self) -> bool {
        self.flags().contains(ItemFlags::DROPPING)
    }

    /// Dragging, dropping, or dropped with the completion still pending.
    ///
    /// A press on a dropping item clears its flags eagerly, but the item
    /// stays busy until the scheduled completion has committed.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        let inner = self.inner.borrow();
        inner.flags.intersects(ItemFlags::BUSY) || inner.drop_pending
    }

    /// A drop has been scheduled and its completion has not run yet.
    #[must_use]
    pub fn is_drop_pending(&self) -> bool {
        self.inner.borrow().drop_pending
    }

    #[must_use]
    pub fn was_dropped(&self) -> bool {
        self.flags().contains(ItemFlags::WAS_DROPPED)
    }

    #[must_use]
    pub fn insert_highlight(&self) -> bool {
        self.flags().contains(ItemFlags::INSERT_HIGHLIGHT)
    }

    #[must_use]
    pub fn gesture_phase(&self) -> GesturePhase {
        match self.inner.borrow().gesture {
            Gesture::Idle => GesturePhase::Idle,
            Gesture::Pressed { .. } => GesturePhase::Pressed,
            Gesture::Primed => GesturePhase::Primed,
            Gesture::Dragging(_) => GesturePhase::Dragging,
        }
    }

    /// Last raw pointer Y recorded during a free drag.
    #[must_use]
    pub fn drag_y(&self) -> Option<f64> {
        self.inner.borrow().drag_y
    }

    #[must_use]
    pub fn config(&self) -> ItemConfig {
        self.inner.borrow().config.clone()
    }

    /// Modify state flags, notifying the element when they change.
    pub(crate) fn update_flags(&self, f: impl FnOnce(&mut ItemFlags)) {
        let (element, flags) = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.flags;
            f(&mut inner.flags);
            if inner.flags == before {
                return;
            }
            (Rc::clone(&inner.element), inner.flags)
        };
        element.flags_changed(flags);
    }

    pub(crate) fn set_insert_highlight(&self, on: bool) {
        self.update_flags(|flags| flags.set(ItemFlags::INSERT_HIGHLIGHT, on));
    }

    /// Horizontal footprint used as the stride in horizontal groups.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.element().metrics().map_or(0.0, |m| m.outer_width())
    }

    /// Vertical footprint used as the stride in vertical groups.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.element().metrics().map_or(0.0, |m| m.outer_height())
    }

    #[must_use]
    pub fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.width(),
            Axis::Y => self.height(),
        }
    }

    /// Whether `point` (page coordinates) lies strictly inside the item.
    #[must_use]
    pub fn hit_test(&self, point: Point) -> bool {
        self.element()
            .metrics()
            .is_some_and(|m| m.hit_box().contains(point))
    }

    /// Whether a drop looks like a removal to an external target.
    ///
    /// True while dropping (or once dropped) when the last recorded raw
    /// pointer Y is above [`ABOVE_THE_FOLD_THRESHOLD`]. Only free drags
    /// record a pointer Y.
    #[must_use]
    pub fn is_above_the_fold(&self) -> bool {
        let inner = self.inner.borrow();
        inner
            .flags
            .intersects(ItemFlags::DROPPING | ItemFlags::WAS_DROPPED)
            && inner.drag_y.is_some_and(|y| y < ABOVE_THE_FOLD_THRESHOLD)
    }

    fn element(&self) -> Rc<dyn Surface> {
        Rc::clone(&self.inner.borrow().element)
    }

    fn scheduler(&self) -> Rc<dyn FrameScheduler> {
        Rc::clone(&self.inner.borrow().scheduler)
    }

    /// Suspend transition animation.
    pub fn freeze(&self) {
        let element = self.element();
        if !element.is_attached() {
            return;
        }
        element.set_transitions_suspended(true);
    }

    /// Forget cached positions and clear the transform, so the next read
    /// measures fresh layout.
    pub fn reset(&self) {
        let element = self.element();
        if !element.is_attached() {
            return;
        }
        {
            let mut inner = self.inner.borrow_mut();
            inner.x = None;
            inner.y = None;
        }
        element.set_transform(None);
    }

    /// Restore transition animation.
    pub fn thaw(&self) {
        let element = self.element();
        if !element.is_attached() {
            return;
        }
        element.set_transitions_suspended(false);
    }

    /// Handle a click on the element. Returns `Consumed` for the one click
    /// that follows a drop, which hosts must swallow.
    pub fn click(&self) -> EventResult {
        let mut inner = self.inner.borrow_mut();
        if std::mem::take(&mut inner.suppress_click) {
            EventResult::Consumed
        } else {
            EventResult::Ignored
        }
    }
}

impl<M: Clone + 'static, G: Clone + 'static> SortableItem<M, G> {
    /// Create an item for `model`, rendered by `element`.
    pub fn new(model: M, element: Rc<dyn Surface>, scheduler: Rc<dyn FrameScheduler>) -> Self {
        let config = ItemConfig::default();
        let interval = config.update_interval();
        Self {
            inner: Rc::new(RefCell::new(ItemInner {
                id: NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed),
                model,
                element,
                scheduler,
                config,
                group: None,
                x: None,
                y: None,
                flags: ItemFlags::empty(),
                drag_y: None,
                gesture: Gesture::Idle,
                press_seq: 0,
                apply_scheduled: false,
                suppress_click: false,
                frozen_for_drop: false,
                drop_pending: false,
                group_throttle: Throttle::new(interval),
                drag_throttle: Throttle::new(interval),
                on_drag_start: None,
                on_drag: None,
                on_drag_stop: None,
            })),
        }
    }

    #[must_use]
    pub fn with_config(self, config: ItemConfig) -> Self {
        self.set_config(config);
        self
    }

    #[must_use]
    pub fn with_group(self, group: &SortableGroup<M, G>) -> Self {
        self.set_group(Some(group));
        self
    }

    /// Fired when a drag starts, with this item's model.
    #[must_use]
    pub fn on_drag_start(self, f: impl Fn(&M) + 'static) -> Self {
        self.inner.borrow_mut().on_drag_start = Some(Rc::new(f));
        self
    }

    /// Fired (throttled) during free drags with the raw pointer position.
    #[must_use]
    pub fn on_drag(self, f: impl Fn(Point) + 'static) -> Self {
        self.inner.borrow_mut().on_drag = Some(Rc::new(f));
        self
    }

    /// Fired when the drop transition completes, with this item's model.
    #[must_use]
    pub fn on_drag_stop(self, f: impl Fn(&M) + 'static) -> Self {
        self.inner.borrow_mut().on_drag_stop = Some(Rc::new(f));
        self
    }

    pub fn set_config(&self, config: ItemConfig) {
        let mut inner = self.inner.borrow_mut();
        let interval = config.update_interval();
        inner.group_throttle.set_interval(interval);
        inner.drag_throttle.set_interval(interval);
        inner.config = config;
    }

    /// Point the item at its owning group. Membership is established by
    /// [`did_insert`](Self::did_insert).
    pub fn set_group(&self, group: Option<&SortableGroup<M, G>>) {
        self.inner.borrow_mut().group = group.map(SortableGroup::downgrade);
    }

    #[must_use]
    pub fn group(&self) -> Option<SortableGroup<M, G>> {
        self.inner.borrow().group.as_ref().and_then(WeakGroup::upgrade)
    }

    #[must_use]
    pub fn model(&self) -> M {
        self.inner.borrow().model.clone()
    }

    /// Axis settings in effect: the group's, or free movement without one.
    fn axis_config(&self) -> GroupConfig {
        self.group().map_or_else(
            || GroupConfig::default().with_constrain_direction(false),
            |group| group.config(),
        )
    }

    // -----------------------------------------------------------------------
    // Position
    // -----------------------------------------------------------------------

    /// Horizontal position, measured from layout on first read.
    pub fn x(&self) -> f64 {
        self.coordinate(Axis::X)
    }

    /// Vertical position relative to the offset parent.
    pub fn y(&self) -> f64 {
        self.coordinate(Axis::Y)
    }

    pub fn coordinate(&self, axis: Axis) -> f64 {
        let mut inner = self.inner.borrow_mut();
        let cached = match axis {
            Axis::X => inner.x,
            Axis::Y => inner.y,
        };
        if let Some(value) = cached {
            return value;
        }
        let Some(metrics) = inner.element.metrics() else {
            return 0.0;
        };
        let value = metrics.logical_origin().along(axis);
        match axis {
            Axis::X => inner.x = Some(value),
            Axis::Y => inner.y = Some(value),
        }
        value
    }

    pub fn set_x(&self, value: f64) {
        self.set_coordinate(Axis::X, value);
    }

    pub fn set_y(&self, value: f64) {
        self.set_coordinate(Axis::Y, value);
    }

    pub fn set_coordinate(&self, axis: Axis, value: f64) {
        let schedule = {
            let mut inner = self.inner.borrow_mut();
            let slot = match axis {
                Axis::X => &mut inner.x,
                Axis::Y => &mut inner.y,
            };
            if *slot == Some(value) {
                return;
            }
            *slot = Some(value);
            !std::mem::replace(&mut inner.apply_scheduled, true)
        };
        if schedule {
            let weak = self.downgrade();
            self.scheduler().schedule_layout_write(Box::new(move || {
                if let Some(item) = Self::from_weak(&weak) {
                    item.apply_position();
                }
            }));
        }
    }

    /// Translate the element from its layout position to the logical one.
    fn apply_position(&self) {
        let element = {
            let mut inner = self.inner.borrow_mut();
            inner.apply_scheduled = false;
            Rc::clone(&inner.element)
        };
        let Some(metrics) = element.metrics() else {
            return;
        };
        let config = self.axis_config();
        let origin = metrics.layout_origin();
        let transform = if config.constrain_direction {
            match config.direction {
                Axis::X => Transform::TranslateX(self.x() - origin.x),
                Axis::Y => Transform::TranslateY(self.y() - origin.y),
            }
        } else {
            Transform::Translate(self.x() - origin.x, self.y() - origin.y)
        };
        trace!(target: "sortkit.item", item = self.id(), %transform, "position applied");
        element.set_transform(Some(transform));
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// The element entered the rendered tree: join the group after layout.
    pub fn did_insert(&self) {
        let weak = self.downgrade();
        self.scheduler().schedule_layout_read(Box::new(move || {
            if let Some(item) = Self::from_weak(&weak)
                && let Some(group) = item.group()
            {
                group.register_item(&item);
            }
        }));
    }

    /// The element is leaving the rendered tree: cancel throttled work and
    /// leave the group after layout.
    pub fn will_remove(&self) {
        self.cancel_throttles();
        let weak = self.downgrade();
        self.scheduler().schedule_layout_read(Box::new(move || {
            if let Some(item) = Self::from_weak(&weak)
                && let Some(group) = item.group()
            {
                group.deregister_item(&item);
            }
        }));
    }

    fn cancel_throttles(&self) {
        let inner = self.inner.borrow();
        inner.group_throttle.cancel(inner.scheduler.as_ref());
        inner.drag_throttle.cancel(inner.scheduler.as_ref());
    }

    // -----------------------------------------------------------------------
    // Pointer input
    // -----------------------------------------------------------------------

    /// Press on the element. Returns `Consumed` when the press may become a
    /// drag; hosts should still let the press through.
    pub fn pointer_down(&self, event: &PointerEvent) -> EventResult {
        if let PointerKind::Mouse(button) = event.kind
            && (button != MouseButton::Primary || event.modifiers.contains(Modifiers::CTRL))
        {
            return EventResult::Ignored;
        }
        if matches!(self.inner.borrow().gesture, Gesture::Dragging(_)) {
            trace!(target: "sortkit.item", item = self.id(), "press ignored during drag");
            return EventResult::Ignored;
        }

        self.update_flags(|flags| flags.remove(ItemFlags::BUSY));
        let seq = {
            let mut inner = self.inner.borrow_mut();
            inner.press_seq += 1;
            inner.gesture = Gesture::Pressed {
                seq: inner.press_seq,
                event: *event,
                interrupted: false,
            };
            inner.press_seq
        };

        let weak = self.downgrade();
        self.scheduler().schedule_next_tick(Box::new(move || {
            if let Some(item) = Self::from_weak(&weak) {
                item.long_press_check(seq);
            }
        }));
        EventResult::Consumed
    }

    /// Pointer movement anywhere in the window.
    pub fn pointer_move(&self, event: &PointerEvent) -> EventResult {
        let handler = {
            let mut inner = self.inner.borrow_mut();
            match &mut inner.gesture {
                Gesture::Idle => return EventResult::Ignored,
                Gesture::Pressed { interrupted, .. } => {
                    *interrupted = true;
                    return EventResult::Ignored;
                }
                Gesture::Primed => None,
                Gesture::Dragging(handler) => Some(*handler),
            }
        };
        match handler {
            None => self.start_drag(event),
            Some(handler) => self.drag(&handler, event),
        }
    }

    /// Pointer release anywhere in the window.
    pub fn pointer_up(&self, _event: &PointerEvent) -> EventResult {
        let dragging = {
            let mut inner = self.inner.borrow_mut();
            match &mut inner.gesture {
                Gesture::Idle => return EventResult::Ignored,
                Gesture::Pressed { interrupted, .. } => {
                    *interrupted = true;
                    return EventResult::Ignored;
                }
                Gesture::Primed | Gesture::Dragging(_) => {}
            }
            let dragging = matches!(inner.gesture, Gesture::Dragging(_));
            inner.gesture = Gesture::Idle;
            dragging
        };
        if !dragging {
            return EventResult::Ignored;
        }
        self.drop_item();
        EventResult::Consumed
    }

    /// Deferred check after a press: no movement and no release since means
    /// a deliberate hold rather than a click.
    fn long_press_check(&self, seq: u64) {
        let event = {
            let mut inner = self.inner.borrow_mut();
            match inner.gesture {
                Gesture::Pressed {
                    seq: current,
                    event,
                    interrupted,
                } if current == seq => {
                    if interrupted {
                        inner.gesture = Gesture::Idle;
                        return;
                    }
                    event
                }
                _ => return,
            }
        };
        self.prime(&event);
    }

    fn prime(&self, event: &PointerEvent) {
        let mut inner = self.inner.borrow_mut();
        if let Some(handle) = &inner.config.handle
            && !inner.element.handle_contains(handle, event.target)
        {
            debug!(target: "sortkit.item", item = inner.id, handle = %handle, "press outside drag handle");
            inner.gesture = Gesture::Idle;
            return;
        }
        inner.gesture = Gesture::Primed;
    }

    fn start_drag(&self, event: &PointerEvent) -> EventResult {
        let element = self.element();
        let group = self.group();
        let refused = if self.is_busy() {
            Some("item busy")
        } else if !element.is_attached() {
            Some("element detached")
        } else if group.as_ref().is_some_and(|g| g.has_busy_item_other_than(self)) {
            Some("group busy")
        } else {
            None
        };
        if let Some(reason) = refused {
            debug!(target: "sortkit.item", item = self.id(), reason, "drag refused");
            self.inner.borrow_mut().gesture = Gesture::Idle;
            return EventResult::Ignored;
        }

        let config = self.axis_config();
        let origin = Point::new(self.x(), self.y());
        let scroll = element.container_offset().unwrap_or(Point::ZERO);
        let handler = DragHandler::new(config, event.position(), origin, scroll);
        {
            let mut inner = self.inner.borrow_mut();
            inner.drag_y = None;
            inner.gesture = Gesture::Dragging(handler);
        }

        if let Some(group) = &group {
            group.prepare();
        }
        self.update_flags(|flags| flags.insert(ItemFlags::DRAGGING));
        debug!(
            target: "sortkit.item",
            item = self.id(),
            axis = config.direction.as_str(),
            constrained = config.constrain_direction,
            "drag started"
        );

        let (callback, model) = {
            let inner = self.inner.borrow();
            (inner.on_drag_start.clone(), inner.model.clone())
        };
        if let Some(callback) = callback {
            callback(&model);
        }
        EventResult::Consumed
    }

    fn drag(&self, handler: &DragHandler, event: &PointerEvent) -> EventResult {
        let element = self.element();
        let scroll = element
            .container_offset()
            .unwrap_or_else(|| handler.scroll_origin());
        let pointer = event.position();

        match handler.step(pointer, scroll) {
            DragStep::Axis { axis, value } => self.set_coordinate(axis, value),
            DragStep::Free { position, pointer } => {
                self.set_x(position.x);
                self.set_y(position.y);
                let on_drag = {
                    let mut inner = self.inner.borrow_mut();
                    inner.drag_y = Some(pointer.y);
                    inner.on_drag.clone()
                };
                if let Some(callback) = on_drag {
                    let inner = self.inner.borrow();
                    inner
                        .drag_throttle
                        .call(inner.scheduler.as_ref(), move || callback(pointer));
                }
            }
        }

        let group = self.inner.borrow().group.clone();
        if let Some(group) = group {
            let inner = self.inner.borrow();
            inner.group_throttle.call(inner.scheduler.as_ref(), move || {
                if let Some(group) = group.upgrade() {
                    group.update(Some(pointer));
                }
            });
        }
        EventResult::Consumed
    }

    fn drop_item(&self) {
        let element = self.element();
        if !element.is_attached() {
            self.update_flags(|flags| flags.remove(ItemFlags::DRAGGING));
            debug!(target: "sortkit.item", item = self.id(), "drop on detached element");
            return;
        }
        self.cancel_throttles();
        {
            let mut inner = self.inner.borrow_mut();
            inner.suppress_click = true;
            inner.drop_pending = true;
        }
        self.update_flags(|flags| {
            flags.remove(ItemFlags::DRAGGING);
            flags.insert(ItemFlags::DROPPING);
        });

        if let Some(group) = self.group() {
            group.update(None);
        }

        let frozen = self.is_above_the_fold();
        if frozen {
            self.freeze();
        }
        self.inner.borrow_mut().frozen_for_drop = frozen;
        debug!(target: "sortkit.item", item = self.id(), above_the_fold = frozen, "dropped");

        let weak = self.downgrade();
        let scheduler = self.scheduler();
        self.scheduler().schedule_next_tick(Box::new(move || {
            let Some(item) = Self::from_weak(&weak) else {
                return;
            };
            let delay = item.settle_delay();
            let weak = item.downgrade();
            scheduler.schedule_later(
                delay,
                Box::new(move || {
                    if let Some(item) = Self::from_weak(&weak) {
                        item.complete();
                    }
                }),
            );
        }));
    }

    /// Time to wait for the drop animation. Frozen items do not animate.
    fn settle_delay(&self) -> Duration {
        if self.inner.borrow().frozen_for_drop {
            return Duration::ZERO;
        }
        self.element().transition().settle_delay()
    }

    fn complete(&self) {
        let (callback, model) = {
            let inner = self.inner.borrow();
            (inner.on_drag_stop.clone(), inner.model.clone())
        };
        if let Some(callback) = callback {
            callback(&model);
        }

        self.update_flags(|flags| {
            flags.remove(ItemFlags::DROPPING);
            flags.insert(ItemFlags::WAS_DROPPED);
        });
        self.inner.borrow_mut().drop_pending = false;
        debug!(target: "sortkit.item", item = self.id(), "drop settled");

        if let Some(group) = self.group() {
            group.commit();
        }

        let frozen = std::mem::take(&mut self.inner.borrow_mut().frozen_for_drop);
        if frozen {
            self.thaw();
        }
    }
}
