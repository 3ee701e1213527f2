#![forbid(unsafe_code)]

//! Sortable container.
//!
//! A [`SortableGroup`] tracks its registered items, lays the non-dragged
//! ones out contiguously while a drag is in progress, and reports the new
//! order once the dragged item settles.
//!
//! # Layout
//!
//! [`update`](SortableGroup::update) walks the items in ascending position
//! along the group axis. A cursor starts at the position stashed by
//! [`prepare`](SortableGroup::prepare) (or the current minimum) and
//! advances by each item's extent, the dragged item included. Every item
//! except the dragged one is moved to the cursor.
//!
//! # Commit
//!
//! [`commit`](SortableGroup::commit) reports the order to the host, then
//! schedules the visual hand-off:
//!
//! 1. freeze every item (layout-write phase) so the host can re-render in
//!    the new order without animation,
//! 2. reset every item (layout-read phase) so positions are re-measured,
//! 3. thaw every item in the following turn.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use sortkit_core::{Axis, EventResult, FrameScheduler, Point, PointerEvent};
use tracing::{debug, debug_span, trace};

use crate::config::GroupConfig;
use crate::item::{ItemFlags, SortableItem};

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// New order reported by [`SortableGroup::commit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Change<M, G = ()> {
    /// The group carries a model of its own.
    WithModel {
        group: G,
        order: Vec<M>,
        dragged: Option<M>,
    },
    Order { order: Vec<M>, dragged: Option<M> },
}

impl<M, G> Change<M, G> {
    /// Item models in their new order.
    #[must_use]
    pub fn order(&self) -> &[M] {
        match self {
            Self::WithModel { order, .. } | Self::Order { order, .. } => order,
        }
    }

    /// Model of the item whose drop caused the commit, if any.
    #[must_use]
    pub fn dragged(&self) -> Option<&M> {
        match self {
            Self::WithModel { dragged, .. } | Self::Order { dragged, .. } => dragged.as_ref(),
        }
    }

    #[must_use]
    pub fn group_model(&self) -> Option<&G> {
        match self {
            Self::WithModel { group, .. } => Some(group),
            Self::Order { .. } => None,
        }
    }
}

type ChangeCallback<M, G> = Rc<dyn Fn(Change<M, G>)>;

struct GroupInner<M, G> {
    id: u64,
    config: GroupConfig,
    model: Option<G>,
    items: Vec<SortableItem<M, G>>,
    stashed_origin: Option<f64>,
    scheduler: Rc<dyn FrameScheduler>,
    on_change: Option<ChangeCallback<M, G>>,
}

/// Container of sortable items.
///
/// Cloning creates a new handle to the same group.
pub struct SortableGroup<M, G = ()> {
    inner: Rc<RefCell<GroupInner<M, G>>>,
}

/// Non-owning handle to a [`SortableGroup`], held by its items.
pub struct WeakGroup<M, G = ()> {
    inner: Weak<RefCell<GroupInner<M, G>>>,
}

impl<M, G> Clone for SortableGroup<M, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M, G> Clone for WeakGroup<M, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<M, G> WeakGroup<M, G> {
    #[must_use]
    pub fn upgrade(&self) -> Option<SortableGroup<M, G>> {
        self.inner.upgrade().map(|inner| SortableGroup { inner })
    }
}

impl<M, G> std::fmt::Debug for SortableGroup<M, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SortableGroup")
            .field("id", &inner.id)
            .field("config", &inner.config)
            .field("items", &inner.items.len())
            .field("stashed_origin", &inner.stashed_origin)
            .finish()
    }
}

impl<M, G> SortableGroup<M, G> {
    #[must_use]
    pub fn new(config: GroupConfig, scheduler: Rc<dyn FrameScheduler>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(GroupInner {
                id: NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed),
                config,
                model: None,
                items: Vec::new(),
                stashed_origin: None,
                scheduler,
                on_change: None,
            })),
        }
    }

    /// Attach a model reported alongside every change.
    #[must_use]
    pub fn with_model(self, model: G) -> Self {
        self.inner.borrow_mut().model = Some(model);
        self
    }

    /// Host callback receiving each committed order.
    #[must_use]
    pub fn on_change(self, f: impl Fn(Change<M, G>) + 'static) -> Self {
        self.inner.borrow_mut().on_change = Some(Rc::new(f));
        self
    }

    pub fn set_model(&self, model: Option<G>) {
        self.inner.borrow_mut().model = model;
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakGroup<M, G> {
        WeakGroup {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    #[must_use]
    pub fn config(&self) -> GroupConfig {
        self.inner.borrow().config
    }

    /// Replace the configuration. Drags already in progress keep the axis
    /// settings they started with.
    pub fn set_config(&self, config: GroupConfig) {
        self.inner.borrow_mut().config = config;
    }

    #[must_use]
    pub fn direction(&self) -> Axis {
        self.inner.borrow().config.direction
    }

    /// Add `item`. Registering a member again is a no-op.
    pub fn register_item(&self, item: &SortableItem<M, G>) {
        let mut inner = self.inner.borrow_mut();
        if inner.items.iter().any(|i| i.ptr_eq(item)) {
            return;
        }
        inner.items.push(item.clone());
        trace!(target: "sortkit.group", group = inner.id, items = inner.items.len(), "item registered");
    }

    /// Remove `item`. Removing a non-member is a no-op.
    pub fn deregister_item(&self, item: &SortableItem<M, G>) {
        let mut inner = self.inner.borrow_mut();
        inner.items.retain(|i| !i.ptr_eq(item));
        trace!(target: "sortkit.group", group = inner.id, items = inner.items.len(), "item deregistered");
    }

    #[must_use]
    pub fn contains(&self, item: &SortableItem<M, G>) -> bool {
        self.inner.borrow().items.iter().any(|i| i.ptr_eq(item))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    /// Registered items in registration order.
    #[must_use]
    pub fn items(&self) -> Vec<SortableItem<M, G>> {
        self.inner.borrow().items.clone()
    }

    /// Whether any member is dragging or dropping.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.items().iter().any(SortableItem::is_busy)
    }

    pub(crate) fn has_busy_item_other_than(&self, item: &SortableItem<M, G>) -> bool {
        self.items()
            .iter()
            .any(|other| !other.ptr_eq(item) && other.is_busy())
    }
}

impl<M: Clone + 'static, G: Clone + 'static> SortableGroup<M, G> {
    #[must_use]
    pub fn model(&self) -> Option<G> {
        self.inner.borrow().model.clone()
    }

    /// Items in ascending position along the group axis. Ties keep
    /// registration order.
    #[must_use]
    pub fn sorted_items(&self) -> Vec<SortableItem<M, G>> {
        let axis = self.direction();
        let mut keyed: Vec<(f64, SortableItem<M, G>)> = self
            .items()
            .into_iter()
            .map(|item| (item.coordinate(axis), item))
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        keyed.into_iter().map(|(_, item)| item).collect()
    }

    /// Position of the first sorted item, zero for an empty group.
    #[must_use]
    pub fn item_position(&self) -> f64 {
        let axis = self.direction();
        self.sorted_items()
            .first()
            .map_or(0.0, |item| item.coordinate(axis))
    }

    /// Stash the current origin so layout during the drag starts from it.
    pub fn prepare(&self) {
        let origin = self.item_position();
        let mut inner = self.inner.borrow_mut();
        inner.stashed_origin = Some(origin);
        debug!(target: "sortkit.group", group = inner.id, origin, "drag prepared");
    }

    /// Relayout during a drag.
    ///
    /// `pointer` is the raw pointer position while the drag is live and
    /// `None` on release. No-slide groups only move the insert highlight
    /// while a pointer is present.
    pub fn update(&self, pointer: Option<Point>) {
        let config = self.config();
        let items = self.sorted_items();

        if config.no_slide {
            if let Some(pointer) = pointer {
                for item in &items {
                    item.set_insert_highlight(item.hit_test(pointer) && !item.is_dragging());
                }
                return;
            }
            for item in &items {
                item.set_insert_highlight(false);
            }
        }

        let axis = config.direction;
        let stashed = self.inner.borrow().stashed_origin;
        let mut cursor = stashed
            .unwrap_or_else(|| items.first().map_or(0.0, |item| item.coordinate(axis)));
        for item in &items {
            if !item.is_dragging() {
                item.set_coordinate(axis, cursor);
            }
            cursor += item.extent(axis);
        }
        trace!(target: "sortkit.group", group = self.id(), items = items.len(), "relayout");
    }

    /// Report the current order to the host and hand the items back to
    /// layout.
    pub fn commit(&self) {
        let items = self.sorted_items();
        let (id, scheduler) = {
            let inner = self.inner.borrow();
            (inner.id, Rc::clone(&inner.scheduler))
        };
        let _span = debug_span!(target: "sortkit.group", "sortable.commit", group = id, items = items.len())
            .entered();

        let mut dragged = None;
        for item in &items {
            if item.was_dropped() {
                item.update_flags(|flags| flags.remove(ItemFlags::WAS_DROPPED));
                dragged = Some(item.model());
            }
        }
        self.inner.borrow_mut().stashed_origin = None;

        let frozen = items.clone();
        scheduler.schedule_layout_write(Box::new(move || {
            for item in &frozen {
                item.freeze();
            }
        }));
        let reset = items.clone();
        scheduler.schedule_layout_read(Box::new(move || {
            for item in &reset {
                item.reset();
            }
        }));
        let thawed = items.clone();
        let next = Rc::clone(&scheduler);
        scheduler.schedule_next_tick(Box::new(move || {
            next.schedule_layout_write(Box::new(move || {
                for item in &thawed {
                    item.thaw();
                }
            }));
        }));

        let order: Vec<M> = items.iter().map(SortableItem::model).collect();
        let (model, callback) = {
            let inner = self.inner.borrow();
            (inner.model.clone(), inner.on_change.clone())
        };
        debug!(
            target: "sortkit.group",
            group = id,
            items = order.len(),
            dragged = dragged.is_some(),
            "order committed"
        );
        let change = match model {
            Some(group) => Change::WithModel {
                group,
                order,
                dragged,
            },
            None => Change::Order { order, dragged },
        };
        if let Some(callback) = callback {
            callback(change);
        }
    }

    /// Forward window-level pointer movement to every member.
    pub fn dispatch_pointer_move(&self, event: &PointerEvent) -> EventResult {
        let mut result = EventResult::Ignored;
        for item in self.items() {
            if item.pointer_move(event).is_consumed() {
                result = EventResult::Consumed;
            }
        }
        result
    }

    /// Forward a window-level pointer release to every member.
    pub fn dispatch_pointer_up(&self, event: &PointerEvent) -> EventResult {
        let mut result = EventResult::Ignored;
        for item in self.items() {
            if item.pointer_up(event).is_consumed() {
                result = EventResult::Consumed;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{MemoryElement, Transform};
    use sortkit_core::FrameLoop;
    use std::sync::{Arc, Mutex};

    struct Rig {
        frame: Rc<FrameLoop>,
        group: SortableGroup<&'static str, &'static str>,
        changes: Rc<RefCell<Vec<Change<&'static str, &'static str>>>>,
    }

    fn rig(config: GroupConfig) -> Rig {
        let frame = Rc::new(FrameLoop::new());
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        let group = SortableGroup::new(config, frame.clone())
            .on_change(move |change| sink.borrow_mut().push(change));
        Rig {
            frame,
            group,
            changes,
        }
    }

    impl Rig {
        fn add(
            &self,
            model: &'static str,
            element: MemoryElement,
        ) -> (SortableItem<&'static str, &'static str>, Rc<MemoryElement>) {
            let element = Rc::new(element);
            let item = SortableItem::new(model, element.clone(), self.frame.clone())
                .with_group(&self.group);
            self.group.register_item(&item);
            (item, element)
        }
    }

    fn vertical(y: f64, height: f64) -> MemoryElement {
        MemoryElement::at(0.0, y, 100.0, height)
    }

    fn models<M: Clone + 'static, G: Clone + 'static>(items: &[SortableItem<M, G>]) -> Vec<M> {
        items.iter().map(SortableItem::model).collect()
    }

    #[test]
    fn sorted_items_follow_vertical_position() {
        let rig = rig(GroupConfig::default());
        rig.add("bar", vertical(20.0, 10.0));
        rig.add("baz", vertical(30.0, 10.0));
        rig.add("foo", vertical(10.0, 10.0));
        assert_eq!(models(&rig.group.sorted_items()), vec!["foo", "bar", "baz"]);
        assert_eq!(rig.group.item_position(), 10.0);
    }

    #[test]
    fn sorted_items_follow_horizontal_position() {
        let rig = rig(GroupConfig::default().with_direction(Axis::X));
        rig.add("b", MemoryElement::at(50.0, 0.0, 10.0, 10.0));
        rig.add("a", MemoryElement::at(5.0, 0.0, 10.0, 10.0));
        assert_eq!(models(&rig.group.sorted_items()), vec!["a", "b"]);
    }

    #[test]
    fn empty_group_position_is_zero() {
        let rig = rig(GroupConfig::default());
        assert_eq!(rig.group.item_position(), 0.0);
        assert!(rig.group.is_empty());
        rig.group.update(None);
    }

    #[test]
    fn registration_is_idempotent() {
        let rig = rig(GroupConfig::default());
        let (item, _) = rig.add("a", vertical(0.0, 10.0));
        rig.group.register_item(&item);
        assert_eq!(rig.group.len(), 1);
        rig.group.deregister_item(&item);
        rig.group.deregister_item(&item);
        assert!(!rig.group.contains(&item));
        assert!(rig.group.is_empty());
    }

    #[test]
    fn update_packs_siblings_around_dragged_item() {
        let rig = rig(GroupConfig::default());
        let (a, _) = rig.add("a", vertical(10.0, 15.0));
        let (b, _) = rig.add("b", vertical(20.0, 10.0));
        let (c, _) = rig.add("c", vertical(5.0, 20.0));
        c.update_flags(|f| f.insert(ItemFlags::DRAGGING));

        rig.group.update(None);

        assert_eq!(a.y(), 25.0);
        assert_eq!(b.y(), 40.0);
        assert_eq!(c.y(), 5.0);
    }

    #[test]
    fn update_starts_from_stashed_origin() {
        let rig = rig(GroupConfig::default());
        let (first, _) = rig.add("first", vertical(0.0, 10.0));
        let (second, _) = rig.add("second", vertical(10.0, 10.0));
        rig.group.prepare();

        first.update_flags(|f| f.insert(ItemFlags::DRAGGING));
        first.set_y(15.0);
        rig.group.update(None);

        assert_eq!(second.y(), 0.0);
        assert_eq!(first.y(), 15.0);
    }

    #[test]
    fn update_schedules_transforms() {
        let rig = rig(GroupConfig::default());
        let (_a, a_el) = rig.add("a", vertical(0.0, 10.0));
        let (b, b_el) = rig.add("b", vertical(10.0, 10.0));
        b.update_flags(|f| f.insert(ItemFlags::DRAGGING));
        b.set_y(-5.0);
        rig.frame.run(|| rig.group.update(None));
        // Cursor starts at the dragged item (-5) and advances past it.
        assert_eq!(a_el.transform(), Some(Transform::TranslateY(5.0)));
        assert_eq!(b_el.transform(), Some(Transform::TranslateY(-15.0)));
    }

    #[test]
    fn no_slide_with_pointer_only_highlights() {
        let rig = rig(GroupConfig::default().with_no_slide(true));
        let (a, _) = rig.add("a", vertical(0.0, 10.0));
        let (b, _) = rig.add("b", vertical(10.0, 10.0));
        rig.group.prepare();
        a.update_flags(|f| f.insert(ItemFlags::DRAGGING));
        a.set_y(12.0);
        rig.frame.flush();

        rig.group.update(Some(Point::new(50.0, 15.0)));
        assert!(b.insert_highlight());
        assert!(!a.insert_highlight(), "dragged item is never highlighted");
        assert_eq!(b.y(), 10.0);
        assert_eq!(rig.frame.queued(), 0);

        rig.group.update(None);
        assert!(!b.insert_highlight());
        assert_eq!(b.y(), 0.0, "release falls through to relayout");
    }

    #[test]
    fn commit_reports_order_and_dragged_model() {
        let rig = rig(GroupConfig::default());
        rig.add("bar", vertical(20.0, 10.0));
        rig.add("baz", vertical(30.0, 10.0));
        let (foo, _) = rig.add("foo", vertical(10.0, 10.0));
        foo.update_flags(|f| f.insert(ItemFlags::WAS_DROPPED));
        rig.group.prepare();

        rig.frame.run(|| rig.group.commit());

        let changes = rig.changes.borrow();
        assert_eq!(
            changes.as_slice(),
            &[Change::Order {
                order: vec!["foo", "bar", "baz"],
                dragged: Some("foo"),
            }]
        );
        assert!(!foo.was_dropped());
        assert!(format!("{:?}", rig.group).contains("stashed_origin: None"));
    }

    #[test]
    fn commit_without_dropped_item_reports_none() {
        let rig = rig(GroupConfig::default());
        rig.add("bar", vertical(20.0, 10.0));
        rig.add("baz", vertical(30.0, 10.0));
        rig.add("foo", vertical(10.0, 10.0));

        rig.frame.run(|| rig.group.commit());

        assert_eq!(
            rig.changes.borrow().as_slice(),
            &[Change::Order {
                order: vec!["foo", "bar", "baz"],
                dragged: None,
            }]
        );
    }

    #[test]
    fn second_commit_no_longer_reports_dragged_model() {
        let rig = rig(GroupConfig::default());
        rig.add("bar", vertical(20.0, 10.0));
        let (foo, _) = rig.add("foo", vertical(10.0, 10.0));
        foo.update_flags(|f| f.insert(ItemFlags::WAS_DROPPED));

        rig.frame.run(|| rig.group.commit());
        rig.frame.run(|| rig.group.commit());

        let changes = rig.changes.borrow();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].dragged(), Some(&"foo"));
        assert_eq!(changes[1].dragged(), None);
        assert_eq!(changes[1].order(), ["foo", "bar"]);
    }

    #[test]
    fn commit_includes_group_model() {
        let rig = rig(GroupConfig::default());
        rig.group.set_model(Some("list"));
        rig.add("a", vertical(0.0, 10.0));
        rig.group.commit();
        let changes = rig.changes.borrow();
        assert_eq!(changes[0].group_model(), Some(&"list"));
        assert_eq!(changes[0].order(), &["a"]);
        assert_eq!(changes[0].dragged(), None);
    }

    #[test]
    fn commit_freezes_resets_then_thaws() {
        let rig = rig(GroupConfig::default());
        let (a, el) = rig.add("a", vertical(0.0, 10.0));
        a.set_y(40.0);
        rig.frame.flush();
        assert!(el.transform().is_some());

        rig.frame.run(|| rig.group.commit());
        assert!(el.transitions_suspended());
        assert_eq!(el.transform(), None);
        assert_eq!(a.y(), 0.0, "position re-measured after reset");

        assert!(rig.frame.step());
        assert!(!el.transitions_suspended());
    }

    #[test]
    fn busy_tracks_members() {
        let rig = rig(GroupConfig::default());
        let (a, _) = rig.add("a", vertical(0.0, 10.0));
        let (b, _) = rig.add("b", vertical(10.0, 10.0));
        assert!(!rig.group.is_busy());
        a.update_flags(|f| f.insert(ItemFlags::DROPPING));
        assert!(rig.group.is_busy());
        assert!(rig.group.has_busy_item_other_than(&b));
        assert!(!rig.group.has_busy_item_other_than(&a));
    }

    // =====================================================================
    // Tracing
    // =====================================================================

    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Default)]
    struct Capture {
        spans: Arc<Mutex<Vec<String>>>,
        events: Arc<Mutex<Vec<String>>>,
    }

    struct MessageVisitor(Option<String>);

    impl tracing::field::Visit for MessageVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Capture {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.spans
                .lock()
                .unwrap()
                .push(attrs.metadata().name().to_string());
        }

        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            let mut visitor = MessageVisitor(None);
            event.record(&mut visitor);
            if let Some(message) = visitor.0 {
                self.events
                    .lock()
                    .unwrap()
                    .push(format!("{}: {message}", event.metadata().target()));
            }
        }
    }

    #[test]
    fn commit_emits_span_and_event() {
        let capture = Capture::default();
        let spans = Arc::clone(&capture.spans);
        let events = Arc::clone(&capture.events);
        let subscriber = tracing_subscriber::registry().with(capture);

        tracing::subscriber::with_default(subscriber, || {
            let rig = rig(GroupConfig::default());
            rig.add("a", vertical(0.0, 10.0));
            rig.group.commit();
        });

        assert!(spans.lock().unwrap().iter().any(|s| s == "sortable.commit"));
        assert!(
            events
                .lock()
                .unwrap()
                .iter()
                .any(|e| e == "sortkit.group: order committed")
        );
    }
}
