//! End-to-end pointer flows through a group of in-memory items.
//!
//! Each test drives a [`FrameLoop`] by hand: input is delivered inside
//! `run`, timers fire through `step`/`advance`/`settle`.

use std::cell::RefCell;
use std::rc::Rc;

use sortkit::{
    Change, GesturePhase, GroupConfig, ItemConfig, MemoryElement, SortableGroup, SortableItem,
    Transform, Transition,
};
use sortkit_core::{
    Axis, EventResult, FrameLoop, MouseButton, Point, PointerEvent, TargetId,
};
use web_time::Duration;

type Item = SortableItem<&'static str>;

struct Harness {
    frame: Rc<FrameLoop>,
    group: SortableGroup<&'static str>,
    log: Rc<RefCell<Vec<String>>>,
    changes: Rc<RefCell<Vec<Change<&'static str>>>>,
    items: Vec<(Item, Rc<MemoryElement>)>,
}

fn mouse(x: f64, y: f64) -> PointerEvent {
    PointerEvent::mouse(MouseButton::Primary, x, y)
}

impl Harness {
    fn new(config: GroupConfig) -> Self {
        let frame = Rc::new(FrameLoop::new());
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        let group =
            SortableGroup::new(config, frame.clone()).on_change(move |c| sink.borrow_mut().push(c));
        Self {
            frame,
            group,
            log: Rc::new(RefCell::new(Vec::new())),
            changes,
            items: Vec::new(),
        }
    }

    /// Vertical list of 100-wide items, stacked from `top`.
    fn column(config: GroupConfig, top: f64, rows: &[(&'static str, f64)]) -> Self {
        let mut harness = Self::new(config);
        let mut y = top;
        for &(model, height) in rows {
            harness.add(model, MemoryElement::at(0.0, y, 100.0, height));
            y += height;
        }
        harness
    }

    fn add(&mut self, model: &'static str, element: MemoryElement) {
        let element = Rc::new(element);
        let start = Rc::clone(&self.log);
        let stop = Rc::clone(&self.log);
        let item = SortableItem::new(model, element.clone(), self.frame.clone())
            .with_group(&self.group)
            .on_drag_start(move |m| start.borrow_mut().push(format!("start {m}")))
            .on_drag_stop(move |m| stop.borrow_mut().push(format!("stop {m}")));
        item.did_insert();
        self.frame.flush();
        self.items.push((item, element));
    }

    fn item(&self, idx: usize) -> &Item {
        &self.items[idx].0
    }

    fn element(&self, idx: usize) -> &MemoryElement {
        &self.items[idx].1
    }

    /// Press and hold until the long-press check primes the item.
    fn hold(&self, idx: usize, event: PointerEvent) {
        self.frame.run(|| self.item(idx).pointer_down(&event));
        self.frame.step();
    }

    fn move_to(&self, x: f64, y: f64) -> EventResult {
        self.frame.run(|| self.group.dispatch_pointer_move(&mouse(x, y)))
    }

    fn release(&self, x: f64, y: f64) -> EventResult {
        self.frame.run(|| self.group.dispatch_pointer_up(&mouse(x, y)))
    }

    /// Press item `idx` at `(x, y)` and start dragging it.
    fn grab(&self, idx: usize, x: f64, y: f64) {
        self.hold(idx, mouse(x, y));
        assert!(self.move_to(x, y).is_consumed(), "drag should start");
    }

    fn orders(&self) -> Vec<Vec<&'static str>> {
        self.changes
            .borrow()
            .iter()
            .map(|c| c.order().to_vec())
            .collect()
    }
}

#[test]
fn drag_first_item_to_the_end() {
    let h = Harness::column(GroupConfig::default(), 0.0, &[("a", 20.0), ("b", 20.0), ("c", 20.0)]);

    h.grab(0, 10.0, 10.0);
    assert!(h.item(0).is_dragging());
    assert_eq!(h.item(0).gesture_phase(), GesturePhase::Dragging);

    h.move_to(10.0, 55.0);
    assert_eq!(h.item(0).y(), 45.0);
    assert_eq!(h.element(0).transform(), Some(Transform::TranslateY(45.0)));

    // Throttled group update slides the siblings up.
    h.frame.advance(Duration::from_millis(125));
    assert_eq!(h.item(1).y(), 0.0);
    assert_eq!(h.item(2).y(), 20.0);

    assert!(h.release(10.0, 55.0).is_consumed());
    assert!(h.item(0).is_dropping());
    h.frame.settle(16);

    assert_eq!(h.orders(), vec![vec!["b", "c", "a"]]);
    assert_eq!(
        h.changes.borrow()[0],
        Change::Order {
            order: vec!["b", "c", "a"],
            dragged: Some("a"),
        }
    );
    assert_eq!(*h.log.borrow(), vec!["start a", "stop a"]);
    assert!(!h.item(0).is_busy());
    assert!(!h.item(0).was_dropped(), "commit clears the dropped flag");
    assert!(h.frame.is_idle());

    assert_eq!(h.item(0).click(), EventResult::Consumed);
    assert_eq!(h.item(0).click(), EventResult::Ignored);
}

#[test]
fn release_before_long_press_cancels() {
    let h = Harness::column(GroupConfig::default(), 0.0, &[("a", 20.0), ("b", 20.0)]);

    h.frame.run(|| h.item(0).pointer_down(&mouse(10.0, 10.0)));
    h.release(10.0, 10.0);
    h.frame.step();
    assert_eq!(h.item(0).gesture_phase(), GesturePhase::Idle);

    assert_eq!(h.move_to(10.0, 40.0), EventResult::Ignored);
    assert!(!h.item(0).is_dragging());
    assert!(h.log.borrow().is_empty());
    assert_eq!(h.item(0).click(), EventResult::Ignored);
}

#[test]
fn primed_release_without_movement_is_a_click() {
    let h = Harness::column(GroupConfig::default(), 0.0, &[("a", 20.0)]);
    h.hold(0, mouse(10.0, 10.0));
    assert_eq!(h.item(0).gesture_phase(), GesturePhase::Primed);
    assert_eq!(h.release(10.0, 10.0), EventResult::Ignored);
    assert_eq!(h.item(0).gesture_phase(), GesturePhase::Idle);
    assert!(h.log.borrow().is_empty());
}

#[test]
fn handle_restricts_where_a_drag_may_start() {
    let mut h = Harness::new(GroupConfig::default());
    h.add(
        "a",
        MemoryElement::at(0.0, 0.0, 100.0, 20.0).with_handle(".grip", TargetId(7)),
    );
    h.item(0).set_config(ItemConfig::default().with_handle(".grip"));

    h.hold(0, mouse(50.0, 10.0).with_target(TargetId(3)));
    assert_eq!(h.move_to(50.0, 30.0), EventResult::Ignored);
    assert!(!h.item(0).is_dragging());

    h.hold(0, mouse(5.0, 10.0).with_target(TargetId(7)));
    assert!(h.move_to(5.0, 10.0).is_consumed());
    assert!(h.item(0).is_dragging());
}

#[test]
fn drop_waits_for_transform_transition() {
    let mut h = Harness::new(GroupConfig::default());
    let transition = Transition::transform(Duration::from_millis(250));
    h.add("a", MemoryElement::at(0.0, 0.0, 100.0, 20.0).with_transition(transition));
    h.add("b", MemoryElement::at(0.0, 20.0, 100.0, 20.0).with_transition(transition));

    h.grab(0, 10.0, 10.0);
    h.move_to(10.0, 35.0);
    h.release(10.0, 35.0);
    assert!(h.frame.step(), "transition is measured on the next tick");

    h.frame.advance(Duration::from_millis(249));
    assert!(h.changes.borrow().is_empty());
    assert!(h.item(0).is_dropping());

    h.frame.advance(Duration::from_millis(1));
    assert_eq!(h.orders(), vec![vec!["b", "a"]]);
    assert_eq!(h.frame.now(), Duration::from_millis(250));
}

#[test]
fn second_item_cannot_start_while_first_is_dropping() {
    let mut h = Harness::new(GroupConfig::default());
    let transition = Transition::transform(Duration::from_millis(300));
    h.add("a", MemoryElement::at(0.0, 0.0, 100.0, 20.0).with_transition(transition));
    h.add("b", MemoryElement::at(0.0, 20.0, 100.0, 20.0));

    h.grab(0, 10.0, 10.0);
    h.release(10.0, 10.0);
    assert!(h.group.is_busy());
    // Measure the drop transition; completion is now 300ms out.
    assert!(h.frame.step());

    h.hold(1, mouse(10.0, 30.0));
    assert_eq!(h.move_to(10.0, 5.0), EventResult::Ignored);
    assert!(!h.item(1).is_dragging());
    assert_eq!(h.item(1).gesture_phase(), GesturePhase::Idle);

    h.frame.settle(16);
    assert!(!h.group.is_busy());
    assert_eq!(*h.log.borrow(), vec!["start a", "stop a"]);
}

#[test]
fn click_on_dropping_item_keeps_group_busy_until_commit() {
    let mut h = Harness::new(GroupConfig::default());
    let transition = Transition::transform(Duration::from_millis(300));
    h.add("a", MemoryElement::at(0.0, 0.0, 100.0, 20.0).with_transition(transition));
    h.add("b", MemoryElement::at(0.0, 20.0, 100.0, 20.0));

    h.grab(0, 10.0, 10.0);
    h.release(10.0, 10.0);
    assert!(h.frame.step());

    // Press and release on the dropping item before its transition ends.
    h.frame.run(|| h.item(0).pointer_down(&mouse(10.0, 10.0)));
    assert_eq!(h.release(10.0, 10.0), EventResult::Ignored);
    assert!(h.frame.step());
    assert!(!h.item(0).is_dropping(), "press clears the flags");
    assert!(h.item(0).is_drop_pending());
    assert!(h.group.is_busy());

    h.hold(1, mouse(10.0, 30.0));
    assert_eq!(h.move_to(10.0, 45.0), EventResult::Ignored);
    assert!(!h.item(1).is_dragging());
    assert_eq!(h.item(1).gesture_phase(), GesturePhase::Idle);

    h.frame.settle(16);
    assert!(!h.group.is_busy());
    assert_eq!(h.changes.borrow().len(), 1);
    assert_eq!(h.changes.borrow()[0].dragged(), Some(&"a"));
    assert_eq!(*h.log.borrow(), vec!["start a", "stop a"]);
}

#[test]
fn detached_release_frees_the_group() {
    let h = Harness::column(GroupConfig::default(), 0.0, &[("a", 20.0), ("b", 20.0)]);
    h.grab(0, 10.0, 10.0);
    h.element(0).set_attached(false);
    h.release(10.0, 10.0);
    assert!(!h.item(0).is_dragging());
    assert!(!h.group.is_busy());

    h.frame.settle(16);
    h.grab(1, 10.0, 30.0);
    assert!(h.item(1).is_dragging());
}

#[test]
fn second_press_during_drag_is_ignored() {
    let h = Harness::column(GroupConfig::default(), 0.0, &[("a", 20.0), ("b", 20.0)]);
    h.grab(0, 10.0, 10.0);
    assert_eq!(
        h.item(0).pointer_down(&PointerEvent::touch(10.0, 10.0)),
        EventResult::Ignored
    );
    assert!(h.item(0).is_dragging());
    assert_eq!(h.item(0).gesture_phase(), GesturePhase::Dragging);
}

#[test]
fn free_drag_above_the_fold_skips_animation() {
    let mut h = Harness::new(GroupConfig::default().with_constrain_direction(false));
    let transition = Transition::transform(Duration::from_millis(400));
    h.add("a", MemoryElement::at(0.0, 300.0, 100.0, 20.0).with_transition(transition));
    h.add("b", MemoryElement::at(0.0, 320.0, 100.0, 20.0).with_transition(transition));

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let dragged = h.item(0).clone().on_drag(move |p| sink.borrow_mut().push(p));

    h.grab(0, 10.0, 310.0);
    h.move_to(20.0, 200.0);
    h.move_to(15.0, 150.0);
    assert_eq!(dragged.x(), 5.0);
    assert_eq!(dragged.y(), 140.0);
    assert_eq!(dragged.drag_y(), Some(150.0));
    assert_eq!(
        h.element(0).transform(),
        Some(Transform::Translate(5.0, -160.0))
    );

    h.frame.advance(Duration::from_millis(125));
    assert_eq!(*seen.borrow(), vec![Point::new(15.0, 150.0)]);

    h.release(15.0, 150.0);
    assert!(dragged.is_above_the_fold());
    assert!(h.element(0).transitions_suspended(), "frozen for the drop");

    let elapsed = h.frame.settle(16);
    assert_eq!(elapsed, Duration::ZERO, "frozen drops do not wait");
    assert!(!h.element(0).transitions_suspended());
    assert_eq!(h.changes.borrow()[0].dragged(), Some(&"a"));
}

#[test]
fn constrained_drag_forgets_earlier_free_pointer() {
    let mut h = Harness::new(GroupConfig::default().with_constrain_direction(false));
    let transition = Transition::transform(Duration::from_millis(400));
    h.add("a", MemoryElement::at(0.0, 300.0, 100.0, 20.0).with_transition(transition));
    h.add("b", MemoryElement::at(0.0, 320.0, 100.0, 20.0).with_transition(transition));

    h.grab(0, 10.0, 310.0);
    h.move_to(10.0, 150.0);
    h.release(10.0, 150.0);
    h.frame.settle(16);
    assert_eq!(h.item(0).drag_y(), Some(150.0));

    h.group.set_config(GroupConfig::default());
    h.grab(0, 10.0, 310.0);
    assert_eq!(h.item(0).drag_y(), None);
    h.release(10.0, 310.0);
    assert!(!h.item(0).is_above_the_fold());
    assert!(!h.element(0).transitions_suspended(), "animated drop");

    let elapsed = h.frame.settle(16);
    assert!(elapsed >= Duration::from_millis(400));
    assert_eq!(h.changes.borrow().len(), 2);
}

#[test]
fn no_slide_highlights_insert_target() {
    let h = Harness::column(
        GroupConfig::default().with_no_slide(true),
        0.0,
        &[("a", 20.0), ("b", 20.0), ("c", 20.0)],
    );

    h.grab(0, 10.0, 10.0);
    h.move_to(10.0, 35.0);
    h.frame.advance(Duration::from_millis(125));

    assert!(h.item(1).insert_highlight());
    assert!(!h.item(0).insert_highlight());
    assert!(!h.item(2).insert_highlight());
    assert_eq!(h.item(1).y(), 20.0, "siblings do not slide");

    h.release(10.0, 35.0);
    assert!(!h.item(1).insert_highlight());
    assert_eq!(h.item(1).y(), 0.0);
    h.frame.settle(16);
    assert_eq!(h.orders(), vec![vec!["b", "a", "c"]]);
}

#[test]
fn horizontal_group_reorders_by_x() {
    let mut h = Harness::new(GroupConfig::default().with_direction(Axis::X));
    h.add("a", MemoryElement::at(0.0, 0.0, 30.0, 20.0));
    h.add("b", MemoryElement::at(30.0, 0.0, 30.0, 20.0));

    h.grab(0, 5.0, 5.0);
    h.move_to(50.0, 90.0);
    assert_eq!(h.item(0).x(), 45.0);
    assert_eq!(h.element(0).transform(), Some(Transform::TranslateX(45.0)));

    h.release(50.0, 90.0);
    h.frame.settle(16);
    assert_eq!(h.orders(), vec![vec!["b", "a"]]);
}

#[test]
fn container_scroll_keeps_item_under_pointer() {
    let h = Harness::column(GroupConfig::default(), 0.0, &[("a", 20.0), ("b", 20.0)]);
    h.grab(0, 10.0, 10.0);

    h.element(0).set_container_offset(Point::new(0.0, -30.0));
    h.move_to(10.0, 10.0);
    assert_eq!(h.item(0).y(), 30.0);
}

#[test]
fn removal_mid_drag_cancels_pending_update() {
    let h = Harness::column(GroupConfig::default(), 0.0, &[("a", 20.0), ("b", 20.0), ("c", 20.0)]);
    h.grab(0, 10.0, 10.0);
    h.move_to(10.0, 55.0);

    h.frame.run(|| h.item(0).will_remove());
    assert!(!h.group.contains(h.item(0)));
    assert_eq!(h.group.len(), 2);

    h.frame.advance(Duration::from_millis(500));
    assert_eq!(h.item(1).y(), 20.0, "throttled relayout was cancelled");
}
