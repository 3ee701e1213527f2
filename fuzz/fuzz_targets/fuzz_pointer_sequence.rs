#![no_main]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sortkit::{GroupConfig, MemoryElement, SortableGroup, SortableItem, Transition};
use sortkit_core::{Axis, FrameLoop, MouseButton, PointerEvent};
use web_time::Duration;

#[derive(Debug, Arbitrary)]
enum Op {
    Press { item: u8, x: i16, y: i16, touch: bool },
    Move { x: i16, y: i16 },
    Release { x: i16, y: i16 },
    Step,
    Advance { ms: u16 },
    Scroll { item: u8, dy: i16 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    horizontal: bool,
    constrain: bool,
    no_slide: bool,
    transition_ms: u8,
    extents: Vec<u8>,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let extents: Vec<f64> = input
        .extents
        .iter()
        .take(8)
        .map(|e| f64::from(*e % 60) + 1.0)
        .collect();
    if extents.is_empty() {
        return;
    }
    let axis = if input.horizontal { Axis::X } else { Axis::Y };
    let config = GroupConfig::default()
        .with_direction(axis)
        .with_constrain_direction(input.constrain)
        .with_no_slide(input.no_slide);
    let transition = Transition::transform(Duration::from_millis(u64::from(input.transition_ms)));

    let frame = Rc::new(FrameLoop::new());
    let orders = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&orders);
    let group: SortableGroup<usize> = SortableGroup::new(config, frame.clone())
        .on_change(move |change| sink.borrow_mut().push(change.order().to_vec()));

    let starts = Rc::new(Cell::new(0usize));
    let mut cursor = 0.0;
    let mut items = Vec::new();
    for (idx, extent) in extents.iter().enumerate() {
        let (x, y, w, h) = match axis {
            Axis::X => (cursor, 0.0, *extent, 20.0),
            Axis::Y => (0.0, cursor, 100.0, *extent),
        };
        cursor += extent;
        let element = Rc::new(MemoryElement::at(x, y, w, h).with_transition(transition));
        let counter = Rc::clone(&starts);
        let item = SortableItem::new(idx, element.clone(), frame.clone())
            .with_group(&group)
            .on_drag_start(move |_| counter.set(counter.get() + 1));
        item.did_insert();
        items.push((item, element));
    }
    frame.flush();

    let pointer = |x: i16, y: i16| PointerEvent::mouse(MouseButton::Primary, f64::from(x), f64::from(y));

    for op in input.ops.iter().take(256) {
        match *op {
            Op::Press { item, x, y, touch } => {
                let (item, _) = &items[usize::from(item) % items.len()];
                let event = if touch {
                    PointerEvent::touch(f64::from(x), f64::from(y))
                } else {
                    pointer(x, y)
                };
                frame.run(|| item.pointer_down(&event));
            }
            Op::Move { x, y } => {
                frame.run(|| group.dispatch_pointer_move(&pointer(x, y)));
            }
            Op::Release { x, y } => {
                frame.run(|| group.dispatch_pointer_up(&pointer(x, y)));
            }
            Op::Step => {
                frame.step();
            }
            Op::Advance { ms } => frame.advance(Duration::from_millis(u64::from(ms))),
            Op::Scroll { item, dy } => {
                let (_, element) = &items[usize::from(item) % items.len()];
                element.set_container_offset(sortkit_core::Point::new(0.0, f64::from(dy)));
            }
        }

        let busy = items
            .iter()
            .filter(|(item, _)| item.is_busy())
            .count();
        assert!(busy <= 1, "{busy} items busy at once");
    }

    frame.run(|| group.dispatch_pointer_up(&pointer(0, 0)));
    frame.settle(4_096);
    assert!(!group.is_busy(), "drag left in flight after settling");
    assert_eq!(orders.borrow().len(), starts.get(), "every drag commits once");

    for order in orders.borrow().iter() {
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..items.len()).collect::<Vec<_>>(), "order is a permutation");
    }
});
