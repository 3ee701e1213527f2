#![no_main]

use libfuzzer_sys::fuzz_target;
use sortkit::Transition;
use web_time::Duration;

fuzz_target!(|input: (&str, &str)| {
    let (property, duration) = input;
    let transition = Transition::from_css(property, duration);

    if !transition.animates_transform {
        assert_eq!(transition.settle_delay(), Duration::ZERO);
    } else {
        assert_eq!(transition.settle_delay(), transition.duration);
    }
});
