//! Colour fades built on the time service.

use std::cell::RefCell;
use std::rc::Rc;

use image::Rgba;

use crate::error::{ContractViolation, Result};
use crate::time::Tween;

/// Linear blend from `a` to `b`; `i` must lie in [0, 1].
pub fn tween_colour(a: Rgba<u8>, b: Rgba<u8>, i: f64) -> Result<Rgba<u8>> {
    if !(0.0..=1.0).contains(&i) {
        return Err(ContractViolation::FractionOutOfRange(i).into());
    }

    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * i).round() as u8;
    Ok(Rgba([
        mix(a[0], b[0]),
        mix(a[1], b[1]),
        mix(a[2], b[2]),
        mix(a[3], b[3]),
    ]))
}

/// A tween that fades from `from` to `to` over `duration` seconds, handing
/// each intermediate colour to `apply`. The last colour applied is `to`.
pub fn colour_transition(
    from: Rgba<u8>,
    to: Rgba<u8>,
    duration: f64,
    apply: impl FnMut(Rgba<u8>) + 'static,
) -> Tween {
    let apply = Rc::new(RefCell::new(apply));
    let on_finish = Rc::clone(&apply);

    Tween::new(
        move |frames, _elapsed, frame_rate| {
            let total = (frame_rate * duration).round().max(1.0);
            let i = (frames as f64 / total).min(1.0);
            if let Ok(c) = tween_colour(from, to, i) {
                (*apply.borrow_mut())(c);
            }
            (frames as f64) < total
        },
        move |_, _, _| (*on_finish.borrow_mut())(to),
    )
}
