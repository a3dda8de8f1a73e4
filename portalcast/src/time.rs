//! Frame-counted scheduler for tweens, timeouts and intervals.
//!
//! Time here is `frame / frame_rate`, never the wall clock, so a run is
//! reproducible from its frame count alone. All methods take `&self`; the
//! service is meant to be shared through an `Rc` and called from inside its
//! own callbacks.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::deferred::Deferred;
use crate::error::{ContractViolation, Result};

/// Tick callback: `(frames since start, seconds since start, frame rate)`.
/// Return false to finish.
pub type TickFn = Box<dyn FnMut(u64, f64, f64) -> bool>;
/// Called once, with the same arguments as the last tick.
pub type FinishFn = Box<dyn FnMut(u64, f64, f64)>;

/// A named animation that runs every frame until its tick returns false.
pub struct Tween {
    pub tick: TickFn,
    pub finish: FinishFn,
}

impl Tween {
    pub fn new(
        tick: impl FnMut(u64, f64, f64) -> bool + 'static,
        finish: impl FnMut(u64, f64, f64) + 'static,
    ) -> Self {
        Self {
            tick: Box::new(tick),
            finish: Box::new(finish),
        }
    }
}

impl fmt::Debug for Tween {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tween").finish_non_exhaustive()
    }
}

/// Handle returned by [`TimeService::on_timeout`] and [`TimeService::at_intervals`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

struct TweenEntry {
    name: String,
    // Taken out while its callbacks run.
    tween: Option<Tween>,
    start: u64,
}

struct Timer<F> {
    f: Option<F>,
    duration: f64,
    start: u64,
}

pub struct TimeService {
    frame_rate: f64,
    frame: Cell<u64>,
    updating: Cell<bool>,

    next_seq: Cell<u64>,
    tweens: RefCell<BTreeMap<u64, TweenEntry>>,
    tween_names: RefCell<HashMap<String, u64>>,

    next_timer: Cell<u64>,
    timeouts: RefCell<BTreeMap<TimerId, Timer<Box<dyn FnOnce()>>>>,
    intervals: RefCell<BTreeMap<TimerId, Timer<Box<dyn FnMut() -> bool>>>>,
    pending_deletion: RefCell<Deferred<TimerId>>,
}

impl TimeService {
    pub fn new(frame_rate: f64) -> Result<Self> {
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(ContractViolation::InvalidFrameRate(frame_rate).into());
        }

        Ok(Self {
            frame_rate,
            frame: Cell::new(0),
            updating: Cell::new(false),
            next_seq: Cell::new(0),
            tweens: RefCell::new(BTreeMap::new()),
            tween_names: RefCell::new(HashMap::new()),
            next_timer: Cell::new(1),
            timeouts: RefCell::new(BTreeMap::new()),
            intervals: RefCell::new(BTreeMap::new()),
            pending_deletion: RefCell::new(Deferred::new()),
        })
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Number of completed `update` calls.
    pub fn frame(&self) -> u64 {
        self.frame.get()
    }

    /// Seconds since the service was created.
    pub fn now(&self) -> f64 {
        self.frame.get() as f64 / self.frame_rate
    }

    fn elapsed_since(&self, start: u64) -> (u64, f64) {
        let frames = self.frame.get().saturating_sub(start);
        (frames, frames as f64 / self.frame_rate)
    }

    /// Register `tween` under `name`, replacing any tween already using it.
    ///
    /// The replaced tween is dropped without its `finish` being called.
    pub fn add_tween(&self, name: impl Into<String>, tween: Tween) {
        let name = name.into();
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        if let Some(old) = self.tween_names.borrow_mut().insert(name.clone(), seq) {
            log::trace!("Replacing tween '{name}'");
            self.tweens.borrow_mut().remove(&old);
        }

        self.tweens.borrow_mut().insert(
            seq,
            TweenEntry {
                name,
                tween: Some(tween),
                start: self.frame.get(),
            },
        );
    }

    /// Cancel a tween without calling its `finish`. Returns false if no
    /// tween has that name.
    pub fn remove_tween(&self, name: &str) -> bool {
        match self.tween_names.borrow_mut().remove(name) {
            Some(seq) => {
                self.tweens.borrow_mut().remove(&seq);
                true
            }
            None => false,
        }
    }

    pub fn has_tween(&self, name: &str) -> bool {
        self.tween_names.borrow().contains_key(name)
    }

    fn next_timer_id(&self) -> TimerId {
        let id = TimerId(self.next_timer.get());
        self.next_timer.set(id.0 + 1);
        id
    }

    /// Call `f` once, on the first update at least `seconds` after now.
    pub fn on_timeout(&self, f: impl FnOnce() + 'static, seconds: f64) -> TimerId {
        let id = self.next_timer_id();
        self.timeouts.borrow_mut().insert(
            id,
            Timer {
                f: Some(Box::new(f)),
                duration: seconds,
                start: self.frame.get(),
            },
        );
        id
    }

    /// Call `f` every `seconds` until it returns false.
    pub fn at_intervals(&self, f: impl FnMut() -> bool + 'static, seconds: f64) -> TimerId {
        let id = self.next_timer_id();
        self.intervals.borrow_mut().insert(
            id,
            Timer {
                f: Some(Box::new(f)),
                duration: seconds,
                start: self.frame.get(),
            },
        );
        id
    }

    /// Stop a timeout or interval. It will not fire again, and is dropped
    /// once the current update pass is over.
    pub fn cancel_timeout(&self, id: TimerId) {
        self.pending_deletion.borrow_mut().mark(id);
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        let known = self.timeouts.borrow().contains_key(&id) || self.intervals.borrow().contains_key(&id);
        known && !self.pending_deletion.borrow().is_marked(&id)
    }

    /// Advance one frame and run everything that is due.
    pub fn update(&self) {
        if self.updating.replace(true) {
            log::warn!("TimeService::update called from inside an update; ignored");
            return;
        }

        self.frame.set(self.frame.get() + 1);
        self.update_tweens();
        self.update_timeouts();
        self.update_intervals();
        self.delete_pending();

        self.updating.set(false);
    }

    fn update_tweens(&self) {
        let seqs: Vec<u64> = self.tweens.borrow().keys().copied().collect();

        for seq in seqs {
            let taken = self
                .tweens
                .borrow_mut()
                .get_mut(&seq)
                .and_then(|e| e.tween.take().map(|t| (t, e.start)));
            let Some((mut tween, start)) = taken else {
                continue;
            };

            let (frames, elapsed) = self.elapsed_since(start);
            let alive = (tween.tick)(frames, elapsed, self.frame_rate);

            // The tween may have been removed or replaced by its own tick.
            let mut tweens = self.tweens.borrow_mut();
            let Some(entry) = tweens.get_mut(&seq) else {
                continue;
            };

            if alive {
                entry.tween = Some(tween);
                continue;
            }

            let name = std::mem::take(&mut entry.name);
            tweens.remove(&seq);
            drop(tweens);

            let mut names = self.tween_names.borrow_mut();
            if names.get(&name) == Some(&seq) {
                names.remove(&name);
            }
            drop(names);

            (tween.finish)(frames, elapsed, self.frame_rate);
        }
    }

    fn is_due<F>(&self, timer: &Timer<F>) -> bool {
        self.elapsed_since(timer.start).1 >= timer.duration
    }

    fn update_timeouts(&self) {
        let ids: Vec<TimerId> = self.timeouts.borrow().keys().copied().collect();

        for id in ids {
            if self.pending_deletion.borrow().is_marked(&id) {
                continue;
            }

            let f = {
                let mut timeouts = self.timeouts.borrow_mut();
                match timeouts.get_mut(&id) {
                    Some(t) if self.is_due(t) => t.f.take(),
                    _ => None,
                }
            };

            if let Some(f) = f {
                self.pending_deletion.borrow_mut().mark(id);
                f();
            }
        }
    }

    fn update_intervals(&self) {
        let ids: Vec<TimerId> = self.intervals.borrow().keys().copied().collect();

        for id in ids {
            if self.pending_deletion.borrow().is_marked(&id) {
                continue;
            }

            let f = {
                let mut intervals = self.intervals.borrow_mut();
                match intervals.get_mut(&id) {
                    Some(t) if self.is_due(t) => t.f.take(),
                    _ => None,
                }
            };

            let Some(mut f) = f else {
                continue;
            };

            if f() {
                if let Some(t) = self.intervals.borrow_mut().get_mut(&id) {
                    t.f = Some(f);
                    t.start = self.frame.get();
                }
            } else {
                self.pending_deletion.borrow_mut().mark(id);
            }
        }
    }

    fn delete_pending(&self) {
        let pending = self.pending_deletion.borrow_mut().take();
        let mut timeouts = self.timeouts.borrow_mut();
        let mut intervals = self.intervals.borrow_mut();
        for id in pending {
            timeouts.remove(&id);
            intervals.remove(&id);
        }
    }
}
