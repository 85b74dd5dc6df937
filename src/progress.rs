//! Progress reporting with nested sub-ranges.
//!
//! A load reports into one overall 0–100 scale.  Each lifecycle step is given
//! a slice `[min, max]` of that scale, and handlers report their own 0–100
//! percentage, which [`Progress::update`] clamps and maps into the active
//! slice before forwarding to the [`ProgressSink`].
//!
//! When a message fans out to several handlers, [`Progress::fan_out`] splits
//! the active slice into equal contiguous parts (see [`allocate`]) and puts
//! the parent slice back afterwards.

/// Receiver of absolute progress values, typically a progress bar.
pub trait ProgressSink {
    /// `value` is on the overall 0–100 scale.
    fn update(&mut self, value: u32, message: &str);
}

impl<F: FnMut(u32, &str)> ProgressSink for F {
    fn update(&mut self, value: u32, message: &str) {
        self(value, message)
    }
}

/// Split `[min, max]` into `steps` contiguous sub-ranges of equal width.
///
/// The first range starts at `min`, each range starts where the previous one
/// ends, and the last range ends exactly at `max`.  Zero steps yields no
/// ranges.
pub fn allocate(min: f64, max: f64, steps: usize) -> Vec<(f64, f64)> {
    if steps == 0 {
        return Vec::new();
    }
    let width = (max - min) / steps as f64;
    let mut ranges = Vec::with_capacity(steps);
    let mut lo = min;
    for i in 1..=steps {
        let hi = if i == steps { max } else { min + width * i as f64 };
        ranges.push((lo, hi));
        lo = hi;
    }
    ranges
}

pub struct Progress {
    sink: Option<Box<dyn ProgressSink>>,
    min:  f64,
    max:  f64,
}

impl Default for Progress {
    fn default() -> Self { Self::silent() }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("sink", &self.sink.is_some())
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

impl Progress {
    pub fn new(sink: Box<dyn ProgressSink>) -> Self {
        Self { sink: Some(sink), min: 0.0, max: 100.0 }
    }

    /// Tracks ranges but reports nowhere.
    pub fn silent() -> Self {
        Self { sink: None, min: 0.0, max: 100.0 }
    }

    pub fn range(&self) -> (f64, f64) { (self.min, self.max) }

    /// Set the active slice.  Both ends are clamped into 0–100 and `max` is
    /// never below `min`.
    pub fn set_range(&mut self, min: f64, max: f64) {
        self.min = min.clamp(0.0, 100.0);
        self.max = max.clamp(self.min, 100.0);
    }

    /// Report `percent` (0–100) of the active slice.
    pub fn update(&mut self, percent: f64, message: &str) {
        let Some(sink) = self.sink.as_mut() else { return };
        let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        let value = self.min + percent * (self.max - self.min) / 100.0;
        sink.update(value.floor() as u32, message);
    }

    /// Run `f` once per step with the active slice narrowed to that step's
    /// share, then restore the slice that was active on entry.
    pub fn fan_out<F>(&mut self, steps: usize, mut f: F)
    where
        F: FnMut(usize, &mut Progress),
    {
        let (min, max) = self.range();
        for (i, (lo, hi)) in allocate(min, max, steps).into_iter().enumerate() {
            self.set_range(lo, hi);
            f(i, self);
        }
        self.set_range(min, max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording() -> (Progress, Rc<RefCell<Vec<u32>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (Progress::new(Box::new(move |v: u32, _: &str| sink.borrow_mut().push(v))), seen)
    }

    #[test]
    fn update_maps_into_active_range() {
        let (mut p, seen) = recording();
        p.set_range(10.0, 14.0);
        p.update(0.0, "start");
        p.update(50.0, "half");
        p.update(100.0, "done");
        p.update(250.0, "clamped");
        p.update(-5.0, "clamped");
        assert_eq!(*seen.borrow(), vec![10, 12, 14, 14, 10]);
    }

    #[test]
    fn set_range_clamps() {
        let mut p = Progress::silent();
        p.set_range(-5.0, 120.0);
        assert_eq!(p.range(), (0.0, 100.0));
        p.set_range(60.0, 40.0);
        assert_eq!(p.range(), (60.0, 60.0));
    }

    #[test]
    fn fan_out_restores_parent_range() {
        let mut p = Progress::silent();
        p.set_range(75.0, 83.0);
        let mut ranges = Vec::new();
        p.fan_out(4, |i, p| ranges.push((i, p.range())));
        assert_eq!(ranges, vec![
            (0, (75.0, 77.0)),
            (1, (77.0, 79.0)),
            (2, (79.0, 81.0)),
            (3, (81.0, 83.0)),
        ]);
        assert_eq!(p.range(), (75.0, 83.0));
    }

    #[test]
    fn zero_steps_is_empty() {
        assert!(allocate(0.0, 100.0, 0).is_empty());
        let mut calls = 0;
        Progress::silent().fan_out(0, |_, _| calls += 1);
        assert_eq!(calls, 0);
    }

    proptest! {
        #[test]
        fn allocation_tiles_parent(min in 0.0f64..100.0, span in 0.0f64..100.0, steps in 1usize..64) {
            let max = min + span;
            let ranges = allocate(min, max, steps);
            prop_assert_eq!(ranges.len(), steps);
            prop_assert_eq!(ranges[0].0, min);
            prop_assert_eq!(ranges[steps - 1].1, max);
            for w in ranges.windows(2) {
                prop_assert_eq!(w[0].1, w[1].0);
            }
            for &(lo, hi) in &ranges {
                prop_assert!(lo <= hi);
                prop_assert!(lo >= min && hi <= max);
            }
        }
    }
}
