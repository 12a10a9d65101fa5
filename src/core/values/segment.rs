use std::fmt;
use std::sync::Arc;

/// Simulated time in seconds
pub type SimTime = f64;

/// A piece of a continuous-time signal valid over `[start, end)`.
///
/// The segment is stored as `(time, value)` samples in absolute time and
/// read back by linear interpolation. Shapes are evaluated when a segment is
/// built, so reading a segment never runs user code.
#[derive(Clone, PartialEq)]
pub struct Segment {
    start: SimTime,
    end: SimTime,
    samples: Arc<[(SimTime, f64)]>,
}

impl Segment {
    /// A segment linearly interpolating `(time, value)` samples sorted by time.
    pub fn interpolated(start: SimTime, end: SimTime, samples: Vec<(SimTime, f64)>) -> Self {
        Self {
            start,
            end,
            samples: samples.into(),
        }
    }

    /// A segment holding a constant value
    pub fn constant(start: SimTime, end: SimTime, value: f64) -> Self {
        Self::interpolated(start, end, vec![(start, value), (end, value)])
    }

    /// Evaluate `shape` at `intervals + 1` evenly spaced points of `[start, end]`.
    pub fn sampled<F>(start: SimTime, end: SimTime, intervals: usize, mut shape: F) -> Self
    where
        F: FnMut(SimTime) -> f64,
    {
        let intervals = intervals.max(1);
        let width = end - start;
        let samples = (0..=intervals)
            .map(|i| {
                let t = if i == intervals {
                    end
                } else {
                    start + width * i as f64 / intervals as f64
                };
                (t, shape(t))
            })
            .collect();
        Self::interpolated(start, end, samples)
    }

    pub fn start(&self) -> SimTime {
        self.start
    }

    pub fn end(&self) -> SimTime {
        self.end
    }

    pub fn duration(&self) -> SimTime {
        self.end - self.start
    }

    pub fn samples(&self) -> &[(SimTime, f64)] {
        &self.samples
    }

    /// Value at absolute time `t`
    pub fn value_at(&self, t: SimTime) -> f64 {
        interpolate(&self.samples, t)
    }

    /// The same shape moved later in time by `delta`.
    pub fn shifted(&self, delta: SimTime) -> Self {
        Self::interpolated(
            self.start + delta,
            self.end + delta,
            self.samples.iter().map(|&(t, v)| (t + delta, v)).collect(),
        )
    }

    /// Pointwise map of the sample values.
    pub fn map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(f64) -> f64,
    {
        Self::interpolated(
            self.start,
            self.end,
            self.samples.iter().map(|&(t, v)| (t, f(v))).collect(),
        )
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("samples", &self.samples.len())
            .finish()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

fn interpolate(samples: &[(SimTime, f64)], t: SimTime) -> f64 {
    let first = match samples.first() {
        Some(first) => first,
        None => return 0.0,
    };
    if t <= first.0 {
        return first.1;
    }
    // index of the first sample strictly after t
    let idx = samples.partition_point(|(st, _)| *st <= t);
    if idx >= samples.len() {
        return samples[samples.len() - 1].1;
    }
    let (t0, v0) = samples[idx - 1];
    let (t1, v1) = samples[idx];
    if t1 == t0 {
        return v1;
    }
    v0 + (v1 - v0) * (t - t0) / (t1 - t0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_preserves_shape() {
        let ramp = Segment::sampled(0.0, 1.0, 4, |t| 2.0 * t);
        let shifted = ramp.shifted(0.5);
        assert_eq!(shifted.start(), 0.5);
        assert_eq!(shifted.end(), 1.5);
        assert!((shifted.value_at(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_interpolation() {
        let seg = Segment::interpolated(0.0, 2.0, vec![(0.0, 0.0), (1.0, 10.0), (2.0, 0.0)]);
        assert!((seg.value_at(0.5) - 5.0).abs() < 1e-12);
        assert!((seg.value_at(1.5) - 5.0).abs() < 1e-12);
        assert_eq!(seg.value_at(3.0), 0.0);
    }

    #[test]
    fn test_sampled_grid_hits_both_ends() {
        let mut calls = Vec::new();
        let seg = Segment::sampled(1.0, 2.0, 4, |t| {
            calls.push(t);
            t * t
        });
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], 1.0);
        assert_eq!(calls[4], 2.0);
        assert_eq!(seg.value_at(2.0), 4.0);
    }

    #[test]
    fn test_map() {
        let seg = Segment::constant(0.0, 1.0, 3.0).map(|v| v * v);
        assert_eq!(seg.value_at(0.2), 9.0);
    }

    #[test]
    fn test_debug_lists_sample_count() {
        let seg = Segment::constant(0.0, 1.0, 3.0);
        assert_eq!(format!("{:?}", seg), "Segment { start: 0.0, end: 1.0, samples: 2 }");
    }
}
