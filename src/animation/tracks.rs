use crate::animation::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    Linear,
    Step,
    CubicSpline,
}

const MAX_SCAN_OFFSET: usize = 3;

/// Remembers the keyframe interval found by the previous sample so that
/// monotonic playback resolves the next interval in O(1).
#[derive(Debug, Clone, Default)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    /// For `CubicSpline`, length is `times.len() * 3` (in-tangent, value,
    /// out-tangent per keyframe).
    pub values: Vec<T>,
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Self {
        Self {
            times,
            values,
            interpolation,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty() || self.values.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Time of the last keyframe, `0.0` for an empty track.
    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Whether times are non-decreasing and the value count fits the
    /// interpolation mode.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let expected = match self.interpolation {
            InterpolationMode::CubicSpline => self.times.len() * 3,
            _ => self.times.len(),
        };
        self.values.len() == expected && self.times.windows(2).all(|w| w[0] <= w[1])
    }

    /// Stateless sampling (binary search every call).
    #[must_use]
    pub fn sample(&self, time: f32) -> T {
        if self.is_empty() {
            return T::default();
        }
        self.sample_at_frame(self.interval_at(time), time)
    }

    /// Sampling with cursor; `cursor` is updated to the resolved interval.
    pub fn sample_with_cursor(&self, time: f32, cursor: &mut KeyframeCursor) -> T {
        if self.is_empty() {
            return T::default();
        }
        let index = self.locate(time, cursor.last_index);
        cursor.last_index = index;
        self.sample_at_frame(index, time)
    }

    /// Interval holding `time`: a short scan around `hint` (forward play,
    /// reverse play and loop wraps land close to it), then binary search.
    fn locate(&self, time: f32, hint: usize) -> usize {
        let last = self.times.len() - 1;
        let hint = hint.min(last);
        let holds = |i: usize| self.times[i] <= time && (i == last || time < self.times[i + 1]);

        let near = if time >= self.times[hint] {
            (hint..=last.min(hint + MAX_SCAN_OFFSET)).find(|&i| holds(i))
        } else {
            (hint.saturating_sub(MAX_SCAN_OFFSET)..hint)
                .rev()
                .find(|&i| holds(i))
        };
        near.unwrap_or_else(|| self.interval_at(time))
    }

    /// Last keyframe at or before `time` (0 before the first key).
    fn interval_at(&self, time: f32) -> usize {
        self.times.partition_point(|&t| t <= time).saturating_sub(1)
    }

    /// Value slot `slot`; a track with fewer values than its times need
    /// reads the default value for the missing slots.
    #[inline]
    fn value(&self, slot: usize) -> T {
        self.values.get(slot).copied().unwrap_or_default()
    }

    /// For Linear/Step the index is used directly; for CubicSpline the
    /// value sits at `index * 3 + 1`.
    fn get_value_at(&self, index: usize) -> T {
        match self.interpolation {
            InterpolationMode::CubicSpline => self.value(index * 3 + 1),
            _ => self.value(index),
        }
    }

    fn sample_at_frame(&self, index: usize, time: f32) -> T {
        let len = self.times.len();

        if index >= len - 1 {
            return self.get_value_at(len - 1);
        }

        let next_idx = index + 1;
        let t0 = self.times[index];
        let t1 = self.times[next_idx];
        let dt = t1 - t0;

        let t = if dt > 1e-6 { (time - t0) / dt } else { 0.0 };
        let t = t.clamp(0.0, 1.0);

        match self.interpolation {
            InterpolationMode::Step => self.get_value_at(index),
            InterpolationMode::Linear => {
                let v0 = self.get_value_at(index);
                let v1 = self.get_value_at(next_idx);
                T::interpolate_linear(v0, v1, t)
            }
            InterpolationMode::CubicSpline => {
                let i_prev = index * 3;
                let i_next = next_idx * 3;

                let v0 = self.value(i_prev + 1);
                let out_tangent0 = self.value(i_prev + 2);
                let in_tangent1 = self.value(i_next);
                let v1 = self.value(i_next + 1);

                T::interpolate_cubic(v0, out_tangent0, in_tangent1, v1, t, dt)
            }
        }
    }
}
