use std::time::{Duration, Instant};

/// Produces per-frame deltas for [`tick`](crate::playback::PlaybackController::tick).
///
/// Real-time clocks measure wall time between calls; fixed-step clocks
/// return the same delta every frame (headless runs, tests).
#[derive(Debug, Clone)]
pub struct FrameClock {
    mode: ClockMode,
    /// Time since last tick
    pub delta: Duration,
    /// Sum of all deltas
    pub elapsed: Duration,
    /// Total number of ticks
    pub frame_count: u64,
}

#[derive(Debug, Clone, Copy)]
enum ClockMode {
    RealTime { last_update: Instant },
    Fixed { step: Duration },
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::real_time()
    }
}

impl FrameClock {
    /// Wall-clock deltas, starting from now.
    #[must_use]
    pub fn real_time() -> Self {
        Self::with_mode(ClockMode::RealTime {
            last_update: Instant::now(),
        })
    }

    /// A constant `step` per tick.
    #[must_use]
    pub fn fixed(step: Duration) -> Self {
        Self::with_mode(ClockMode::Fixed { step })
    }

    /// A constant step of `1 / fps` seconds.
    #[must_use]
    pub fn fixed_fps(fps: u32) -> Self {
        Self::fixed(Duration::from_secs(1) / fps.max(1))
    }

    fn with_mode(mode: ClockMode) -> Self {
        Self {
            mode,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Advances one frame and returns its delta in seconds.
    pub fn tick(&mut self) -> f32 {
        self.delta = match &mut self.mode {
            ClockMode::RealTime { last_update } => {
                let now = Instant::now();
                let delta = now - *last_update;
                *last_update = now;
                delta
            }
            ClockMode::Fixed { step } => *step,
        };
        self.elapsed += self.delta;
        self.frame_count += 1;
        self.dt_seconds()
    }

    #[must_use]
    pub fn dt_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self.mode, ClockMode::Fixed { .. })
    }
}
