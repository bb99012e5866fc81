use crate::animation::binding::{PropertyBinding, TrackValue};
use crate::animation::retarget::AdaptedClip;
use crate::animation::tracks::KeyframeCursor;
use crate::scene::mesh_asset::MeshAsset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Stop at either end and pause.
    Once,
    #[default]
    Loop,
    /// Bounce between the ends.
    PingPong,
}

impl LoopMode {
    /// Maps an unbounded play-head onto `[0, duration]`.
    ///
    /// The flag is set when playback hit an end it stops at.
    #[must_use]
    pub fn wrap(self, time: f32, duration: f32) -> (f32, bool) {
        match self {
            Self::Once => {
                if time >= duration {
                    (duration, true)
                } else if time < 0.0 {
                    (0.0, true)
                } else {
                    (time, false)
                }
            }
            Self::Loop => {
                let t = time.rem_euclid(duration);
                // Tiny negative times can round up to `duration`.
                (if t >= duration { 0.0 } else { t }, false)
            }
            Self::PingPong => {
                let period = duration * 2.0;
                let t = time.rem_euclid(period);
                (if t > duration { period - t } else { t }, false)
            }
        }
    }
}

/// Play-head over one adapted clip.
///
/// Owns its clip: adapted clips are never shared between instances, so two
/// avatars playing "the same" motion never share a play-head.
#[derive(Debug, Clone)]
pub struct AnimationAction {
    pub(crate) clip: AdaptedClip,

    pub time: f32,
    pub time_scale: f32,
    pub weight: f32,
    pub loop_mode: LoopMode,
    pub paused: bool,
    pub enabled: bool,

    pub bindings: Vec<PropertyBinding>,

    pub(crate) track_cursors: Vec<KeyframeCursor>,
}

impl AnimationAction {
    /// A looping action at t = 0, bound to `asset`'s nodes.
    #[must_use]
    pub fn new(clip: AdaptedClip, asset: &MeshAsset) -> Self {
        let bindings = clip.bindings(asset);
        let track_cursors = vec![KeyframeCursor::default(); clip.tracks.len()];
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            weight: 1.0,
            loop_mode: LoopMode::default(),
            paused: false,
            enabled: true,
            bindings,
            track_cursors,
        }
    }

    #[must_use]
    pub fn clip(&self) -> &AdaptedClip {
        &self.clip
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.weight > 0.0
    }

    /// Advances the play-head by `dt` scaled seconds.
    pub fn update(&mut self, dt: f32) {
        let duration = self.clip.duration;
        if self.paused || !self.enabled || duration <= 0.0 {
            return;
        }

        let (time, stopped) = self
            .loop_mode
            .wrap(self.time + dt * self.time_scale, duration);
        self.time = time;
        self.paused |= stopped;
    }

    /// Value of track `track_index` at the current time.
    pub fn sample_track(&mut self, track_index: usize) -> Option<TrackValue> {
        let track = self.clip.tracks.get(track_index)?;
        let cursor = self.track_cursors.get_mut(track_index)?;
        Some(track.data.sample_with_cursor(self.time, cursor))
    }
}
