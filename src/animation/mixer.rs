use crate::animation::action::AnimationAction;
use crate::animation::binding::PropertyBinding;
use crate::scene::pose::Pose;

#[derive(Debug, Clone, Copy)]
struct CrossFade {
    duration: f32,
    elapsed: f32,
}

/// Drives the actions of one avatar instance and writes its pose.
///
/// A mixer holds at most one current action. Blending only happens during
/// an explicit [`crossfade`](Self::crossfade); [`play`](Self::play) swaps
/// the action outright.
#[derive(Debug, Default)]
pub struct AnimationMixer {
    current: Option<AnimationAction>,
    outgoing: Option<AnimationAction>,
    fade: Option<CrossFade>,
    /// Channels only the outgoing action drives.
    released: Vec<PropertyBinding>,
}

impl AnimationMixer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever is playing with `action`.
    pub fn play(&mut self, action: AnimationAction) {
        self.outgoing = None;
        self.fade = None;
        self.released.clear();
        self.current = Some(action);
    }

    /// Blends from the current action to `action` over `duration` seconds.
    ///
    /// Channels the new action does not drive blend back to the bind pose
    /// over the same duration.
    ///
    /// Without a current action (or with a non-positive duration) this is
    /// a plain [`play`](Self::play).
    pub fn crossfade(&mut self, mut action: AnimationAction, duration: f32) {
        let Some(outgoing) = self.current.take() else {
            self.play(action);
            return;
        };
        if duration <= 0.0 || !duration.is_finite() {
            self.play(action);
            return;
        }
        action.weight = 0.0;
        self.released = outgoing
            .bindings
            .iter()
            .filter(|b| !action.bindings.iter().any(|c| c.same_channel(b)))
            .copied()
            .collect();
        self.outgoing = Some(outgoing);
        self.current = Some(action);
        self.fade = Some(CrossFade {
            duration,
            elapsed: 0.0,
        });
    }

    /// Drops every action.
    pub fn stop(&mut self) {
        self.current = None;
        self.outgoing = None;
        self.fade = None;
        self.released.clear();
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<&AnimationAction> {
        self.current.as_ref()
    }

    #[inline]
    pub fn current_mut(&mut self) -> Option<&mut AnimationAction> {
        self.current.as_mut()
    }

    #[inline]
    #[must_use]
    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    #[inline]
    #[must_use]
    pub fn has_action(&self) -> bool {
        self.current.is_some()
    }

    /// Advances time and writes the resulting pose.
    pub fn update(&mut self, dt: f32, pose: &mut Pose) {
        self.advance(dt);
        self.apply(pose);
    }

    /// Advances every action's time and the cross-fade weights.
    pub fn advance(&mut self, dt: f32) {
        if let Some(action) = &mut self.outgoing {
            action.update(dt);
        }
        if let Some(action) = &mut self.current {
            action.update(dt);
        }

        if let Some(fade) = &mut self.fade {
            fade.elapsed += dt;
            let w = (fade.elapsed / fade.duration).clamp(0.0, 1.0);
            if let Some(action) = &mut self.current {
                action.weight = w;
            }
            if w >= 1.0 {
                self.outgoing = None;
                self.fade = None;
            }
        }
    }

    /// Writes the pose for the current time without advancing it.
    pub fn apply(&mut self, pose: &mut Pose) {
        if let Some(action) = &mut self.outgoing {
            apply_action(action, pose, 1.0);
            let weight = self.current.as_ref().map_or(1.0, |a| a.weight);
            release_channels(&self.released, pose, weight);
        } else if !self.released.is_empty() {
            // Fade finished: settle the released channels once.
            release_channels(&self.released, pose, 1.0);
            self.released.clear();
        }
        if let Some(action) = &mut self.current {
            let weight = action.weight;
            apply_action(action, pose, weight);
        }
    }
}

/// Blends each binding's channel towards the pose's rest value.
fn release_channels(bindings: &[PropertyBinding], pose: &mut Pose, weight: f32) {
    if weight <= 0.0 {
        return;
    }
    for binding in bindings {
        let Some(rest) = pose.rest(binding.node).copied() else {
            continue;
        };
        if let Some(local) = pose.local_mut(binding.node) {
            binding.write(local, binding.read(&rest), weight);
        }
    }
}

fn apply_action(action: &mut AnimationAction, pose: &mut Pose, weight: f32) {
    if !action.enabled || weight <= 0.0 {
        return;
    }
    let weight = weight.min(1.0);
    let AnimationAction {
        clip,
        time,
        bindings,
        track_cursors,
        ..
    } = action;
    let time = *time;
    let tracks = &clip.tracks;

    for binding in bindings.iter() {
        let (Some(track), Some(cursor)) = (
            tracks.get(binding.track_index),
            track_cursors.get_mut(binding.track_index),
        ) else {
            continue;
        };
        if let Some(local) = pose.local_mut(binding.node) {
            binding.write(local, track.data.sample_with_cursor(time, cursor), weight);
        }
    }
}
