//! Where an adapted track writes in an instance's pose.

use glam::{Quat, Vec3};

use crate::scene::transform::Transform;

/// Local transform channel driven by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
}

/// One sampled keyframe value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackValue {
    Vector3(Vec3),
    Quaternion(Quat),
}

/// Track `track_index` of an action's clip drives `target` of pose node
/// `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyBinding {
    pub track_index: usize,
    pub node: usize,
    pub target: TargetPath,
}

impl PropertyBinding {
    /// The value of this binding's channel in `transform`.
    #[must_use]
    pub fn read(&self, transform: &Transform) -> TrackValue {
        match self.target {
            TargetPath::Translation => TrackValue::Vector3(transform.position),
            TargetPath::Rotation => TrackValue::Quaternion(transform.rotation),
            TargetPath::Scale => TrackValue::Vector3(transform.scale),
        }
    }

    #[inline]
    #[must_use]
    pub fn same_channel(&self, other: &Self) -> bool {
        self.node == other.node && self.target == other.target
    }

    /// Blends `value` into `local` by `weight`; a weight of one or more
    /// overwrites the channel.
    ///
    /// Returns `false` when the value kind does not fit the channel.
    pub fn write(&self, local: &mut Transform, value: TrackValue, weight: f32) -> bool {
        let full = weight >= 1.0;
        match (self.target, value) {
            (TargetPath::Translation, TrackValue::Vector3(v)) => {
                local.position = if full { v } else { local.position.lerp(v, weight) };
            }
            (TargetPath::Scale, TrackValue::Vector3(v)) => {
                local.scale = if full { v } else { local.scale.lerp(v, weight) };
            }
            (TargetPath::Rotation, TrackValue::Quaternion(q)) => {
                local.rotation = if full { q } else { local.rotation.slerp(q, weight) };
            }
            _ => return false,
        }
        true
    }
}
