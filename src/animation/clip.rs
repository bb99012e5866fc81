use glam::{Quat, Vec3};

use crate::animation::binding::{TargetPath, TrackValue};
use crate::animation::tracks::{KeyframeCursor, KeyframeTrack};

#[derive(Debug, Clone, PartialEq)]
pub struct TrackMeta {
    /// Joint name as authored in the source skeleton.
    pub joint_name: String,
    pub target: TargetPath,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackData {
    Vector3(KeyframeTrack<Vec3>),
    Quaternion(KeyframeTrack<Quat>),
}

impl TrackData {
    #[must_use]
    pub fn end_time(&self) -> f32 {
        match self {
            TrackData::Vector3(track) => track.end_time(),
            TrackData::Quaternion(track) => track.end_time(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            TrackData::Vector3(track) => track.is_empty(),
            TrackData::Quaternion(track) => track.is_empty(),
        }
    }

    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self {
            TrackData::Vector3(track) => track.is_well_formed(),
            TrackData::Quaternion(track) => track.is_well_formed(),
        }
    }

    /// Samples at `time`, resuming the interval search from `cursor`.
    pub fn sample_with_cursor(&self, time: f32, cursor: &mut KeyframeCursor) -> TrackValue {
        match self {
            TrackData::Vector3(t) => TrackValue::Vector3(t.sample_with_cursor(time, cursor)),
            TrackData::Quaternion(t) => TrackValue::Quaternion(t.sample_with_cursor(time, cursor)),
        }
    }

    /// Whether the value type fits the property it drives.
    #[must_use]
    pub fn fits(&self, target: TargetPath) -> bool {
        matches!(
            (self, target),
            (TrackData::Vector3(_), TargetPath::Translation | TargetPath::Scale)
                | (TrackData::Quaternion(_), TargetPath::Rotation)
        )
    }
}

/// A complete track: metadata plus keyframes.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub meta: TrackMeta,
    pub data: TrackData,
}

/// A raw motion clip, keyed by the source skeleton's joint names.
///
/// Immutable once loaded; the asset cache hands it out as `Arc<MotionClip>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl MotionClip {
    /// Builds a clip; the duration is the last keyframe time over all tracks.
    ///
    /// Empty or malformed tracks are discarded.
    #[must_use]
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let name = name.into();
        let before = tracks.len();
        let tracks: Vec<Track> = tracks
            .into_iter()
            .filter(|t| !t.data.is_empty() && t.data.is_well_formed() && t.data.fits(t.meta.target))
            .collect();
        if tracks.len() != before {
            log::debug!(
                "Clip '{name}': discarded {} empty or malformed track(s)",
                before - tracks.len()
            );
        }

        let duration = tracks
            .iter()
            .map(|t| t.data.end_time())
            .fold(0.0_f32, f32::max);

        Self {
            name,
            duration,
            tracks,
        }
    }

    /// Distinct joint names in track order.
    #[must_use]
    pub fn joint_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for track in &self.tracks {
            if !names.contains(&track.meta.joint_name.as_str()) {
                names.push(&track.meta.joint_name);
            }
        }
        names
    }
}
