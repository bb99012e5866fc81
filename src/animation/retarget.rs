//! Clip adaptation.
//!
//! Rebuilds a raw clip's tracks against a target skeleton by joint name.
//! Tracks whose joint is missing from the target are dropped; timing and
//! sample rate are kept as-is and bone lengths are not corrected, so large
//! proportion differences between rigs show up as distorted motion.

use crate::animation::binding::{PropertyBinding, TargetPath};
use crate::animation::clip::{MotionClip, TrackData};
use crate::errors::{Error, Result};
use crate::scene::mesh_asset::MeshAsset;

/// A track bound to a joint of the target skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedTrack {
    /// Joint index in the target skeleton.
    pub joint: usize,
    /// Target joint name.
    pub joint_name: String,
    /// Joint name in the source clip.
    pub source_name: String,
    pub target: TargetPath,
    pub data: TrackData,
}

/// A clip rebuilt for one mesh asset's skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedClip {
    pub name: String,
    pub duration: f32,
    /// Name of the mesh asset the clip was adapted to.
    pub mesh: String,
    pub tracks: Vec<AdaptedTrack>,
    /// Source joint names with no counterpart in the target, in clip order.
    pub dropped: Vec<String>,
}

impl AdaptedClip {
    #[inline]
    #[must_use]
    pub fn matched_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Distinct target joint names in track order.
    #[must_use]
    pub fn joint_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for track in &self.tracks {
            if !names.contains(&track.joint_name.as_str()) {
                names.push(&track.joint_name);
            }
        }
        names
    }

    /// Resolves each track to the node it drives in `asset`.
    #[must_use]
    pub fn bindings(&self, asset: &MeshAsset) -> Vec<PropertyBinding> {
        self.tracks
            .iter()
            .enumerate()
            .filter_map(|(track_index, track)| {
                let joint = asset.skeleton.joint(track.joint)?;
                Some(PropertyBinding {
                    track_index,
                    node: joint.node,
                    target: track.target,
                })
            })
            .collect()
    }
}

/// Adapts `clip` to `target`'s skeleton.
///
/// Joint lookup tries the exact name first, then the normalized name (see
/// [`normalize_joint_name`](crate::scene::normalize_joint_name)). Fails with
/// [`Error::IncompatibleSkeleton`] only when no track matches at all.
pub fn adapt(clip: &MotionClip, target: &MeshAsset) -> Result<AdaptedClip> {
    let skeleton = &target.skeleton;
    let mut tracks = Vec::with_capacity(clip.tracks.len());
    let mut dropped: Vec<String> = Vec::new();

    for track in &clip.tracks {
        let source_name = &track.meta.joint_name;
        match skeleton.find(source_name) {
            Some(joint) => {
                let joint_name = skeleton
                    .joint(joint)
                    .map(|j| j.name.clone())
                    .unwrap_or_default();
                tracks.push(AdaptedTrack {
                    joint,
                    joint_name,
                    source_name: source_name.clone(),
                    target: track.meta.target,
                    data: track.data.clone(),
                });
            }
            None => {
                if !dropped.contains(source_name) {
                    dropped.push(source_name.clone());
                }
            }
        }
    }

    if tracks.is_empty() {
        return Err(Error::IncompatibleSkeleton {
            clip: clip.name.clone(),
            mesh: target.name.clone(),
        });
    }

    if !dropped.is_empty() {
        log::debug!(
            "Clip '{}' -> '{}': {} joint(s) without a match dropped: {:?}",
            clip.name,
            target.name,
            dropped.len(),
            dropped
        );
    }

    Ok(AdaptedClip {
        name: clip.name.clone(),
        duration: clip.duration,
        mesh: target.name.clone(),
        tracks,
        dropped,
    })
}
