//! Skeletal animation: keyframe tracks, raw motion clips, clip adaptation
//! onto a target skeleton, play-heads and the per-instance mixer.

pub mod action;
pub mod binding;
pub mod clip;
pub mod mixer;
pub mod retarget;
pub mod tracks;
pub mod values;

pub use action::{AnimationAction, LoopMode};
pub use binding::{PropertyBinding, TargetPath, TrackValue};
pub use clip::{MotionClip, Track, TrackData, TrackMeta};
pub use mixer::AnimationMixer;
pub use retarget::{AdaptedClip, AdaptedTrack, adapt};
pub use tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack};
