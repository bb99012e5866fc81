#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Skinned-avatar animation playback.
//!
//! Loads skinned meshes and motion clips ([`assets`]), adapts clips to each
//! mesh's skeleton by joint name ([`animation::adapt`]) and plays them per
//! instance under a host-driven `tick` ([`playback`]). [`AvatarStage`] wires
//! the three together for a fixed set of avatars sharing one motion.

pub mod animation;
pub mod assets;
pub mod config;
pub mod errors;
pub mod playback;
pub mod scene;
pub mod stage;
pub mod utils;

pub use animation::{AdaptedClip, AnimationMixer, LoopMode, MotionClip, adapt};
pub use assets::{AssetFormat, AssetReader, AssetRef, AssetServer, FileAssetReader};
pub use config::{AvatarConfig, StageConfig};
pub use errors::{Error, Result};
pub use playback::{BindOptions, InstanceKey, PlaybackController, PlaybackState};
pub use scene::{MaterialOverride, MeshAsset, Pose, Transform};
pub use stage::{AvatarStage, MotionUpdate};
pub use utils::FrameClock;
