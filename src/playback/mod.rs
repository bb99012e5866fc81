//! Playback of adapted clips on bound avatar instances.
//!
//! The [`PlaybackController`] owns the instances. Hosts call
//! [`tick`](PlaybackController::tick) once per frame and read poses through
//! [`with_instance`](PlaybackController::with_instance).
//!
//! Motion replacement is split in two so loading can happen elsewhere:
//! [`begin_motion_request`](PlaybackController::begin_motion_request) stamps
//! every instance with a sequence number, and
//! [`complete_motion_request`](PlaybackController::complete_motion_request)
//! applies a result only if that number is still the instance's newest.

pub mod controller;
pub mod instance;

pub use controller::{InstanceKey, MotionRequest, PlaybackController, RequestOutcome};
pub use instance::{BindOptions, PlaybackInstance, PlaybackState};
