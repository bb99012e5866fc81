use std::sync::Arc;

use glam::{Affine3A, Mat4};

use crate::animation::{AdaptedClip, AnimationAction, AnimationMixer};
use crate::errors::{Error, Result};
use crate::scene::{MaterialOverride, MeshAsset, Pose, RenderModel, Transform, VisualOverrides};

/// Lifecycle of a playback instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// Bound, nothing to play yet.
    Unloaded,
    /// A new motion was requested and has not arrived. An instance that was
    /// playing keeps advancing its previous action meanwhile.
    Pending,
    /// An adapted clip is driving the pose.
    Playing,
}

/// How an instance is bound into the stage.
#[derive(Debug, Clone, PartialEq)]
pub struct BindOptions {
    pub name: Option<String>,
    /// Attachment point in the host scene.
    pub placement: Transform,
    pub overrides: VisualOverrides,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            name: None,
            placement: Transform::IDENTITY,
            overrides: VisualOverrides::shadowed(),
        }
    }
}

impl BindOptions {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_placement(mut self, placement: Transform) -> Self {
        self.placement = placement;
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: MaterialOverride) -> Self {
        self.overrides.material = Some(material);
        self
    }
}

/// One avatar on stage: a shared mesh asset plus everything private to
/// this copy of it.
#[derive(Debug)]
pub struct PlaybackInstance {
    name: String,
    mesh: Arc<MeshAsset>,
    placement: Transform,
    render: RenderModel,
    pose: Pose,
    mixer: AnimationMixer,
    state: PlaybackState,
    /// State to fall back to when a pending request fails.
    resume_state: PlaybackState,
    motion_seq: u64,
}

impl PlaybackInstance {
    pub(crate) fn new(mesh: Arc<MeshAsset>, options: BindOptions) -> Self {
        let render = RenderModel::build(&mesh, &options.overrides);
        let pose = Pose::bind(&mesh);
        Self {
            name: options.name.unwrap_or_else(|| mesh.name.clone()),
            mesh,
            placement: options.placement,
            render,
            pose,
            mixer: AnimationMixer::new(),
            state: PlaybackState::Unloaded,
            resume_state: PlaybackState::Unloaded,
            motion_seq: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self) -> &Arc<MeshAsset> {
        &self.mesh
    }

    #[inline]
    #[must_use]
    pub fn placement(&self) -> &Transform {
        &self.placement
    }

    #[inline]
    #[must_use]
    pub fn render(&self) -> &RenderModel {
        &self.render
    }

    #[inline]
    #[must_use]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    #[inline]
    #[must_use]
    pub fn motion_seq(&self) -> u64 {
        self.motion_seq
    }

    /// The clip currently driving the pose, if any.
    #[must_use]
    pub fn current_clip(&self) -> Option<&AdaptedClip> {
        self.mixer.current().map(AnimationAction::clip)
    }

    /// Play-head of the current action.
    #[must_use]
    pub fn time(&self) -> Option<f32> {
        self.mixer.current().map(|a| a.time)
    }

    /// World matrices of every node, placement included.
    #[must_use]
    pub fn world_matrices(&self) -> Vec<Affine3A> {
        self.pose.world_matrices(&self.mesh, self.placement.matrix())
    }

    /// Joint palette for `skin`, relative to the first mesh node using it.
    #[must_use]
    pub fn skinning_matrices(&self, skin: usize) -> Vec<Mat4> {
        let mesh_node = self
            .render
            .meshes
            .iter()
            .find(|m| m.skin == Some(skin))
            .map(|m| m.node);
        let mesh_world_inv = match mesh_node {
            Some(node) => self
                .pose
                .world_matrices(&self.mesh, Affine3A::IDENTITY)
                .get(node)
                .map_or(Affine3A::IDENTITY, Affine3A::inverse),
            None => Affine3A::IDENTITY,
        };
        self.pose.skinning_matrices(&self.mesh, skin, mesh_world_inv)
    }

    pub(crate) fn set_placement(&mut self, placement: Transform) {
        self.placement = placement;
    }

    fn check_target(&self, clip: &AdaptedClip) -> Result<()> {
        if clip.mesh == self.mesh.name {
            Ok(())
        } else {
            Err(Error::IncompatibleSkeleton {
                clip: clip.name.clone(),
                mesh: self.mesh.name.clone(),
            })
        }
    }

    /// Swaps in `clip` from its first frame.
    pub(crate) fn play(&mut self, clip: AdaptedClip) -> Result<()> {
        self.check_target(&clip)?;
        let action = AnimationAction::new(clip, &self.mesh);
        self.pose.reset(&self.mesh);
        self.mixer.play(action);
        self.mixer.apply(&mut self.pose);
        self.state = PlaybackState::Playing;
        self.resume_state = PlaybackState::Playing;
        Ok(())
    }

    /// Blends from whatever is playing to `clip` over `seconds`.
    pub(crate) fn crossfade(&mut self, clip: AdaptedClip, seconds: f32) -> Result<()> {
        self.check_target(&clip)?;
        if !self.mixer.has_action() {
            return self.play(clip);
        }
        let action = AnimationAction::new(clip, &self.mesh);
        self.mixer.crossfade(action, seconds);
        self.state = PlaybackState::Playing;
        self.resume_state = PlaybackState::Playing;
        Ok(())
    }

    pub(crate) fn tick(&mut self, dt: f32) {
        if self.mixer.has_action() {
            self.mixer.update(dt, &mut self.pose);
        }
    }

    pub(crate) fn begin_request(&mut self, seq: u64) {
        if self.state != PlaybackState::Pending {
            self.resume_state = self.state;
        }
        self.state = PlaybackState::Pending;
        self.motion_seq = seq;
    }

    pub(crate) fn revert(&mut self) {
        self.state = self.resume_state;
    }
}
