//! The avatar stage: configured meshes, one shared motion.
//!
//! ```rust,ignore
//! let stage = AvatarStage::from_config(StageConfig::default());
//! stage.load().await?;
//!
//! // file dropped on the viewport
//! stage.set_motion_source(bytes, "fbx").await?;
//!
//! // every frame
//! stage.tick(clock.tick());
//! ```

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::animation::adapt;
use crate::assets::{AssetReader, AssetRef, AssetServer, FileAssetReader};
use crate::config::StageConfig;
use crate::errors::{Error, Result};
use crate::playback::{BindOptions, InstanceKey, PlaybackController, RequestOutcome};
use crate::scene::VisualOverrides;

/// Result of a motion replacement.
#[derive(Debug)]
pub enum MotionUpdate {
    /// The clip now plays on `applied`; `rejected` kept their previous
    /// motion.
    Applied {
        applied: Vec<InstanceKey>,
        rejected: Vec<(InstanceKey, Error)>,
    },
    /// A newer replacement was requested before this one finished.
    Superseded,
}

impl MotionUpdate {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

pub struct AvatarStage<R: AssetReader = FileAssetReader> {
    config: StageConfig,
    assets: AssetServer<R>,
    controller: PlaybackController,
    avatars: RwLock<Vec<InstanceKey>>,
    /// Reference of the motion on stage, with the request that put it there.
    motion: Mutex<Option<(u64, AssetRef)>>,
}

impl AvatarStage<FileAssetReader> {
    /// Stage reading assets from `config.asset_root`.
    #[must_use]
    pub fn from_config(config: StageConfig) -> Self {
        let reader = FileAssetReader::new(&config.asset_root);
        Self::with_reader(config, reader)
    }
}

impl<R: AssetReader> AvatarStage<R> {
    #[must_use]
    pub fn with_reader(config: StageConfig, reader: R) -> Self {
        let assets = AssetServer::with_reader(reader).with_timeout(config.load_timeout());
        Self {
            config,
            assets,
            controller: PlaybackController::new(),
            avatars: RwLock::new(Vec::new()),
            motion: Mutex::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn assets(&self) -> &AssetServer<R> {
        &self.assets
    }

    #[inline]
    #[must_use]
    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    /// Instance keys in configuration order.
    #[must_use]
    pub fn avatars(&self) -> Vec<InstanceKey> {
        self.avatars.read().clone()
    }

    /// The motion currently on stage.
    #[must_use]
    pub fn current_motion(&self) -> Option<AssetRef> {
        self.motion.lock().as_ref().map(|(_, r)| r.clone())
    }

    /// Loads every configured mesh concurrently, binds them, then plays the
    /// default motion on all of them.
    ///
    /// A mesh failure aborts the whole load before anything is bound. If
    /// the default motion fails, its error is returned and the avatars stay
    /// bound and `Unloaded`.
    pub async fn load(&self) -> Result<Vec<InstanceKey>> {
        let references = self
            .config
            .avatars
            .iter()
            .map(|a| AssetRef::parse(&a.mesh))
            .collect::<Result<Vec<_>>>()?;

        let meshes = futures::future::try_join_all(
            references.iter().map(|r| self.assets.load_mesh(r)),
        )
        .await?;

        let mut keys = Vec::with_capacity(meshes.len());
        for (avatar, mesh) in self.config.avatars.iter().zip(meshes) {
            let mut overrides = VisualOverrides::shadowed();
            overrides.material.clone_from(&avatar.material);
            let options = BindOptions {
                name: avatar.name.clone(),
                placement: avatar.placement,
                overrides,
            };
            keys.push(self.controller.bind(mesh, options));
        }
        self.avatars.write().extend(keys.iter().copied());
        log::info!("Stage bound {} avatar(s)", keys.len());

        let default_motion = AssetRef::parse(&self.config.default_motion)?;
        self.set_motion_reference(default_motion).await?;
        Ok(keys)
    }

    /// File-drop entry point: `bytes` with the drop surface's format hint.
    pub async fn set_motion_source(
        &self,
        bytes: impl Into<Arc<[u8]>>,
        format_hint: &str,
    ) -> Result<MotionUpdate> {
        self.set_motion_reference(AssetRef::from_bytes(bytes, format_hint))
            .await
    }

    /// Replaces the motion of every avatar with the clip behind `reference`.
    ///
    /// The newest request wins: if another replacement starts before this
    /// one finishes, this one reports [`MotionUpdate::Superseded`] and
    /// touches nothing. If no avatar accepts the clip, the first rejection
    /// is returned and every avatar keeps its previous motion.
    pub async fn set_motion_reference(&self, reference: AssetRef) -> Result<MotionUpdate> {
        let request = self.controller.begin_motion_request();
        log::debug!(
            "Motion #{} requested: '{reference}' for {} instance(s)",
            request.seq,
            request.targets.len()
        );

        let clip = match self.assets.load_clip(&reference).await {
            Ok(clip) => clip,
            Err(e) => {
                let reverted = self.controller.fail_motion_request(request.seq, &e);
                if reverted == 0 && !request.targets.is_empty() {
                    return Ok(MotionUpdate::Superseded);
                }
                return Err(e);
            }
        };

        let mut applied = Vec::new();
        let mut rejected = Vec::new();
        for (key, mesh) in &request.targets {
            let result = adapt(&clip, mesh);
            match self
                .controller
                .complete_motion_request(request.seq, *key, result)
            {
                Ok(RequestOutcome::Applied) => applied.push(*key),
                Ok(RequestOutcome::Superseded) => {}
                Err(e) => rejected.push((*key, e)),
            }
        }

        if applied.is_empty() {
            if !rejected.is_empty() {
                let (_, e) = rejected.remove(0);
                return Err(e);
            }
            if !request.targets.is_empty() {
                return Ok(MotionUpdate::Superseded);
            }
        }

        self.commit_motion(request.seq, reference);
        Ok(MotionUpdate::Applied { applied, rejected })
    }

    /// Records `reference` as the motion on stage and evicts the clip it
    /// replaces. Older requests finishing late do not overwrite newer ones.
    fn commit_motion(&self, seq: u64, reference: AssetRef) {
        let previous = {
            let mut motion = self.motion.lock();
            if motion.as_ref().is_some_and(|(current, _)| *current > seq) {
                return;
            }
            motion.replace((seq, reference.clone()))
        };

        if let Some((_, previous)) = previous
            && previous.id() != reference.id()
        {
            self.assets.invalidate_clip(&previous);
        }
        log::info!("Motion '{reference}' on stage");
    }

    /// Advances every avatar by `dt` seconds.
    pub fn tick(&self, dt: f32) {
        self.controller.tick(dt);
    }
}
