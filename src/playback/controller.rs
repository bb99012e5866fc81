use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use slotmap::{SlotMap, new_key_type};

use crate::animation::AdaptedClip;
use crate::errors::{Error, Result};
use crate::playback::instance::{BindOptions, PlaybackInstance, PlaybackState};
use crate::scene::{MeshAsset, Transform};

new_key_type! {
    pub struct InstanceKey;
}

type SharedInstance = Arc<Mutex<PlaybackInstance>>;

/// A motion replacement in flight.
///
/// Carries the sequence number stamped on every target instance and the
/// mesh each target needs the clip adapted to.
#[derive(Debug, Clone)]
pub struct MotionRequest {
    pub seq: u64,
    pub targets: Vec<(InstanceKey, Arc<MeshAsset>)>,
}

/// What happened to a completed request on one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Applied,
    /// A newer request owns the instance; the result was discarded.
    Superseded,
}

/// Owns every playback instance and drives them frame by frame.
///
/// All methods take `&self`. Each instance sits behind its own mutex, so a
/// `tick` and a `play` on the same instance never interleave.
#[derive(Default)]
pub struct PlaybackController {
    instances: RwLock<SlotMap<InstanceKey, SharedInstance>>,
    last_seq: AtomicU64,
}

impl PlaybackController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Creates an instance of `mesh`. The instance starts `Unloaded`, in
    /// bind pose, with its render copy built from `options.overrides`.
    pub fn bind(&self, mesh: Arc<MeshAsset>, options: BindOptions) -> InstanceKey {
        let instance = PlaybackInstance::new(mesh, options);
        log::debug!(
            "Bound instance '{}' ({} render meshes)",
            instance.name(),
            instance.render().meshes.len()
        );
        self.instances
            .write()
            .insert(Arc::new(Mutex::new(instance)))
    }

    /// Destroys an instance. Returns whether it existed.
    pub fn unbind(&self, key: InstanceKey) -> bool {
        self.instances.write().remove(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// Live instance keys.
    #[must_use]
    pub fn keys(&self) -> Vec<InstanceKey> {
        self.instances.read().keys().collect()
    }

    #[must_use]
    pub fn contains(&self, key: InstanceKey) -> bool {
        self.instances.read().contains_key(key)
    }

    fn instance(&self, key: InstanceKey) -> Result<SharedInstance> {
        self.instances
            .read()
            .get(key)
            .cloned()
            .ok_or(Error::InstanceNotFound)
    }

    #[must_use]
    pub fn state(&self, key: InstanceKey) -> Option<PlaybackState> {
        let instance = self.instance(key).ok()?;
        let state = instance.lock().state();
        Some(state)
    }

    /// Runs `f` with the instance locked.
    pub fn with_instance<T>(
        &self,
        key: InstanceKey,
        f: impl FnOnce(&PlaybackInstance) -> T,
    ) -> Option<T> {
        let instance = self.instance(key).ok()?;
        let guard = instance.lock();
        Some(f(&guard))
    }

    pub fn set_placement(&self, key: InstanceKey, placement: Transform) -> Result<()> {
        self.instance(key)?.lock().set_placement(placement);
        Ok(())
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Replaces whatever `key` plays with `clip`, starting at t = 0.
    pub fn play(&self, key: InstanceKey, clip: AdaptedClip) -> Result<()> {
        self.instance(key)?.lock().play(clip)
    }

    /// Blends `key` to `clip` over `seconds`.
    pub fn crossfade(&self, key: InstanceKey, clip: AdaptedClip, seconds: f32) -> Result<()> {
        self.instance(key)?.lock().crossfade(clip, seconds)
    }

    /// Advances every instance that has an action by `dt` seconds.
    ///
    /// A zero delta leaves every pose untouched; negative or non-finite
    /// deltas are ignored.
    pub fn tick(&self, dt: f32) {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("Ignoring invalid frame delta {dt}");
            return;
        }
        if dt == 0.0 {
            return;
        }

        let instances = self.instances.read();
        for instance in instances.values() {
            instance.lock().tick(dt);
        }
    }

    // ========================================================================
    // Motion requests
    // ========================================================================

    /// Sequence number of the newest request.
    #[must_use]
    pub fn latest_motion_seq(&self) -> u64 {
        self.last_seq.load(Ordering::Acquire)
    }

    /// Starts a motion replacement for every bound instance.
    ///
    /// Each instance moves to `Pending` and remembers the new sequence
    /// number; results of older requests are discarded from now on.
    pub fn begin_motion_request(&self) -> MotionRequest {
        let seq = self.last_seq.fetch_add(1, Ordering::AcqRel) + 1;
        let instances = self.instances.read();
        let targets = instances
            .iter()
            .map(|(key, instance)| {
                let mut guard = instance.lock();
                guard.begin_request(seq);
                (key, guard.mesh().clone())
            })
            .collect();
        MotionRequest { seq, targets }
    }

    /// Delivers the outcome of request `seq` for one instance.
    ///
    /// A stale `seq` is discarded and reported as superseded. A failed
    /// result, or a clip the instance cannot play, returns the instance to
    /// its pre-request state and is returned as the error.
    pub fn complete_motion_request(
        &self,
        seq: u64,
        key: InstanceKey,
        result: Result<AdaptedClip>,
    ) -> Result<RequestOutcome> {
        let instance = self.instance(key)?;
        let mut guard = instance.lock();

        if guard.motion_seq() != seq {
            log::debug!(
                "Discarding motion #{seq} for '{}', #{} is newer",
                guard.name(),
                guard.motion_seq()
            );
            return Ok(RequestOutcome::Superseded);
        }

        match result.and_then(|clip| guard.play(clip)) {
            Ok(()) => Ok(RequestOutcome::Applied),
            Err(e) => {
                guard.revert();
                log::warn!(
                    "Motion #{seq} rejected for '{}': {e}; staying {:?}",
                    guard.name(),
                    guard.state()
                );
                Err(e)
            }
        }
    }

    /// Fails request `seq` on every instance still waiting for it. Returns
    /// how many instances were reverted.
    pub fn fail_motion_request(&self, seq: u64, error: &Error) -> usize {
        let instances = self.instances.read();
        let mut reverted = 0;
        for instance in instances.values() {
            let mut guard = instance.lock();
            if guard.motion_seq() == seq && guard.state() == PlaybackState::Pending {
                guard.revert();
                reverted += 1;
            }
        }
        if reverted > 0 {
            log::warn!("Motion #{seq} failed: {error}; {reverted} instance(s) keep their previous state");
        }
        reverted
    }
}
