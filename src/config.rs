//! Stage configuration.
//!
//! Every field has a default, so a JSON file only needs the keys it changes:
//!
//! ```json
//! {
//!   "asset_root": "public",
//!   "default_motion": "/walk.fbx",
//!   "load_timeout_secs": 10.0
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::assets::DEFAULT_LOAD_TIMEOUT;
use crate::errors::{Error, Result};
use crate::scene::material::GREEN;
use crate::scene::{MaterialOverride, Transform};

/// One avatar slot of the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Mesh reference: a path under the asset root or a `data:` URL.
    pub mesh: String,
    #[serde(default)]
    pub placement: Transform,
    #[serde(default)]
    pub material: Option<MaterialOverride>,
}

impl AvatarConfig {
    #[must_use]
    pub fn new(mesh: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: None,
            mesh: mesh.into(),
            placement: Transform::from_translation(position),
            material: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: MaterialOverride) -> Self {
        self.material = Some(material);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Directory path references are resolved against.
    pub asset_root: PathBuf,
    pub avatars: Vec<AvatarConfig>,
    /// Motion played on every avatar once loaded.
    pub default_motion: String,
    pub load_timeout_secs: f64,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            avatars: vec![
                AvatarConfig::new("./male.glb", Vec3::new(-0.5, -0.8, 2.0)).with_name("male"),
                AvatarConfig::new("./male2.glb", Vec3::new(0.5, -0.8, 2.0))
                    .with_name("male2")
                    .with_material(MaterialOverride::unlit(GREEN)),
            ],
            default_motion: "/animation.fbx".to_string(),
            load_timeout_secs: 30.0,
        }
    }
}

impl StageConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON file. A relative `asset_root` is taken relative to the
    /// file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&text)?;
        if config.asset_root.is_relative()
            && let Some(dir) = path.parent()
        {
            config.asset_root = dir.join(&config.asset_root);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let timeout = Duration::try_from_secs_f64(self.load_timeout_secs).map_err(|e| {
            Error::Config(format!(
                "load_timeout_secs {} is not a valid duration: {e}",
                self.load_timeout_secs
            ))
        })?;
        if timeout.is_zero() {
            return Err(Error::Config(format!(
                "load_timeout_secs must be positive, got {}",
                self.load_timeout_secs
            )));
        }
        if self.default_motion.trim().is_empty() {
            return Err(Error::Config("default_motion is empty".to_string()));
        }
        if let Some(i) = self.avatars.iter().position(|a| a.mesh.trim().is_empty()) {
            return Err(Error::Config(format!("avatar #{i} has no mesh reference")));
        }
        Ok(())
    }

    /// The configured load bound. A value that does not pass
    /// [`validate`](Self::validate) yields [`DEFAULT_LOAD_TIMEOUT`].
    #[must_use]
    pub fn load_timeout(&self) -> Duration {
        match Duration::try_from_secs_f64(self.load_timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => timeout,
            _ => {
                log::warn!(
                    "Invalid load_timeout_secs {}, using {DEFAULT_LOAD_TIMEOUT:?}",
                    self.load_timeout_secs
                );
                DEFAULT_LOAD_TIMEOUT
            }
        }
    }
}
