use glam::Vec4;
use serde::{Deserialize, Serialize};

/// Shading model a host should use for a mesh primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shading {
    /// Lit PBR shading, as authored in the source file.
    #[default]
    Standard,
    /// Flat, unlit colour (no lighting response).
    Unlit,
}

/// Material description carried by a mesh primitive.
///
/// Only what a host needs to pick a pipeline; textures stay with the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub name: Option<String>,
    pub shading: Shading,
    pub base_color: Vec4,
}

impl MaterialDesc {
    #[must_use]
    pub fn standard(base_color: Vec4) -> Self {
        Self {
            name: None,
            shading: Shading::Standard,
            base_color,
        }
    }
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self::standard(Vec4::ONE)
    }
}

/// Per-instance replacement for every mesh material of an avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialOverride {
    #[serde(default = "unlit")]
    pub shading: Shading,
    /// RGBA, linear.
    pub color: Vec4,
}

fn unlit() -> Shading {
    Shading::Unlit
}

impl MaterialOverride {
    /// Flat unlit colour.
    #[must_use]
    pub fn unlit(color: Vec4) -> Self {
        Self {
            shading: Shading::Unlit,
            color,
        }
    }

    /// The material this override substitutes for `original`.
    #[must_use]
    pub fn apply_to(&self, original: &MaterialDesc) -> MaterialDesc {
        MaterialDesc {
            name: original.name.as_ref().map(|n| format!("{n} (override)")),
            shading: self.shading,
            base_color: self.color,
        }
    }
}

/// CSS `green` (#008000) in linear space.
pub const GREEN: Vec4 = Vec4::new(0.0, 0.215_860_5, 0.0, 1.0);
