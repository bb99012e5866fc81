use glam::Affine3A;
use rustc_hash::FxHashMap;

use crate::scene::transform::Transform;

/// A named joint of a skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    /// Index of the joint's node in the owning asset's node list.
    pub node: usize,
    /// Nearest ancestor that is also a joint.
    pub parent: Option<usize>,
    pub bind_pose: Transform,
}

/// A skin: the joint palette one skinned mesh is deformed by.
#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    pub name: String,
    /// Palette order; `joints[i]` corresponds to joint index `i` in the
    /// vertex data. Values index `Skeleton::joints`.
    pub joints: Vec<usize>,
    /// Static data: transforms vertices from mesh space to bone-local space.
    pub inverse_bind_matrices: Vec<Affine3A>,
    /// Position of the root bone inside `joints`.
    pub root_index: usize,
}

/// The joint hierarchy of a mesh asset, merged across its skins.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    joints: Vec<Joint>,
    skins: Vec<Skin>,
    by_name: FxHashMap<String, usize>,
    by_normalized: FxHashMap<String, usize>,
}

impl Skeleton {
    #[must_use]
    pub fn new(joints: Vec<Joint>, skins: Vec<Skin>) -> Self {
        let mut by_name = FxHashMap::default();
        let mut by_normalized = FxHashMap::default();
        for (index, joint) in joints.iter().enumerate() {
            // First joint wins on duplicate names.
            by_name.entry(joint.name.clone()).or_insert(index);
            by_normalized
                .entry(normalize_joint_name(&joint.name))
                .or_insert(index);
        }

        Self {
            joints,
            skins,
            by_name,
            by_normalized,
        }
    }

    #[inline]
    #[must_use]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[inline]
    #[must_use]
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    #[inline]
    #[must_use]
    pub fn skins(&self) -> &[Skin] {
        &self.skins
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Joint index by exact name.
    #[must_use]
    pub fn find_exact(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Joint index by exact name, falling back to the normalized name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.find_exact(name)
            .or_else(|| self.by_normalized.get(&normalize_joint_name(name)).copied())
    }

    /// Joint with no joint ancestor (first one, in joint order).
    #[must_use]
    pub fn root(&self) -> Option<usize> {
        self.joints.iter().position(|j| j.parent.is_none())
    }
}

impl PartialEq for Skeleton {
    fn eq(&self, other: &Self) -> bool {
        self.joints == other.joints && self.skins == other.skins
    }
}

const MIXAMO_PREFIX: &str = "mixamorig";

/// Canonical joint name used when exact names differ between rigs.
///
/// Strips any namespace up to the last `:` (`mixamorig:Hips` -> `Hips`),
/// a bare `mixamorig` prefix (`mixamorigHips` -> `Hips`), and lowercases.
#[must_use]
pub fn normalize_joint_name(name: &str) -> String {
    let name = name.rsplit(':').next().unwrap_or(name);
    let name = match name.get(..MIXAMO_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(MIXAMO_PREFIX) && name.len() > MIXAMO_PREFIX.len() => {
            &name[MIXAMO_PREFIX.len()..]
        }
        _ => name,
    };
    name.trim().to_ascii_lowercase()
}
