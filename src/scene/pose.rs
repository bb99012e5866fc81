use glam::{Affine3A, Mat4};

use crate::scene::mesh_asset::MeshAsset;
use crate::scene::transform::Transform;

/// Per-instance local transforms for every node of a mesh asset.
///
/// This is the only state the mixer writes; the shared asset keeps its
/// bind pose, and a copy of it is kept here as the rest values channels
/// fall back to.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    locals: Vec<Transform>,
    rest: Vec<Transform>,
}

impl Pose {
    /// The asset's bind pose.
    #[must_use]
    pub fn bind(asset: &MeshAsset) -> Self {
        let locals = asset.bind_transforms();
        Self {
            rest: locals.clone(),
            locals,
        }
    }

    /// Restores the bind pose in place.
    pub fn reset(&mut self, asset: &MeshAsset) {
        self.rest.clear();
        self.rest.extend(asset.nodes.iter().map(|n| n.transform));
        self.locals.clone_from(&self.rest);
    }

    /// Bind transform of `node`.
    #[inline]
    #[must_use]
    pub fn rest(&self, node: usize) -> Option<&Transform> {
        self.rest.get(node)
    }

    #[inline]
    #[must_use]
    pub fn local(&self, node: usize) -> Option<&Transform> {
        self.locals.get(node)
    }

    #[inline]
    pub fn local_mut(&mut self, node: usize) -> Option<&mut Transform> {
        self.locals.get_mut(node)
    }

    #[inline]
    #[must_use]
    pub fn locals(&self) -> &[Transform] {
        &self.locals
    }

    /// World matrices of every node, with `root` applied above the asset's
    /// root nodes (the instance placement).
    #[must_use]
    pub fn world_matrices(&self, asset: &MeshAsset, root: Affine3A) -> Vec<Affine3A> {
        let mut world = vec![Affine3A::IDENTITY; self.locals.len()];
        let mut stack: Vec<(usize, Affine3A)> =
            asset.roots.iter().rev().map(|&r| (r, root)).collect();

        while let Some((node, parent_world)) = stack.pop() {
            let Some(local) = self.locals.get(node) else {
                continue;
            };
            let node_world = parent_world * local.matrix();
            world[node] = node_world;
            if let Some(scene_node) = asset.node(node) {
                for &child in scene_node.children.iter().rev() {
                    stack.push((child, node_world));
                }
            }
        }
        world
    }

    /// Joint matrices for skin `skin` of `asset`, in palette order:
    /// `mesh_world_inv * joint_world * inverse_bind`.
    #[must_use]
    pub fn skinning_matrices(
        &self,
        asset: &MeshAsset,
        skin: usize,
        mesh_world_inv: Affine3A,
    ) -> Vec<Mat4> {
        let Some(skin) = asset.skeleton.skins().get(skin) else {
            return Vec::new();
        };
        let world = self.world_matrices(asset, Affine3A::IDENTITY);

        skin.joints
            .iter()
            .zip(&skin.inverse_bind_matrices)
            .map(|(&joint, ibm)| {
                let joint_world = asset
                    .skeleton
                    .joint(joint)
                    .and_then(|j| world.get(j.node).copied())
                    .unwrap_or(Affine3A::IDENTITY);
                Mat4::from(mesh_world_inv * joint_world * *ibm)
            })
            .collect()
    }
}
