//! Post-load traversal of a mesh asset.
//!
//! Visual overrides are applied by walking the shared asset and producing a
//! render-ready copy; the asset itself is never mutated.

use crate::scene::material::{MaterialDesc, MaterialOverride};
use crate::scene::mesh_asset::MeshAsset;
use crate::scene::node::{NodeKind, SceneNode};

/// Callback for a depth-first, pre-order walk over an asset's nodes.
pub trait NodeVisitor {
    fn visit(&mut self, index: usize, node: &SceneNode);
}

impl<F: FnMut(usize, &SceneNode)> NodeVisitor for F {
    fn visit(&mut self, index: usize, node: &SceneNode) {
        self(index, node);
    }
}

/// Walks every node reachable from the asset's roots, parents first.
pub fn walk(asset: &MeshAsset, visitor: &mut impl NodeVisitor) {
    let mut visited = vec![false; asset.nodes.len()];
    let mut stack: Vec<usize> = asset.roots.iter().rev().copied().collect();

    while let Some(index) = stack.pop() {
        let Some(node) = asset.node(index) else {
            continue;
        };
        if std::mem::replace(&mut visited[index], true) {
            continue;
        }
        visitor.visit(index, node);
        stack.extend(node.children.iter().rev().copied());
    }
}

/// Per-instance visual options applied when building a render copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualOverrides {
    pub material: Option<MaterialOverride>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl VisualOverrides {
    /// Shadows on, materials as authored.
    #[must_use]
    pub fn shadowed() -> Self {
        Self {
            material: None,
            cast_shadow: true,
            receive_shadow: true,
        }
    }

    #[must_use]
    pub fn with_material(mut self, material: MaterialOverride) -> Self {
        self.material = Some(material);
        self
    }
}

/// A mesh node as the host should draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderMesh {
    /// Node index in the source asset (and in the instance pose).
    pub node: usize,
    pub skin: Option<usize>,
    /// One material per primitive.
    pub materials: Vec<MaterialDesc>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

/// Render-ready copy of an asset's drawables for one instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderModel {
    pub meshes: Vec<RenderMesh>,
    pub overridden: bool,
}

impl RenderModel {
    #[must_use]
    pub fn build(asset: &MeshAsset, overrides: &VisualOverrides) -> Self {
        let mut builder = RenderModelBuilder {
            overrides,
            meshes: Vec::new(),
        };
        walk(asset, &mut builder);

        Self {
            meshes: builder.meshes,
            overridden: overrides.material.is_some(),
        }
    }

    /// Iterates every material of every mesh.
    pub fn materials(&self) -> impl Iterator<Item = &MaterialDesc> {
        self.meshes.iter().flat_map(|m| m.materials.iter())
    }
}

struct RenderModelBuilder<'a> {
    overrides: &'a VisualOverrides,
    meshes: Vec<RenderMesh>,
}

impl NodeVisitor for RenderModelBuilder<'_> {
    fn visit(&mut self, index: usize, node: &SceneNode) {
        let NodeKind::Mesh(part) = &node.kind else {
            return;
        };

        let materials = part
            .primitives
            .iter()
            .map(|p| match &self.overrides.material {
                Some(over) => over.apply_to(&p.material),
                None => p.material.clone(),
            })
            .collect();

        self.meshes.push(RenderMesh {
            node: index,
            skin: part.skin,
            materials,
            cast_shadow: self.overrides.cast_shadow,
            receive_shadow: self.overrides.receive_shadow,
        });
    }
}
