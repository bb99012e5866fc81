use glam::Affine3A;

use crate::errors::{Error, Result};
use crate::scene::node::{MeshPart, NodeKind, SceneNode};
use crate::scene::skeleton::{Joint, Skeleton, Skin};
use crate::scene::transform::Transform;

/// A loaded skinned model: a flat node graph plus its skeleton.
///
/// Immutable once built. The asset cache shares it as `Arc<MeshAsset>`
/// between every playback instance; instances copy what they mutate.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAsset {
    pub name: String,
    /// All nodes, flat; hierarchy via indices.
    pub nodes: Vec<SceneNode>,
    /// Indices of nodes without a parent.
    pub roots: Vec<usize>,
    pub skeleton: Skeleton,
}

impl MeshAsset {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> MeshAssetBuilder {
        MeshAssetBuilder::new(name)
    }

    #[inline]
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&SceneNode> {
        self.nodes.get(index)
    }

    /// First node with the given name, in index order.
    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Bind-pose local transforms of every node.
    #[must_use]
    pub fn bind_transforms(&self) -> Vec<Transform> {
        self.nodes.iter().map(|n| n.transform).collect()
    }

    /// Number of nodes carrying mesh geometry.
    #[must_use]
    pub fn mesh_node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_mesh()).count()
    }
}

struct PendingSkin {
    name: String,
    joint_nodes: Vec<usize>,
    inverse_bind_matrices: Option<Vec<Affine3A>>,
}

/// Incremental construction of a [`MeshAsset`], used by the decoders.
///
/// Nodes may be attached in any order; `build` validates the hierarchy,
/// tags joint nodes and assembles the skeleton.
pub struct MeshAssetBuilder {
    name: String,
    nodes: Vec<SceneNode>,
    skins: Vec<PendingSkin>,
}

impl MeshAssetBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            skins: Vec::new(),
        }
    }

    /// Adds a detached group node and returns its index.
    pub fn add_node(&mut self, name: impl Into<String>, transform: Transform) -> usize {
        let mut node = SceneNode::new(name);
        node.transform = transform;
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Parents `child` under `parent`. Fails on unknown indices, self
    /// parenting or a child that already has a parent.
    pub fn attach(&mut self, child: usize, parent: usize) -> Result<()> {
        if child == parent || child >= self.nodes.len() || parent >= self.nodes.len() {
            return Err(Error::decode(
                &self.name,
                format!("invalid node attachment {child} -> {parent}"),
            ));
        }
        if self.nodes[child].parent.is_some() {
            return Err(Error::decode(
                &self.name,
                format!("node {child} has more than one parent"),
            ));
        }
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        Ok(())
    }

    /// Gives a node mesh geometry.
    pub fn set_mesh(&mut self, node: usize, mesh: MeshPart) -> Result<()> {
        let Some(target) = self.nodes.get_mut(node) else {
            return Err(Error::decode(&self.name, format!("mesh on unknown node {node}")));
        };
        target.kind = NodeKind::Mesh(mesh);
        Ok(())
    }

    /// Registers a skin over `joint_nodes`; returns the skin index.
    ///
    /// Missing inverse bind matrices default to identity.
    pub fn add_skin(
        &mut self,
        name: impl Into<String>,
        joint_nodes: Vec<usize>,
        inverse_bind_matrices: Option<Vec<Affine3A>>,
    ) -> usize {
        self.skins.push(PendingSkin {
            name: name.into(),
            joint_nodes,
            inverse_bind_matrices,
        });
        self.skins.len() - 1
    }

    pub fn build(mut self) -> Result<MeshAsset> {
        self.check_acyclic()?;

        let node_count = self.nodes.len();

        // 1. Assign joint indices, skin by skin, first occurrence wins.
        let mut joint_of_node: Vec<Option<usize>> = vec![None; node_count];
        let mut joint_nodes: Vec<usize> = Vec::new();
        for skin in &self.skins {
            for &node in &skin.joint_nodes {
                if node >= node_count {
                    return Err(Error::decode(
                        &self.name,
                        format!("skin '{}' references unknown node {node}", skin.name),
                    ));
                }
                if joint_of_node[node].is_none() {
                    joint_of_node[node] = Some(joint_nodes.len());
                    joint_nodes.push(node);
                }
            }
        }

        // 2. Tag bone nodes and build joints.
        let mut joints = Vec::with_capacity(joint_nodes.len());
        for (joint_index, &node) in joint_nodes.iter().enumerate() {
            if matches!(self.nodes[node].kind, NodeKind::Group) {
                self.nodes[node].kind = NodeKind::Bone { joint: joint_index };
            }

            let mut parent = None;
            let mut cursor = self.nodes[node].parent;
            while let Some(ancestor) = cursor {
                if let Some(j) = joint_of_node[ancestor] {
                    parent = Some(j);
                    break;
                }
                cursor = self.nodes[ancestor].parent;
            }

            joints.push(Joint {
                name: self.nodes[node].name.clone(),
                node,
                parent,
                bind_pose: self.nodes[node].transform,
            });
        }

        // 3. Skins in palette order.
        let skins = self
            .skins
            .into_iter()
            .map(|pending| {
                let palette: Vec<usize> = pending
                    .joint_nodes
                    .iter()
                    .filter_map(|&n| joint_of_node[n])
                    .collect();

                let mut ibms = pending.inverse_bind_matrices.unwrap_or_default();
                ibms.resize(palette.len(), Affine3A::IDENTITY);

                // Root bone: explicit skeleton roots are not kept, so pick the
                // first palette joint whose parent lies outside the palette.
                let root_index = palette
                    .iter()
                    .position(|&j| joints[j].parent.is_none_or(|p| !palette.contains(&p)))
                    .unwrap_or(0);

                Skin {
                    name: pending.name,
                    joints: palette,
                    inverse_bind_matrices: ibms,
                    root_index,
                }
            })
            .collect();

        let roots = (0..node_count)
            .filter(|&i| self.nodes[i].parent.is_none())
            .collect();

        Ok(MeshAsset {
            name: self.name,
            nodes: self.nodes,
            roots,
            skeleton: Skeleton::new(joints, skins),
        })
    }

    fn check_acyclic(&self) -> Result<()> {
        for start in 0..self.nodes.len() {
            let mut steps = 0;
            let mut cursor = self.nodes[start].parent;
            while let Some(parent) = cursor {
                steps += 1;
                if steps > self.nodes.len() {
                    return Err(Error::decode(&self.name, "cyclic node hierarchy"));
                }
                cursor = self.nodes[parent].parent;
            }
        }
        Ok(())
    }
}
