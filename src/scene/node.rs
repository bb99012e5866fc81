use crate::scene::material::MaterialDesc;
use crate::scene::transform::Transform;

/// One drawable primitive of a mesh node.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPrimitive {
    pub material: MaterialDesc,
    pub vertex_count: usize,
    pub index_count: Option<usize>,
}

/// Mesh component of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub mesh_name: Option<String>,
    pub primitives: Vec<MeshPrimitive>,
    /// Index into `Skeleton::skins` when the mesh is skinned.
    pub skin: Option<usize>,
}

/// What a node is, as a closed set of variants.
///
/// Traversals match on this instead of probing node capabilities at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pure grouping / transform node.
    Group,
    /// A node carrying mesh geometry.
    Mesh(MeshPart),
    /// A skeleton joint; `joint` indexes `Skeleton::joints`.
    Bone { joint: usize },
}

/// A node of a loaded asset's graph.
///
/// Children and parent are indices into the owning asset's flat node list.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Bind-pose local transform.
    pub transform: Transform,
    pub kind: NodeKind,
}

impl SceneNode {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform: Transform::IDENTITY,
            kind: NodeKind::Group,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }

    #[inline]
    #[must_use]
    pub fn joint(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Bone { joint } => Some(joint),
            _ => None,
        }
    }
}
