//! Scene data of a loaded avatar.
//!
//! - [`MeshAsset`]: shared, immutable node graph plus skeleton
//! - [`SceneNode`] / [`NodeKind`]: tagged node variants (group, mesh, bone)
//! - [`Skeleton`]: named joints, skins and name lookup
//! - [`Pose`]: per-instance local transforms written by the mixer
//! - [`visit`]: traversal and the render-ready copy with visual overrides

pub mod material;
pub mod mesh_asset;
pub mod node;
pub mod pose;
pub mod skeleton;
pub mod transform;
pub mod visit;

pub use material::{MaterialDesc, MaterialOverride, Shading};
pub use mesh_asset::{MeshAsset, MeshAssetBuilder};
pub use node::{MeshPart, MeshPrimitive, NodeKind, SceneNode};
pub use pose::Pose;
pub use skeleton::{Joint, Skeleton, Skin, normalize_joint_name};
pub use transform::Transform;
pub use visit::{NodeVisitor, RenderMesh, RenderModel, VisualOverrides};
