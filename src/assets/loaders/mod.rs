//! Format decoders.
//!
//! Everything here is synchronous and CPU-bound; the asset server runs it on
//! the blocking pool.

pub mod fbx;
pub mod gltf;

pub use self::gltf::GltfLoader;

use crate::animation::MotionClip;
use crate::assets::source::AssetFormat;
use crate::errors::{Error, Result};
use crate::scene::MeshAsset;

/// Picks the decoder. Leading bytes win over the declared format.
pub fn resolve_format(bytes: &[u8], hint: Option<AssetFormat>, label: &str) -> Result<AssetFormat> {
    match (AssetFormat::sniff(bytes), hint) {
        (Some(sniffed), Some(declared)) if sniffed != declared => {
            // .gltf and .glb are the same family; no need to be loud about it.
            if !matches!(
                (sniffed, declared),
                (AssetFormat::Glb, AssetFormat::Gltf) | (AssetFormat::Gltf, AssetFormat::Glb)
            ) {
                log::warn!(
                    "'{label}' declared as {declared:?} but its contents are {sniffed:?}"
                );
            }
            Ok(sniffed)
        }
        (Some(sniffed), _) => Ok(sniffed),
        (None, Some(declared)) => Ok(declared),
        (None, None) => Err(Error::decode(label, "unrecognised file format")),
    }
}

pub fn decode_mesh(bytes: &[u8], hint: Option<AssetFormat>, label: &str) -> Result<MeshAsset> {
    match resolve_format(bytes, hint, label)? {
        AssetFormat::Gltf | AssetFormat::Glb => GltfLoader::parse(bytes, label)?.load_mesh(),
        AssetFormat::Fbx => Err(Error::decode(
            label,
            "FBX meshes are not supported, convert the model to glTF",
        )),
    }
}

pub fn decode_clip(bytes: &[u8], hint: Option<AssetFormat>, label: &str) -> Result<MotionClip> {
    match resolve_format(bytes, hint, label)? {
        AssetFormat::Gltf | AssetFormat::Glb => GltfLoader::parse(bytes, label)?.load_clip(),
        AssetFormat::Fbx => fbx::load_clip(bytes, label),
    }
}
