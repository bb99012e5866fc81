//! Asset loading.
//!
//! [`AssetServer`] turns an [`AssetRef`] into a shared, immutable
//! [`MeshAsset`](crate::scene::MeshAsset) or
//! [`MotionClip`](crate::animation::MotionClip). Bytes come from an
//! [`AssetReader`] (paths) or the reference itself (inline payloads); the
//! decoders live in [`loaders`].

pub mod cache;
pub mod io;
pub mod loaders;
pub mod server;
pub mod source;

pub use cache::AssetCache;
pub use io::{AssetReader, FileAssetReader};
pub use loaders::GltfLoader;
pub use server::{AssetServer, DEFAULT_LOAD_TIMEOUT};
pub use source::{AssetFormat, AssetRef, InlineAsset};
