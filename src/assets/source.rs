//! Asset references and format detection.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use uuid::Uuid;

use crate::errors::{Error, Result};

/// Container formats the loaders understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetFormat {
    /// glTF 2.0 JSON (buffers embedded as `data:` URIs).
    Gltf,
    /// glTF 2.0 binary container.
    Glb,
    /// Autodesk FBX (binary).
    Fbx,
}

impl AssetFormat {
    /// From a file extension, with or without the leading dot.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "gltf" => Some(Self::Gltf),
            "glb" => Some(Self::Glb),
            "fbx" => Some(Self::Fbx),
            _ => None,
        }
    }

    /// From a MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "model/gltf+json" => Some(Self::Gltf),
            "model/gltf-binary" => Some(Self::Glb),
            "application/vnd.autodesk.fbx" | "model/fbx" => Some(Self::Fbx),
            _ => None,
        }
    }

    /// From a loose hint as supplied by a file-drop surface: an extension,
    /// a MIME type or a file name.
    #[must_use]
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim();
        Self::from_mime(hint)
            .or_else(|| Self::from_extension(hint))
            .or_else(|| hint.rsplit_once('.').and_then(|(_, ext)| Self::from_extension(ext)))
    }

    /// Recognises the format from leading bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"glTF") {
            return Some(Self::Glb);
        }
        if bytes.starts_with(b"Kaydara FBX Binary") || bytes.starts_with(b"; FBX") {
            return Some(Self::Fbx);
        }
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace())?;
        (*first == b'{').then_some(Self::Gltf)
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gltf => "gltf",
            Self::Glb => "glb",
            Self::Fbx => "fbx",
        }
    }
}

/// Bytes handed over directly, e.g. from a dropped file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAsset {
    pub label: String,
    pub bytes: Arc<[u8]>,
    pub format: Option<AssetFormat>,
}

/// Identity of an asset: a static path, or an inline payload.
///
/// Two equal references resolve to the same cached object. Paths are
/// identified by name, inline payloads by content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    Path(String),
    Inline(InlineAsset),
}

impl AssetRef {
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Raw bytes plus the drop surface's format hint.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, hint: &str) -> Self {
        let format = AssetFormat::from_hint(hint);
        let label = match format {
            Some(f) => format!("dropped.{}", f.extension()),
            None => format!("dropped ({hint})"),
        };
        Self::Inline(InlineAsset {
            label,
            bytes: bytes.into(),
            format,
        })
    }

    /// Parses a `data:` URL, or treats anything else as a path.
    pub fn parse(reference: &str) -> Result<Self> {
        if reference.starts_with("data:") {
            parse_data_uri(reference)
        } else {
            Ok(Self::Path(reference.to_string()))
        }
    }

    /// Cache identity: UUIDv5 of the path, or an xxh3-128 content hash of
    /// the inline bytes.
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Path(path) => Uuid::new_v5(&Uuid::NAMESPACE_URL, path.as_bytes()),
            Self::Inline(inline) => Uuid::from_u128(xxhash_rust::xxh3::xxh3_128(&inline.bytes)),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Path(path) => path,
            Self::Inline(inline) => &inline.label,
        }
    }

    /// Declared format: extension for paths, hint for inline payloads.
    #[must_use]
    pub fn format_hint(&self) -> Option<AssetFormat> {
        match self {
            Self::Path(path) => path
                .rsplit_once('.')
                .and_then(|(_, ext)| AssetFormat::from_extension(ext)),
            Self::Inline(inline) => inline.format,
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for AssetRef {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

/// `data:[<mime>][;base64],<payload>`; only base64 payloads are accepted.
fn parse_data_uri(uri: &str) -> Result<AssetRef> {
    let rest = &uri["data:".len()..];
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::InvalidDataUri("missing ',' separator".to_string()))?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default();
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(Error::InvalidDataUri(
            "only base64-encoded payloads are supported".to_string(),
        ));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::InvalidDataUri(e.to_string()))?;

    let format = AssetFormat::from_mime(mime);
    let label = if mime.is_empty() {
        format!("data URI ({} bytes)", bytes.len())
    } else {
        format!("data:{mime} ({} bytes)", bytes.len())
    };

    Ok(AssetRef::Inline(InlineAsset {
        label,
        bytes: bytes.into(),
        format,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints() {
        assert_eq!(AssetFormat::from_hint("fbx"), Some(AssetFormat::Fbx));
        assert_eq!(AssetFormat::from_hint(".GLB"), Some(AssetFormat::Glb));
        assert_eq!(AssetFormat::from_hint("walk.gltf"), Some(AssetFormat::Gltf));
        assert_eq!(AssetFormat::from_hint("model/gltf-binary"), Some(AssetFormat::Glb));
        assert_eq!(AssetFormat::from_hint("text/plain"), None);
    }

    #[test]
    fn sniffing() {
        assert_eq!(AssetFormat::sniff(b"glTF\x02\0\0\0"), Some(AssetFormat::Glb));
        assert_eq!(AssetFormat::sniff(b"  \n{\"asset\":{}}"), Some(AssetFormat::Gltf));
        assert_eq!(AssetFormat::sniff(b"Kaydara FBX Binary  \0"), Some(AssetFormat::Fbx));
        assert_eq!(AssetFormat::sniff(b"\x89PNG"), None);
        assert_eq!(AssetFormat::sniff(b""), None);
    }

    #[test]
    fn data_uri_roundtrip_identity() {
        let a = AssetRef::parse("data:model/gltf-binary;base64,Z2xURg==").unwrap();
        let b = AssetRef::parse("data:model/gltf-binary;base64,Z2xURg==").unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.format_hint(), Some(AssetFormat::Glb));
        match &a {
            AssetRef::Inline(inline) => assert_eq!(&*inline.bytes, b"glTF"),
            AssetRef::Path(_) => panic!("expected inline asset"),
        }
    }

    #[test]
    fn data_uri_requires_base64() {
        assert!(matches!(
            AssetRef::parse("data:text/plain,hello"),
            Err(Error::InvalidDataUri(_))
        ));
        assert!(matches!(
            AssetRef::parse("data:;base64"),
            Err(Error::InvalidDataUri(_))
        ));
    }

    #[test]
    fn path_and_inline_ids_differ() {
        let path = AssetRef::path("animation.fbx");
        assert_eq!(path.id(), AssetRef::path("animation.fbx").id());
        assert_ne!(path.id(), AssetRef::path("./animation.fbx").id());
        assert_eq!(path.format_hint(), Some(AssetFormat::Fbx));

        let inline = AssetRef::from_bytes(b"animation.fbx".to_vec(), "fbx");
        assert_ne!(path.id(), inline.id());
    }
}
