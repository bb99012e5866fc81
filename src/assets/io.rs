use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{Error, Result};

/// Asynchronous byte source behind path references.
pub trait AssetReader: Send + Sync + 'static {
    /// Reads the whole resource named by `uri`.
    fn read_bytes(&self, uri: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

impl<R: AssetReader> AssetReader for Arc<R> {
    fn read_bytes(&self, uri: &str) -> impl Future<Output = Result<Vec<u8>>> + Send {
        (**self).read_bytes(uri)
    }
}

/// Reads paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileAssetReader {
    root_path: PathBuf,
}

impl FileAssetReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self { root_path }
    }

    #[inline]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn resolve(&self, uri: &str) -> PathBuf {
        // Web-style absolute paths ("/animation.fbx") are served from the root.
        self.root_path.join(uri.trim_start_matches('/'))
    }
}

impl Default for FileAssetReader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl AssetReader for FileAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        let path = self.resolve(uri);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::AssetNotFound(path.display().to_string()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_slash_resolves_under_root() {
        let reader = FileAssetReader::new("assets");
        assert_eq!(reader.resolve("/animation.fbx"), Path::new("assets/animation.fbx"));
        assert_eq!(reader.resolve("./male.glb"), Path::new("assets/./male.glb"));
    }
}
