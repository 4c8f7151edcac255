//! Normalized audio asset handle.

use std::path::{Path, PathBuf};

use tempfile::TempPath;

/// Immutable handle to a normalized (mono, fixed sample rate) audio file
/// with a known duration.
///
/// When built from temporary storage the asset owns its file: the temp
/// file is reclaimed when the asset drops, whether the run completed or
/// failed. A crash can at worst leave one orphaned temp file behind, which
/// the OS temp reaper collects independently.
pub struct AudioAsset {
    path: PathBuf,
    duration_seconds: f64,
    _temp: Option<TempPath>,
}

impl std::fmt::Debug for AudioAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioAsset")
            .field("path", &self.path)
            .field("duration_seconds", &self.duration_seconds)
            .finish()
    }
}

impl AudioAsset {
    /// Wrap an existing file without taking ownership of its storage.
    pub fn new(path: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        Self {
            path: path.into(),
            duration_seconds,
            _temp: None,
        }
    }

    /// Wrap a temp file, reclaiming it when the asset drops.
    pub fn from_temp(temp: TempPath, duration_seconds: f64) -> Self {
        Self {
            path: temp.to_path_buf(),
            duration_seconds,
            _temp: Some(temp),
        }
    }

    /// Filesystem path of the normalized audio.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recording duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// Read the full audio bytes for upload to a collaborator.
    pub async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn read_bytes_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"RIFFdata").unwrap();
        let asset = AudioAsset::new(file.path(), 1.5);
        assert_eq!(asset.read_bytes().await.unwrap(), b"RIFFdata");
        assert_eq!(asset.duration_seconds(), 1.5);
    }

    #[tokio::test]
    async fn temp_asset_reclaims_file_on_drop() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let temp = file.into_temp_path();
        let path = temp.to_path_buf();
        assert!(path.exists());

        let asset = AudioAsset::from_temp(temp, 2.0);
        assert!(asset.path().exists());
        drop(asset);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn read_bytes_missing_file_errors() {
        let asset = AudioAsset::new("/nonexistent/answer.wav", 1.0);
        assert!(asset.read_bytes().await.is_err());
    }
}
