use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::fs as async_fs;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Artifact verification failed")]
    VerificationFailed,
    #[error("Hash mismatch for {}: expected {expected}, got {actual}", .path.display())]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error("Invalid artifact source: {0}")]
    InvalidSource(String),
}

/// Where to fetch an artifact from and how to check it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    /// File name inside the cache directory.
    pub name: String,
    pub url: String,
    /// Lower-case hex SHA-256; unchecked when `None`.
    pub sha256: Option<String>,
}

impl ArtifactSource {
    /// Takes the file name from the last path segment of `url`.
    pub fn from_url(url: &str) -> Result<Self, ArtifactError> {
        let name = url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|name| !name.is_empty() && !url.ends_with('/'))
            .ok_or_else(|| ArtifactError::InvalidSource(url.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
            sha256: None,
        })
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into().to_lowercase());
        self
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Downloads model artifacts into a local cache directory and verifies them.
#[derive(Clone, Debug)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("AGROVISION_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("agrovision").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("agrovision").join("models");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("agrovision").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_artifact_path(&self, source: &ArtifactSource) -> PathBuf {
        self.models_dir.join(&source.name)
    }

    pub fn is_downloaded(&self, source: &ArtifactSource) -> bool {
        let path = self.get_artifact_path(source);
        log::debug!("Artifact path: {:?} (exists: {})", path, path.exists());
        path.exists()
    }

    /// Checks the file at `path` against `expected_hash`.
    pub async fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ArtifactError> {
        log::info!("Verifying file: {:?}", path);
        let bytes = async_fs::read(path).await?;
        let hash = sha256_hex(&bytes);
        log::debug!("Calculated hash: {}", hash);
        log::debug!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Like [`verify_file`](Self::verify_file) but a mismatch is an error.
    pub async fn require_hash(&self, path: &Path, expected_hash: &str) -> Result<(), ArtifactError> {
        let actual = sha256_hex(&async_fs::read(path).await?);
        if actual.eq_ignore_ascii_case(expected_hash) {
            Ok(())
        } else {
            Err(ArtifactError::HashMismatch {
                path: path.to_path_buf(),
                expected: expected_hash.to_string(),
                actual,
            })
        }
    }

    /// Returns the cached artifact path, downloading it first when it is
    /// missing or fails verification.
    pub async fn ensure_artifact(&self, source: &ArtifactSource) -> Result<PathBuf, ArtifactError> {
        let _lock = self.download_lock.lock().await;
        let path = self.get_artifact_path(source);

        if path.exists() {
            match &source.sha256 {
                Some(expected) if !self.verify_file(&path, expected).await? => {
                    log::warn!("Cached artifact failed verification, redownloading");
                    self.remove_artifact(source).await?;
                }
                _ => {
                    log::info!("Using cached artifact at {:?}", path);
                    return Ok(path);
                }
            }
        }

        if let Err(e) = self.download_and_verify(source, &path).await {
            log::error!("Failed to fetch artifact: {}", e);
            let _ = self.remove_artifact(source).await;
            return Err(e);
        }
        Ok(path)
    }

    async fn download_and_verify(&self, source: &ArtifactSource, path: &Path) -> Result<(), ArtifactError> {
        log::info!("Downloading artifact from {} to {:?}", source.url, path);
        let response = reqwest::get(&source.url).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        if let Some(expected) = &source.sha256 {
            let actual = sha256_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                log::error!("Hash mismatch: expected {}, got {}", expected, actual);
                return Err(ArtifactError::HashMismatch {
                    path: path.to_path_buf(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        async_fs::write(path, &bytes).await?;

        // Verify after writing
        if let Some(expected) = &source.sha256 {
            if !self.verify_file(path, expected).await? {
                return Err(ArtifactError::VerificationFailed);
            }
        }

        log::info!("Artifact downloaded to {:?}", path);
        Ok(())
    }

    pub async fn remove_artifact(&self, source: &ArtifactSource) -> Result<(), ArtifactError> {
        let path = self.get_artifact_path(source);
        if path.exists() {
            async_fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_sha256_hex() {
        assert_eq!(sha256_hex(b"hello"), HELLO_SHA256);
    }

    #[test]
    fn test_source_name_from_url() {
        let source = ArtifactSource::from_url("https://example.com/models/plant.onnx?download=1").unwrap();
        assert_eq!(source.name, "plant.onnx");
        assert!(ArtifactSource::from_url("https://example.com/models/").is_err());
    }

    #[tokio::test]
    async fn test_verified_cache_skips_download() -> Result<(), ArtifactError> {
        let dir = tempfile::tempdir()?;
        let manager = ModelManager::new(dir.path())?;
        // Unroutable URL: any download attempt would fail the test.
        let source = ArtifactSource::from_url("http://127.0.0.1:9/plant.onnx")?.with_sha256(HELLO_SHA256);
        fs::write(manager.get_artifact_path(&source), b"hello")?;

        assert!(manager.is_downloaded(&source));
        let path = manager.ensure_artifact(&source).await?;
        assert_eq!(fs::read(path)?, b"hello");
        Ok(())
    }

    #[tokio::test]
    async fn test_require_hash_mismatch() -> Result<(), ArtifactError> {
        let dir = tempfile::tempdir()?;
        let manager = ModelManager::new(dir.path())?;
        let path = dir.path().join("plant.onnx");
        fs::write(&path, b"hello!")?;
        assert!(!manager.verify_file(&path, HELLO_SHA256).await?);
        assert!(matches!(
            manager.require_hash(&path, HELLO_SHA256).await,
            Err(ArtifactError::HashMismatch { .. })
        ));
        manager.require_hash(&path, &sha256_hex(b"hello!")).await
    }

    #[tokio::test]
    async fn test_stale_cache_is_removed_when_refetch_fails() -> Result<(), ArtifactError> {
        let dir = tempfile::tempdir()?;
        let manager = ModelManager::new(dir.path())?;
        let source = ArtifactSource::from_url("http://127.0.0.1:9/plant.onnx")?.with_sha256(HELLO_SHA256);
        fs::write(manager.get_artifact_path(&source), b"tampered")?;

        assert!(manager.ensure_artifact(&source).await.is_err());
        assert!(!manager.is_downloaded(&source));
        Ok(())
    }

    #[test]
    fn test_default_models_dir() {
        env::set_var("AGROVISION_CACHE", "/tmp/test-cache");
        let path = ModelManager::get_default_models_dir();
        assert!(path.to_str().unwrap().contains("/tmp/test-cache/models"));
        env::remove_var("AGROVISION_CACHE");

        let path = ModelManager::get_default_models_dir();
        assert!(path.to_str().unwrap().contains("agrovision/models"));
    }
}
